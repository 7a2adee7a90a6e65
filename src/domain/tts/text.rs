use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Sentence terminator, optionally followed by closing quotes or brackets
static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[.!?…]+["'”’»)\]]*\s+"#).expect("valid sentence regex"));

/// Blank line separating source paragraphs
static BLANK_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid blank line regex"));

fn is_double_quote(c: char) -> bool {
    matches!(c, '"' | '“' | '”' | '„' | '‟' | '«' | '»' | '＂')
}

fn is_single_quote(c: char) -> bool {
    matches!(c, '\'' | '‘' | '’' | '‚' | '‛' | '`')
}

/// Normalize text for content addressing.
///
/// Quote characters are removed, apostrophes inside words (`don't`, `don’t`)
/// are kept as a plain `'`, and runs of whitespace collapse to one space.
/// Applying it twice yields the same string as applying it once.
pub fn normalize_text(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut stripped = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        if is_double_quote(c) {
            continue;
        }
        if is_single_quote(c) {
            let inside_word = i > 0
                && chars[i - 1].is_alphanumeric()
                && chars.get(i + 1).is_some_and(|next| next.is_alphanumeric());
            if inside_word {
                stripped.push('\'');
            }
            continue;
        }
        stripped.push(c);
    }

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// SHA-256 (hex) of the normalized text
pub fn text_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_text(text).as_bytes());
    hex::encode(hasher.finalize())
}

/// Split text into sentences, keeping the terminating punctuation
pub fn split_into_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut last_end = 0;

    for mat in SENTENCE_END.find_iter(text) {
        let sentence = text[last_end..mat.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        last_end = mat.end();
    }

    let remaining = text[last_end..].trim();
    if !remaining.is_empty() {
        sentences.push(remaining);
    }

    sentences
}

/// Split a story into narration paragraphs of roughly `target_words` words.
///
/// Sentences are never split; a sentence longer than the target becomes its
/// own paragraph. Blank lines in the source always start a new paragraph.
pub fn split_into_paragraphs(text: &str, target_words: usize) -> Vec<String> {
    let mut paragraphs = Vec::new();

    for block in BLANK_LINE.split(text) {
        let mut current = String::new();
        let mut current_words = 0;

        for sentence in split_into_sentences(block) {
            let sentence = sentence.split_whitespace().collect::<Vec<_>>().join(" ");
            let words = sentence.split_whitespace().count();

            if current_words > 0 && current_words + words > target_words {
                paragraphs.push(std::mem::take(&mut current));
                current_words = 0;
            }

            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&sentence);
            current_words += words;
        }

        if !current.is_empty() {
            paragraphs.push(current);
        }
    }

    paragraphs
}

/// Split text into request-sized batches on sentence boundaries.
/// Sentences longer than `max_len` are cut on character boundaries.
pub fn split_into_batches(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut batches = Vec::new();
    let mut current = String::new();

    for sentence in split_into_sentences(text) {
        if !current.is_empty() && current.len() + 1 + sentence.len() > max_len {
            batches.push(std::mem::take(&mut current));
        }

        if sentence.len() > max_len {
            let chars: Vec<char> = sentence.chars().collect();
            for chunk in chars.chunks(max_len) {
                batches.push(chunk.iter().collect());
            }
            continue;
        }

        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(sentence);
    }

    if !current.is_empty() {
        batches.push(current);
    }

    batches
}
