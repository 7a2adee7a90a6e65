use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Blob storage for generated audio
#[async_trait]
pub trait AudioStorage: Send + Sync {
    /// Store the audio and return a playable URL
    async fn upload_audio_buffer(&self, audio: Vec<u8>, filename: &str) -> Result<String, String>;
}

/// Stores audio files on local disk, served under a public base URL
pub struct LocalAudioStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalAudioStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    fn path_for(&self, filename: &str) -> Result<PathBuf, String> {
        let relative = Path::new(filename);
        let is_safe = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if !is_safe || filename.is_empty() {
            return Err(format!("unsafe audio filename: {}", filename));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AudioStorage for LocalAudioStorage {
    async fn upload_audio_buffer(&self, audio: Vec<u8>, filename: &str) -> Result<String, String> {
        let path = self.path_for(filename)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("Failed to create audio directory: {}", e))?;
        }

        tokio::fs::write(&path, &audio)
            .await
            .map_err(|e| format!("Failed to write audio file: {}", e))?;

        tracing::debug!(
            path = %path.display(),
            audio_size = audio.len(),
            "Audio stored"
        );

        Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), filename))
    }
}
