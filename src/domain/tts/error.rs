use super::provider::TtsProvider;
use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum TtsServiceError {
    #[error("text too long: {length} characters (max {max})")]
    TextTooLong { length: usize, max: usize },
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("provider {0} is unavailable")]
    ProviderUnavailable(TtsProvider),
    #[error("provider {0} is not allowed for this request")]
    ProviderNotAllowed(TtsProvider),
    #[error("provider {provider} failed: {message}")]
    ProviderFailed {
        provider: TtsProvider,
        message: String,
    },
    #[error("no TTS provider available")]
    NoProviderAvailable,
    #[error("dependency error: {0}")]
    Dependency(String),
}

impl From<TtsServiceError> for AppError {
    fn from(err: TtsServiceError) -> Self {
        match err {
            TtsServiceError::TextTooLong { .. } => AppError::PayloadTooLarge(err.to_string()),
            TtsServiceError::Invalid(msg) => AppError::BadRequest(msg),
            TtsServiceError::ProviderUnavailable(_)
            | TtsServiceError::ProviderNotAllowed(_)
            | TtsServiceError::ProviderFailed { .. }
            | TtsServiceError::NoProviderAvailable => AppError::ServiceUnavailable(err.to_string()),
            TtsServiceError::Dependency(msg) => AppError::ExternalService(msg),
        }
    }
}
