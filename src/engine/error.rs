use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode {format}: {message}")]
    Encode {
        format: &'static str,
        message: String,
    },

    #[error("Transform task failed: {0}")]
    TaskFailed(String),
}

impl EngineError {
    pub fn encode(format: &'static str, message: impl ToString) -> Self {
        EngineError::Encode {
            format,
            message: message.to_string(),
        }
    }
}
