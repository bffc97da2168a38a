//! Transform and stage errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    /// The record lacks something the transform needs
    #[error("Invalid input for '{field}': {message}")]
    InvalidInput { field: String, message: String },

    /// A batch arrived without context the stage depends on
    #[error("Missing context: {0}")]
    MissingContext(&'static str),

    /// The backing service did not answer
    #[error("Transform unavailable: {message}")]
    Unavailable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Lead source error: {message}")]
    Source {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl TransformError {
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            source: None,
        }
    }

    pub fn source_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Source {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
