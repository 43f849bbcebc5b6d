use thiserror::Error;

/// Errors surfaced by CLI commands
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Cache operation failed: {message}")]
    Cache { message: String },

    #[error("Image rejected: {message}")]
    Image { message: String },

    #[error("Storage operation failed: {message}")]
    Storage { message: String },
}

impl CliError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    pub fn image(message: impl Into<String>) -> Self {
        Self::Image {
            message: message.into(),
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::Storage {
                message: "File not found".to_string(),
            },
            std::io::ErrorKind::PermissionDenied => Self::Storage {
                message: "Permission denied".to_string(),
            },
            _ => Self::Storage {
                message: err.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage {
            message: format!("JSON error: {err}"),
        }
    }
}

impl From<crate::semantic::CacheError> for CliError {
    fn from(err: crate::semantic::CacheError) -> Self {
        Self::cache(err.to_string())
    }
}
