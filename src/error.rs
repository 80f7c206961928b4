use std::path::PathBuf;
use thiserror::Error;

/// A value failed coercion or one of its setting's validators.
///
/// Carries the human-readable message shown next to the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The same error, prefixed with the name of the setting it came from.
    pub fn for_setting(self, name: &str) -> Self {
        Self {
            message: format!("{name}: {}", self.message),
        }
    }
}

#[derive(Debug, Error)]
pub enum SetmanError {
    #[error("Failed to parse {path} (line {line}): {reason}")]
    ConfigParse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Setting type '{0}' not found")]
    SettingTypeDoesNotExist(String),

    #[error("Setting '{0}' does not exist")]
    SettingDoesNotExist(String),

    #[error("Cannot redefine `type` attr for '{0}' setting")]
    TypeRedefinition(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    #[error("Cannot save invalid settings: {0}")]
    InvalidSettings(ValidationError),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize settings as {format}: {reason}")]
    Serialize { format: String, reason: String },

    #[error("Failed to read {format} settings from {path}: {reason}")]
    Deserialize {
        path: PathBuf,
        format: String,
        reason: String,
    },

    #[error("Options error: {0}")]
    Options(#[from] confique::Error),

    #[error("Unknown keys in options file {path}: {}", .keys.join(", "))]
    UnknownOptionKeys { path: PathBuf, keys: Vec<String> },
}

impl SetmanError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SetmanError::Io {
            path: path.into(),
            source,
        }
    }
}
