use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsulRenderError {
    #[error("Invalid resource: {0}")]
    Validation(String),

    #[error("Secret item '{bag_item}' not found in bag '{bag_name}'")]
    SecretNotFound { bag_name: String, bag_item: String },

    #[error("Secret item '{bag_item}' in bag '{bag_name}' is malformed: {reason}")]
    MalformedSecret {
        bag_name: String,
        bag_item: String,
        reason: String,
    },

    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown owner '{0}': no such user on this host")]
    UnknownOwner(String),

    #[error("Unknown group '{0}': no such group on this host")]
    UnknownGroup(String),

    #[error("Settings parse error: {0}")]
    SettingsParse(#[from] toml::de::Error),

    #[error("Settings serialization error: {0}")]
    SettingsSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConsulRenderError {
    /// Wrap an I/O failure with the path it happened on.
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConsulRenderError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsulRenderError>;
