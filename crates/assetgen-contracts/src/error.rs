use std::path::PathBuf;

/// Failures surfaced by generation, resizing and persistence.
///
/// Every variant propagates to the CLI boundary; nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum AssetGenError {
    #[error("{var} not set; export it or add it to a .env file at the project root")]
    MissingCredential { var: String },

    #[error("missing dependency: {what} ({hint})")]
    MissingDependency { what: String, hint: String },

    #[error("failed to fetch generated image ({url}): {reason}")]
    FetchFailure { url: String, reason: String },

    #[error("provider error: {0}")]
    ProviderError(String),

    #[error("failed to create output directory {}: {source}", .path.display())]
    DirectoryCreationFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to write {}: {reason}", .path.display())]
    WriteFailure { path: PathBuf, reason: String },

    #[error("failed to append event to {}: {reason}", .path.display())]
    EventLog { path: PathBuf, reason: String },
}

impl AssetGenError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential { .. } => "missing_credential",
            Self::MissingDependency { .. } => "missing_dependency",
            Self::FetchFailure { .. } => "fetch_failure",
            Self::ProviderError(_) => "provider_error",
            Self::DirectoryCreationFailure { .. } => "directory_creation_failure",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Decode(_) => "decode",
            Self::WriteFailure { .. } => "write_failure",
            Self::EventLog { .. } => "event_log",
        }
    }
}

pub type Result<T> = std::result::Result<T, AssetGenError>;
