#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("storage quota exceeded")]
    QuotaExceeded,
    #[error("no connection")]
    NoConnection,
    #[error("permission denied")]
    PermissionDenied,
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl StorageError {
    /// Failures that mean "data unavailable now" rather than a fault of the stored data.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StorageError::NoConnection | StorageError::PermissionDenied
        )
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum AccountError {
    #[error("account {0} not found")]
    NotFound(String),
    #[error("account {0} already exists")]
    AlreadyExists(String),
    #[error("invalid account identifier")]
    InvalidIdentifier,
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

impl From<StorageError> for AccountError {
    fn from(value: StorageError) -> Self {
        AccountError::Read(ReadError::Storage(value))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("sign-in cancelled")]
    Cancelled,
    #[error("no connection")]
    NoConnection,
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(thiserror::Error, Debug)]
pub enum MigrationError {
    #[error("document is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("document is not a JSON object")]
    NotAnObject,
    #[error("unsupported schema version {0}")]
    UnsupportedVersion(u32),
    #[error("no migration from schema version {0}")]
    MissingStep(u32),
    #[error("document does not match the current schema: {0}")]
    Invalid(#[source] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    #[error("file is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    Migration(#[from] MigrationError),
}
