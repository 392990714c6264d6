use thiserror::Error;
use serde::Serialize;

/// The closed error-code set from the external interface contract.
/// Every failure surfaced to a caller maps to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    IntentUnclear,
    SchemaNotFound,
    MissingRequiredFilter,
    ItemNotFound,
    WarehouseNotFound,
    WorkstationNotFound,
    AmbiguousReference,
    ColumnNotFound,
    BinderError,
    OutOfMemory,
    QueryTimeout,
    ConnectionError,
    JoinUnguarded,
    QueryError,
    InternalError,
}

impl ErrorCode {
    /// Whether a caller can do something about this without operator help.
    pub fn is_user_remediable(self) -> bool {
        matches!(
            self,
            ErrorCode::IntentUnclear
                | ErrorCode::MissingRequiredFilter
                | ErrorCode::ItemNotFound
                | ErrorCode::WarehouseNotFound
                | ErrorCode::WorkstationNotFound
        )
    }
}

#[derive(Error, Debug)]
pub enum SdqcError {
    #[error("intent unclear: {0}")]
    IntentUnclear(String),

    #[error("schema not found: {0}")]
    SchemaNotFound(String),

    #[error("missing required filter: {0}")]
    MissingRequiredFilter(String),

    #[error("item not found: {0}")]
    ItemNotFound { value: String, suggestions: Vec<String> },

    #[error("warehouse not found: {0}")]
    WarehouseNotFound { value: String, suggestions: Vec<String> },

    #[error("workstation not found: {0}")]
    WorkstationNotFound { value: String, suggestions: Vec<String> },

    #[error("ambiguous reference: {0}")]
    AmbiguousReference(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("binder error: {0}")]
    BinderError(String),

    #[error("out of memory: {0}")]
    OutOfMemory(String),

    #[error("query timed out after {seconds}s")]
    QueryTimeout { seconds: u64 },

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("multi-table join without a guarding filter")]
    JoinUnguarded,

    #[error("query error: {0}")]
    QueryError(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SdqcError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SdqcError::IntentUnclear(_) => ErrorCode::IntentUnclear,
            SdqcError::SchemaNotFound(_) => ErrorCode::SchemaNotFound,
            SdqcError::MissingRequiredFilter(_) => ErrorCode::MissingRequiredFilter,
            SdqcError::ItemNotFound { .. } => ErrorCode::ItemNotFound,
            SdqcError::WarehouseNotFound { .. } => ErrorCode::WarehouseNotFound,
            SdqcError::WorkstationNotFound { .. } => ErrorCode::WorkstationNotFound,
            SdqcError::AmbiguousReference(_) => ErrorCode::AmbiguousReference,
            SdqcError::ColumnNotFound(_) => ErrorCode::ColumnNotFound,
            SdqcError::BinderError(_) => ErrorCode::BinderError,
            SdqcError::OutOfMemory(_) => ErrorCode::OutOfMemory,
            SdqcError::QueryTimeout { .. } => ErrorCode::QueryTimeout,
            SdqcError::ConnectionError(_) => ErrorCode::ConnectionError,
            SdqcError::JoinUnguarded => ErrorCode::JoinUnguarded,
            SdqcError::QueryError(_) => ErrorCode::QueryError,
            SdqcError::Internal(_) | SdqcError::Io(_) | SdqcError::Json(_) | SdqcError::Yaml(_) => {
                ErrorCode::InternalError
            }
        }
    }

    pub fn suggestions(&self) -> Vec<String> {
        match self {
            SdqcError::ItemNotFound { suggestions, .. }
            | SdqcError::WarehouseNotFound { suggestions, .. }
            | SdqcError::WorkstationNotFound { suggestions, .. } => suggestions.clone(),
            _ => Vec::new(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SdqcError>;
