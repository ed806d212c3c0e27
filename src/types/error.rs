//! Error types for the Commons engine
//!
//! Three classes of failure cross the engine boundary: validation errors
//! (the caller's request is malformed, nothing was mutated), conflict
//! errors (a concurrent actor won a race or the caller lacks rights),
//! and transient infrastructure errors (safe to retry with backoff).

use mongodb::error::ErrorKind;

/// Main error type for engine operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Role string is not in the closed role enum
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// A reason is required for this action and was empty
    #[error("Missing reason: {0}")]
    MissingReason(String),

    /// A pending join request already exists for this (user, community) pair
    #[error("Duplicate pending request: {0}")]
    DuplicatePendingRequest(String),

    /// The join request was already approved or rejected by another actor
    #[error("Already resolved: {0}")]
    AlreadyResolved(String),

    /// Caller does not own the resource or lacks the required permission
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Referenced document does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Store call timed out or the server was unreachable; retryable
    #[error("Store timeout: {0}")]
    StoreTimeout(String),

    /// Store rejected the operation
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Whether the caller may safely retry the operation with backoff.
    /// Validation and conflict errors are never retryable as-is; the
    /// caller must re-fetch and decide with fresh state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreTimeout(_))
    }

    /// Whether this is a conflict error (a concurrent actor won a race)
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyResolved(_) | Self::Unauthorized(_))
    }
}

impl From<mongodb::error::Error> for EngineError {
    fn from(err: mongodb::error::Error) -> Self {
        match *err.kind {
            ErrorKind::Io(_) | ErrorKind::ServerSelection { .. } => {
                Self::StoreTimeout(err.to_string())
            }
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<bson::ser::Error> for EngineError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Internal(format!("BSON encode error: {}", err))
    }
}

impl From<bson::de::Error> for EngineError {
    fn from(err: bson::de::Error) -> Self {
        Self::Internal(format!("BSON decode error: {}", err))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {}", err))
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Validate that an admin-supplied reason is non-empty. Bans and
/// rejections both require one before anything is written.
pub fn require_reason(reason: &str, action: &str) -> Result<()> {
    if reason.trim().is_empty() {
        return Err(EngineError::MissingReason(format!(
            "a {} requires a stated reason",
            action
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_timeouts_are_retryable() {
        assert!(EngineError::StoreTimeout("server selection".into()).is_retryable());
        assert!(!EngineError::Database("write failed".into()).is_retryable());
        assert!(!EngineError::AlreadyResolved("req-1".into()).is_retryable());
        assert!(!EngineError::DuplicatePendingRequest("u/c".into()).is_retryable());
    }

    #[test]
    fn test_reason_is_mandatory() {
        assert!(matches!(
            require_reason("", "rejection"),
            Err(EngineError::MissingReason(_))
        ));
        assert!(matches!(
            require_reason("   ", "ban"),
            Err(EngineError::MissingReason(_))
        ));
        assert!(require_reason("moved out of the neighborhood", "ban").is_ok());
    }

    #[test]
    fn test_conflict_classification() {
        assert!(EngineError::AlreadyResolved("req-1".into()).is_conflict());
        assert!(EngineError::Unauthorized("not the owner".into()).is_conflict());
        assert!(!EngineError::InvalidRole("czar".into()).is_conflict());
    }
}
