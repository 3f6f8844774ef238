use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Resource '{0}' has no registered schema")]
    UnknownResource(String),

    #[error("Invalid payload for '{resource}': {reason}")]
    InvalidPayload { resource: String, reason: String },
}

pub type SyncResult<T> = Result<T, SyncError>;

impl SyncError {
    pub fn invalid_payload(resource: &str, reason: impl Into<String>) -> Self {
        SyncError::InvalidPayload {
            resource: resource.to_string(),
            reason: reason.into(),
        }
    }
}

/// Domain validation failure, reported before any network call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Validation failed: {}", .problems.join("; "))]
pub struct ValidationError {
    pub problems: Vec<String>,
}

impl ValidationError {
    pub fn single(problem: impl Into<String>) -> Self {
        Self {
            problems: vec![problem.into()],
        }
    }

    /// Turn a list of collected problems into a result.
    pub fn check(problems: Vec<String>) -> Result<(), ValidationError> {
        if problems.is_empty() {
            Ok(())
        } else {
            Err(Self { problems })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_check() {
        assert!(ValidationError::check(vec![]).is_ok());

        let err = ValidationError::check(vec!["a".to_string(), "b".to_string()]).unwrap_err();
        assert_eq!(err.problems.len(), 2);
        assert_eq!(err.to_string(), "Validation failed: a; b");
    }

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::UnknownResource("rooms".to_string());
        assert_eq!(err.to_string(), "Resource 'rooms' has no registered schema");

        let err = SyncError::invalid_payload("properties", "expected an object");
        assert_eq!(
            err.to_string(),
            "Invalid payload for 'properties': expected an object"
        );
    }
}
