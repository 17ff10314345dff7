//! Error types shared across the analytics engine
//!
//! Every fallible operation in this crate returns [`AnalyticsResult`]. The
//! variants deliberately mirror what a caller can act on: bad input, a
//! well-formed identifier that matched nothing, or a collaborator failure
//! the caller cannot repair. The first failure aborts the whole call; no
//! operation returns partial results.

use thiserror::Error;

/// Result alias used throughout the crate
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// The supplied hash or address cannot be resolved against the chain
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A well-formed identifier with no matching record
    #[error("not found: {0}")]
    NotFound(String),

    /// Unexpected failure inside a collaborator (store, serializer, pool)
    #[error("internal error: {0}")]
    Internal(String),
}

impl AnalyticsError {
    /// Unresolvable transaction hash
    pub fn unknown_transaction(hash: &str) -> Self {
        AnalyticsError::InvalidInput(format!("unknown transaction hash: {hash}"))
    }

    /// Unresolvable address string
    pub fn unknown_address(address: &str) -> Self {
        AnalyticsError::InvalidInput(format!("unknown address: {address}"))
    }

    /// Cluster lookup that matched no record
    pub fn unknown_cluster(target: &str) -> Self {
        AnalyticsError::NotFound(format!("no cluster matches: {target}"))
    }

    /// True for the input-shaped failures a client can correct
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AnalyticsError::InvalidInput(_) | AnalyticsError::NotFound(_)
        )
    }
}

impl From<serde_json::Error> for AnalyticsError {
    fn from(e: serde_json::Error) -> Self {
        AnalyticsError::Internal(format!("serialization error: {e}"))
    }
}

impl From<std::io::Error> for AnalyticsError {
    fn from(e: std::io::Error) -> Self {
        AnalyticsError::Internal(format!("io error: {e}"))
    }
}

#[cfg(feature = "storage")]
impl From<rusqlite::Error> for AnalyticsError {
    fn from(e: rusqlite::Error) -> Self {
        AnalyticsError::Internal(format!("storage error: {e}"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = AnalyticsError::unknown_transaction("deadbeef");
        assert_eq!(err.to_string(), "invalid input: unknown transaction hash: deadbeef");

        let err = AnalyticsError::unknown_cluster("whale-1");
        assert_eq!(err.to_string(), "not found: no cluster matches: whale-1");
    }

    #[test]
    fn test_client_error_split() {
        assert!(AnalyticsError::unknown_address("abc").is_client_error());
        assert!(AnalyticsError::NotFound("x".into()).is_client_error());
        assert!(!AnalyticsError::Internal("boom".into()).is_client_error());
    }

    #[test]
    fn test_serde_error_wraps_as_internal() {
        let parse_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: AnalyticsError = parse_err.into();
        assert!(matches!(err, AnalyticsError::Internal(_)));
    }
}
