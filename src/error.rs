//! Error types for the Keystone collector

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of [`Error`] exposed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Configuration missing or mistyped
    Config,
    /// Authentication rejected or identity endpoint unreachable
    Auth,
    /// A listing call failed
    Fetch,
    /// Anything else
    Internal,
}

/// Errors that can occur while collecting Keystone metrics
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Required configuration item is absent
    #[error("Missing configuration item: {key}")]
    MissingConfig { key: &'static str },

    /// Configuration item has the wrong type
    #[error("Configuration item {key} must be a {expected}")]
    InvalidConfig {
        key: &'static str,
        expected: &'static str,
    },

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    // =========================================================================
    // Authentication Errors
    // =========================================================================
    /// Keystone unreachable during authentication
    #[error("Keystone connection error during authentication: {0}")]
    AuthConnection(#[source] reqwest::Error),

    /// Keystone rejected the credentials or returned an unusable token
    #[error("Authentication failed: {0}")]
    AuthRejected(String),

    // =========================================================================
    // Fetch Errors
    // =========================================================================
    /// Transport failure while listing a resource
    #[error("Keystone connection error while listing {resource}: {source}")]
    FetchConnection {
        resource: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Keystone answered a listing call with a non-success status
    #[error("Listing {resource} failed with status {status}")]
    FetchStatus {
        resource: &'static str,
        status: reqwest::StatusCode,
    },

    /// Listing response body did not match the expected collection shape
    #[error("Failed to parse {resource} response: {reason}")]
    ResponseParse {
        resource: &'static str,
        reason: String,
    },

    /// A pagination `next` link pointed back at an already visited page
    #[error("Pagination loop while listing {resource} at {url}")]
    PaginationLoop { resource: &'static str, url: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingConfig { .. } | Error::InvalidConfig { .. } | Error::Config(_) => {
                ErrorKind::Config
            }
            Error::AuthConnection(_) | Error::AuthRejected(_) => ErrorKind::Auth,
            Error::FetchConnection { .. }
            | Error::FetchStatus { .. }
            | Error::ResponseParse { .. }
            | Error::PaginationLoop { .. } => ErrorKind::Fetch,
            Error::Io(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns true for configuration errors.
    pub fn is_config(&self) -> bool {
        self.kind() == ErrorKind::Config
    }

    /// Returns true for authentication errors.
    pub fn is_auth(&self) -> bool {
        self.kind() == ErrorKind::Auth
    }

    /// Returns true for listing errors.
    pub fn is_fetch(&self) -> bool {
        self.kind() == ErrorKind::Fetch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_classified() {
        let err = Error::MissingConfig {
            key: "admin_password",
        };
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.is_config());
        assert_eq!(err.to_string(), "Missing configuration item: admin_password");

        let err = Error::InvalidConfig {
            key: "admin_user",
            expected: "string",
        };
        assert!(err.is_config());
        assert_eq!(
            err.to_string(),
            "Configuration item admin_user must be a string"
        );
    }

    #[test]
    fn test_fetch_errors_classified() {
        let err = Error::FetchStatus {
            resource: "tenants",
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        };
        assert!(err.is_fetch());
        assert!(!err.is_auth());
        assert!(err.to_string().contains("tenants"));

        let err = Error::PaginationLoop {
            resource: "users",
            url: "http://keystone/v3/users".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Fetch);
    }

    #[test]
    fn test_auth_and_internal_classified() {
        assert!(Error::AuthRejected("401".into()).is_auth());
        assert_eq!(Error::Internal("boom".into()).kind(), ErrorKind::Internal);
    }
}
