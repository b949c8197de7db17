//! Core error types for SWITCHYARD.

use std::fmt;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A value could not be encoded into a data store
    Encoding {
        /// Data key being written
        key: String,
        /// Serializer message
        reason: String,
    },

    /// A stored value could not be decoded into the requested type
    Decoding {
        /// Data key being read
        key: String,
        /// Deserializer message
        reason: String,
    },

    /// Invalid configuration
    InvalidConfig {
        /// Reason the configuration was rejected
        reason: String,
    },

    /// A value failed a declared check
    Validation {
        /// Field or data key checked
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// A named item is missing
    NotFound {
        /// Item kind
        kind: String,
        /// Item name
        id: String,
    },

    /// A named item is already present
    AlreadyExists {
        /// Item kind
        kind: String,
        /// Item name
        id: String,
    },

    /// Internal error (for unexpected errors)
    Internal {
        /// Error message
        message: String,
    },
}

impl CoreError {
    /// Shorthand for an internal error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoding { key, reason } => {
                write!(f, "Unable to encode data for {}: {}", key, reason)
            }
            Self::Decoding { key, reason } => {
                write!(f, "Unable to decode data for {}: {}", key, reason)
            }
            Self::InvalidConfig { reason } => write!(f, "Invalid configuration: {}", reason),
            Self::Validation { field, reason } => {
                write!(f, "Validation failed for {}: {}", field, reason)
            }
            Self::NotFound { kind, id } => write!(f, "{} not found: {}", kind, id),
            Self::AlreadyExists { kind, id } => write!(f, "{} already exists: {}", kind, id),
            Self::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfig {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::NotFound {
            kind: "Rule".to_string(),
            id: "CHECK".to_string(),
        };
        assert_eq!(format!("{}", err), "Rule not found: CHECK");

        let err = CoreError::Decoding {
            key: "quote".to_string(),
            reason: "expected u64".to_string(),
        };
        assert_eq!(format!("{}", err), "Unable to decode data for quote: expected u64");
    }

    #[test]
    fn test_internal_shorthand() {
        let err = CoreError::internal("lock poisoned");
        assert_eq!(
            err,
            CoreError::Internal {
                message: "lock poisoned".to_string()
            }
        );
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: CoreError = json_err.into();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));
    }

    #[test]
    fn test_error_equality() {
        let err1 = CoreError::internal("a");
        let err2 = CoreError::internal("a");
        assert_eq!(err1, err2);
        assert_ne!(err1, CoreError::internal("b"));
    }
}
