//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and carry
//! the wire error code they map to when returned over IPC.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Wire code: request addressed an unregistered object.
pub const CODE_OBJECT_NOT_FOUND: &str = "OBJECT_NOT_FOUND";
/// Wire code: mutation targeted a key absent from the record.
pub const CODE_KEY_NOT_FOUND: &str = "KEY_NOT_FOUND";
/// Wire code: method or interface not served by the object.
pub const CODE_UNKNOWN_METHOD: &str = "UNKNOWN_METHOD";
/// Wire code: malformed request arguments.
pub const CODE_INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
/// Wire code: anything else.
pub const CODE_INTERNAL: &str = "INTERNAL";

/// Main error enum for confsync.
#[derive(Error, Debug)]
pub enum Error {
    /// RPC addressed an object path that is not registered.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// Mutation targeted a key the record does not contain.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Method or interface is not part of the configuration object contract.
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    /// Validation errors (map to INVALID_ARGUMENT).
    #[error("validation error: {0}")]
    Validation(String),

    /// A configuration file could not be opened or read.
    #[error("cannot read configuration: {0}")]
    ConfigUnreadable(String),

    /// A configuration file is not a valid record.
    #[error("configuration parse error: {0}")]
    ConfigParse(String),

    /// A required client setting is absent or out of range.
    #[error("missing required field: {0}")]
    MissingRequiredField(String),

    /// Connection loss or malformed traffic on the IPC substrate.
    #[error("transport error: {0}")]
    Transport(String),

    /// Error reported by the remote peer with a code this side does not model.
    #[error("remote error {code}: {message}")]
    Remote { code: String, message: String },

    /// Internal errors (map to INTERNAL).
    #[error("internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wire error code sent in ERROR frames.
    pub fn to_ipc_error_code(&self) -> &'static str {
        match self {
            Error::ObjectNotFound(_) => CODE_OBJECT_NOT_FOUND,
            Error::KeyNotFound(_) => CODE_KEY_NOT_FOUND,
            Error::UnknownMethod(_) => CODE_UNKNOWN_METHOD,
            Error::Validation(_) => CODE_INVALID_ARGUMENT,
            _ => CODE_INTERNAL,
        }
    }

    /// Rebuild an error from a wire `{code, message}` pair.
    ///
    /// Known codes map back onto their variant with the display prefix
    /// stripped, so `to_string()` round-trips.
    pub fn from_ipc(code: &str, message: &str) -> Self {
        fn detail(message: &str, prefix: &str) -> String {
            message.strip_prefix(prefix).unwrap_or(message).to_string()
        }
        match code {
            CODE_OBJECT_NOT_FOUND => Error::ObjectNotFound(detail(message, "object not found: ")),
            CODE_KEY_NOT_FOUND => Error::KeyNotFound(detail(message, "key not found: ")),
            CODE_UNKNOWN_METHOD => Error::UnknownMethod(detail(message, "unknown method: ")),
            CODE_INVALID_ARGUMENT => Error::Validation(detail(message, "validation error: ")),
            _ => Error::Remote {
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }
}

// Convenience constructors
impl Error {
    pub fn object_not_found(path: impl Into<String>) -> Self {
        Self::ObjectNotFound(path.into())
    }

    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound(key.into())
    }

    pub fn unknown_method(msg: impl Into<String>) -> Self {
        Self::UnknownMethod(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config_unreadable(msg: impl Into<String>) -> Self {
        Self::ConfigUnreadable(msg.into())
    }

    pub fn config_parse(msg: impl Into<String>) -> Self {
        Self::ConfigParse(msg.into())
    }

    pub fn missing_field(msg: impl Into<String>) -> Self {
        Self::MissingRequiredField(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_errors_have_distinct_codes() {
        assert_eq!(Error::object_not_found("/a").to_ipc_error_code(), "OBJECT_NOT_FOUND");
        assert_eq!(Error::key_not_found("Timeout").to_ipc_error_code(), "KEY_NOT_FOUND");
        assert_eq!(Error::unknown_method("Foo").to_ipc_error_code(), "UNKNOWN_METHOD");
        assert_eq!(Error::validation("bad").to_ipc_error_code(), "INVALID_ARGUMENT");
        assert_eq!(Error::transport("gone").to_ipc_error_code(), "INTERNAL");
    }

    #[test]
    fn test_from_ipc_round_trips_display() {
        let original = Error::key_not_found("Unknown");
        let rebuilt = Error::from_ipc(original.to_ipc_error_code(), &original.to_string());
        assert!(matches!(rebuilt, Error::KeyNotFound(ref k) if k == "Unknown"));
        assert_eq!(rebuilt.to_string(), original.to_string());
    }

    #[test]
    fn test_from_ipc_unknown_code_is_remote() {
        let err = Error::from_ipc("INTERNAL", "internal error: boom");
        match err {
            Error::Remote { code, message } => {
                assert_eq!(code, "INTERNAL");
                assert_eq!(message, "internal error: boom");
            }
            other => panic!("expected Remote, got {other:?}"),
        }
    }
}
