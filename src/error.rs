/// Unified error handling for portero
///
/// This module provides the error type system covering every failure mode
/// of a pool-administration operation: file I/O, config-section lookup,
/// server lookup, input validation, and runtime transport failures.
use std::io;
use thiserror::Error;

/// Main error type for portero operations
#[derive(Debug, Error)]
pub enum PorteroError {
    /// Configuration file unreadable or unwritable
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Application configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// The target backend section does not exist in the config file
    #[error("Backend section '{backend}' not found in configuration")]
    SectionNotFound { backend: String },

    /// No server line with the requested name inside the section
    #[error("Server '{name}' not found in backend '{backend}'")]
    ServerNotFound { backend: String, name: String },

    /// A server with the same name (case-insensitive) already exists
    #[error("A server named '{name}' already exists")]
    DuplicateName { name: String },

    /// Malformed user input (name, host, port, cookie)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Both runtime transports (API and socket) failed for a command
    #[error("Runtime transport failure: {message}")]
    Transport { message: String },
}

/// Result type alias for portero operations
pub type PorteroResult<T> = Result<T, PorteroError>;

impl PorteroError {
    /// Create a section-not-found error
    pub fn section_not_found<S: Into<String>>(backend: S) -> Self {
        PorteroError::SectionNotFound {
            backend: backend.into(),
        }
    }

    /// Create a server-not-found error
    pub fn server_not_found<S: Into<String>>(backend: S, name: S) -> Self {
        PorteroError::ServerNotFound {
            backend: backend.into(),
            name: name.into(),
        }
    }

    /// Create a duplicate-name error
    pub fn duplicate_name<S: Into<String>>(name: S) -> Self {
        PorteroError::DuplicateName { name: name.into() }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        PorteroError::Validation(message.into())
    }

    /// Create a transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        PorteroError::Transport {
            message: message.into(),
        }
    }

    /// Whether this failure is soft: the config-file edit (if any) has
    /// already been committed and only the runtime mirroring is stale.
    /// Soft failures are reported as warnings, never rolled back.
    pub fn is_soft(&self) -> bool {
        matches!(self, PorteroError::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = PorteroError::server_not_found("web_back", "web9");
        assert!(matches!(error, PorteroError::ServerNotFound { .. }));
        assert_eq!(
            error.to_string(),
            "Server 'web9' not found in backend 'web_back'"
        );
    }

    #[test]
    fn test_duplicate_name_message() {
        let error = PorteroError::duplicate_name("web1");
        assert_eq!(error.to_string(), "A server named 'web1' already exists");
    }

    #[test]
    fn test_soft_failures() {
        assert!(PorteroError::transport("both transports failed").is_soft());
        assert!(!PorteroError::section_not_found("web_back").is_soft());
        assert!(!PorteroError::validation("bad host").is_soft());
    }
}
