//! Error types for dpshell-exec

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to an appliance
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Failed to connect to the appliance
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// SSH or appliance CLI authentication failed
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No prompt arrived before the deadline
    #[error("no response within {timeout:?}")]
    Timeout {
        /// Timeout duration that was exceeded
        timeout: Duration,
    },

    /// SSH key error
    #[error("SSH key error: {0}")]
    SshKeyError(String),

    /// Credentials could not be resolved
    #[error("credential error: {0}")]
    CredentialError(String),

    /// I/O error on the shell channel
    #[error("I/O error: {0}")]
    IoError(String),

    /// Session not established
    #[error("not connected")]
    NotConnected,

    /// Session already established
    #[error("already connected")]
    AlreadyConnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = ExecError::Timeout {
            timeout: Duration::from_secs(60),
        };
        assert_eq!(err.to_string(), "no response within 60s");
    }

    #[test]
    fn test_auth_message() {
        let err = ExecError::AuthenticationFailed("bad password".to_string());
        assert_eq!(err.to_string(), "authentication failed: bad password");
    }
}
