//! Appliance credentials and password resolution

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Where an appliance password comes from
#[derive(Clone)]
pub enum PasswordSource {
    /// Password given directly
    Inline(String),
    /// Password read from an environment variable at resolution time
    Env(String),
}

impl fmt::Debug for PasswordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordSource::Inline(_) => f.write_str("Inline(<redacted>)"),
            PasswordSource::Env(var) => f.debug_tuple("Env").field(var).finish(),
        }
    }
}

impl PasswordSource {
    /// Resolve the password
    ///
    /// # Errors
    /// Returns `CredentialError::EnvNotSet` if the variable is missing
    pub fn resolve(&self) -> Result<String, CredentialError> {
        match self {
            PasswordSource::Inline(password) => Ok(password.clone()),
            PasswordSource::Env(var_name) => {
                debug!(var = %var_name, "reading password from environment");
                env::var(var_name).map_err(|_| CredentialError::EnvNotSet(var_name.clone()))
            }
        }
    }
}

/// User name and password for an appliance, plus an optional SSH key
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Appliance user
    pub user: String,
    /// Password for SSH and the appliance CLI login
    pub password: PasswordSource,
    /// Private key used for SSH authentication instead of the password
    pub ssh_key: Option<PathBuf>,
}

impl Credentials {
    /// Create credentials with an inline password
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: PasswordSource::Inline(password.into()),
            ssh_key: None,
        }
    }

    /// Create credentials whose password is read from an environment variable
    pub fn from_env(user: impl Into<String>, var_name: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: PasswordSource::Env(var_name.into()),
            ssh_key: None,
        }
    }

    /// Parse a `user:password` pair
    ///
    /// The password may itself contain colons; only the first one separates.
    ///
    /// # Errors
    /// Returns `CredentialError::Malformed` when there is no colon or the user is empty
    pub fn parse(pair: &str) -> Result<Self, CredentialError> {
        match pair.split_once(':') {
            Some((user, password)) if !user.is_empty() => Ok(Self::new(user, password)),
            _ => Err(CredentialError::Malformed),
        }
    }

    /// Use a private key for SSH authentication
    #[must_use]
    pub fn with_ssh_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.ssh_key = Some(path.into());
        self
    }

    /// Resolve the password
    ///
    /// # Errors
    /// Returns `CredentialError` if the password source cannot be read
    pub fn password(&self) -> Result<String, CredentialError> {
        self.password.resolve()
    }

    /// Check the configured key file exists and is private
    ///
    /// # Errors
    /// Returns `CredentialError` if the key is missing or readable by others
    pub fn validate_key(&self) -> Result<(), CredentialError> {
        match &self.ssh_key {
            Some(path) => validate_key_permissions(path),
            None => Ok(()),
        }
    }
}

/// Credential resolution errors
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("environment variable {0} not set")]
    EnvNotSet(String),

    #[error("credentials must be given as user:password")]
    Malformed,

    #[error("key file permissions too open: {0} (should be 600)")]
    BadPermissions(String),

    #[error("key file not found: {0}")]
    NotFound(String),
}

#[cfg(unix)]
fn validate_key_permissions(path: &Path) -> Result<(), CredentialError> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path)
        .map_err(|_| CredentialError::NotFound(path.display().to_string()))?;

    // group and other bits must be clear
    if metadata.permissions().mode() & 0o77 != 0 {
        return Err(CredentialError::BadPermissions(path.display().to_string()));
    }

    Ok(())
}

#[cfg(not(unix))]
fn validate_key_permissions(path: &Path) -> Result<(), CredentialError> {
    if path.exists() {
        Ok(())
    } else {
        Err(CredentialError::NotFound(path.display().to_string()))
    }
}
