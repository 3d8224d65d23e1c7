//! Configuration types for appliances

use dpshell_exec::{ApplianceInfo, Credentials};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Configuration for a single appliance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplianceConfig {
    /// Hostname or address, also used as the display name
    pub host: String,
    /// SSH port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Appliance user
    pub user: Option<String>,
    /// Inline password (prefer `password_env`)
    pub password: Option<String>,
    /// Environment variable holding the password
    pub password_env: Option<String>,
    /// Path to SSH private key
    pub ssh_key: Option<String>,
}

fn default_port() -> u16 {
    22
}

impl ApplianceConfig {
    /// Address of this appliance
    #[must_use]
    pub fn info(&self) -> ApplianceInfo {
        ApplianceInfo::new(&self.host).with_port(self.port)
    }

    /// Credentials configured for this appliance, if complete
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        let user = self.user.as_ref()?;
        let creds = match (&self.password_env, &self.password) {
            (Some(var), _) => Credentials::from_env(user, var),
            (None, Some(password)) => Credentials::new(user, password),
            (None, None) => return None,
        };
        Some(match &self.ssh_key {
            Some(key) => creds.with_ssh_key(key),
            None => creds,
        })
    }
}

/// Pair each appliance with its credentials
///
/// A single credential applies to every appliance; otherwise there must be
/// exactly one credential per appliance, in appliance order.
///
/// # Errors
/// Returns `CoreError::ConfigError` when the counts do not line up
pub fn assign_credentials(
    appliances: &[ApplianceInfo],
    credentials: &[Credentials],
) -> Result<Vec<Credentials>, CoreError> {
    match credentials {
        [] => Err(CoreError::ConfigError(
            "no credentials given".to_string(),
        )),
        [only] => Ok(vec![only.clone(); appliances.len()]),
        many if many.len() == appliances.len() => Ok(many.to_vec()),
        many => Err(CoreError::ConfigError(format!(
            "{} credentials given for {} appliances",
            many.len(),
            appliances.len()
        ))),
    }
}
