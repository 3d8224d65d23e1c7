//! Ordered collection of appliances

use dpshell_exec::ApplianceClient;

use crate::error::CoreError;

/// The appliances a session talks to, in display order
///
/// Response `i` of every round belongs to appliance `i`.
pub struct Environment {
    appliances: Vec<Box<dyn ApplianceClient>>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("appliances", &self.hostnames())
            .finish()
    }
}

impl Environment {
    /// Create an environment from appliance clients
    ///
    /// # Errors
    /// Returns `CoreError::ConfigError` if no appliances are given
    pub fn new(appliances: Vec<Box<dyn ApplianceClient>>) -> Result<Self, CoreError> {
        if appliances.is_empty() {
            return Err(CoreError::ConfigError(
                "at least one appliance is required".to_string(),
            ));
        }
        Ok(Self { appliances })
    }

    /// Number of appliances
    #[must_use]
    pub fn len(&self) -> usize {
        self.appliances.len()
    }

    /// Always false for a constructed environment
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.appliances.is_empty()
    }

    /// Display names in appliance order
    #[must_use]
    pub fn hostnames(&self) -> Vec<String> {
        self.appliances
            .iter()
            .map(|a| a.hostname().to_string())
            .collect()
    }

    /// Appliances in order, mutably
    pub fn appliances_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn ApplianceClient>> {
        self.appliances.iter_mut()
    }
}
