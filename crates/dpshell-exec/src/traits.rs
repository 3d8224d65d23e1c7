//! Appliance client trait

use async_trait::async_trait;

use crate::error::ExecError;

/// A single appliance reachable over a line-oriented CLI session
///
/// One request is in flight at a time; callers own the client exclusively.
#[async_trait]
pub trait ApplianceClient: Send {
    /// Display name of the appliance
    fn hostname(&self) -> &str;

    /// Open the session, log into `domain` and return the initial output
    /// up to and including the first command prompt
    async fn connect(&mut self, domain: &str) -> Result<String, ExecError>;

    /// Send one command line and return the raw response text
    async fn execute(&mut self, command: &str) -> Result<String, ExecError>;

    /// Close the session (no-op when not connected)
    async fn disconnect(&mut self) -> Result<(), ExecError>;

    /// Whether a session is open
    fn is_connected(&self) -> bool;
}
