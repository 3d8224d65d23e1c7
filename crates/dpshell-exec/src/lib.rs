//! dpshell-exec: Appliance session abstraction
//!
//! Provides the `ApplianceClient` trait and an SSH implementation that drives
//! an appliance's line-oriented CLI over an interactive shell channel.

pub mod credentials;
pub mod error;
pub mod info;
pub mod prompt;
pub mod ssh;
pub mod traits;

pub use credentials::{CredentialError, Credentials, PasswordSource};
pub use error::ExecError;
pub use info::ApplianceInfo;
pub use prompt::PromptKind;
pub use ssh::{SshAppliance, SshApplianceBuilder};
pub use traits::ApplianceClient;
