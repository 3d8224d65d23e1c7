//! dpshell-core: Multi-appliance dispatch and response reconciliation
//!
//! Sends each command to every appliance of an `Environment` in order,
//! reconciles the responses into one block of output and drives the
//! read-dispatch-print session loop.

pub mod config;
pub mod dispatch;
pub mod environment;
pub mod error;
pub mod input;
pub mod reconcile;
pub mod session;
pub mod state;

pub use config::{ApplianceConfig, assign_credentials};
pub use environment::Environment;
pub use error::CoreError;
pub use input::{CommandInput, CommandSource, EditorReader, InputError, LineReader};
pub use reconcile::{Reconciled, reconcile};
pub use session::{SessionLoop, SessionMode, SessionOutcome, SessionReport};
pub use state::SessionState;
