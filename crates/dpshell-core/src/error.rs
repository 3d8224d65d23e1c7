//! Core error types for dpshell-core

use dpshell_exec::ExecError;
use thiserror::Error;

use crate::input::InputError;

/// Errors that can occur while running a session
#[derive(Error, Debug)]
pub enum CoreError {
    /// An appliance failed during connect or execute
    #[error("{host}: {source}")]
    Appliance {
        /// Appliance that failed
        host: String,
        /// Underlying transport error
        #[source]
        source: ExecError,
    },

    /// Interactive input failed for a reason other than end of input
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// Writing output failed
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl CoreError {
    /// Wrap an appliance error with the appliance's hostname
    pub fn appliance(host: impl Into<String>, source: ExecError) -> Self {
        CoreError::Appliance {
            host: host.into(),
            source,
        }
    }
}
