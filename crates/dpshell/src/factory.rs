//! Building the appliance environment from CLI arguments and configuration

use std::time::Duration;

use dpshell_core::{Environment, assign_credentials};
use dpshell_exec::{ApplianceClient, ApplianceInfo, Credentials, SshApplianceBuilder};
use eyre::{Result, eyre};
use tracing::info;

use crate::config::Config;

/// Resolve which appliances to talk to and with which credentials
///
/// Appliances named on the command line replace the configured ones.
/// Credentials given on the command line apply to whichever list is used;
/// without them every configured appliance must carry its own.
///
/// # Errors
/// Returns error on malformed addresses or credentials, or when credentials
/// cannot be matched to appliances
pub fn resolve_targets(
    appliances: &[String],
    credentials: &[String],
    config: &Config,
) -> Result<Vec<(ApplianceInfo, Credentials)>> {
    let cli_creds = credentials
        .iter()
        .map(|pair| Credentials::parse(pair))
        .collect::<Result<Vec<_>, _>>()?;

    let (infos, creds) = if appliances.is_empty() {
        let infos: Vec<ApplianceInfo> = config.appliance.iter().map(|a| a.info()).collect();
        let creds = if cli_creds.is_empty() {
            config
                .appliance
                .iter()
                .map(|a| {
                    a.credentials()
                        .ok_or_else(|| eyre!("no credentials configured for {}", a.host))
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            assign_credentials(&infos, &cli_creds)?
        };
        (infos, creds)
    } else {
        let infos = appliances
            .iter()
            .map(|spec| ApplianceInfo::parse(spec).map_err(|e| eyre!(e)))
            .collect::<Result<Vec<_>>>()?;
        let creds = assign_credentials(&infos, &cli_creds)?;
        (infos, creds)
    };

    if infos.is_empty() {
        eyre::bail!("no appliances given (use --appliance or a config file)");
    }

    Ok(infos.into_iter().zip(creds).collect())
}

/// Create an SSH client per target, in order
///
/// # Errors
/// Returns error if the environment cannot be formed
pub fn build_environment(
    targets: Vec<(ApplianceInfo, Credentials)>,
    timeout: Duration,
) -> Result<Environment> {
    let appliances: Vec<Box<dyn ApplianceClient>> = targets
        .into_iter()
        .map(|(info, creds)| {
            info!(appliance = %info, user = %creds.user, "adding appliance");
            Box::new(
                SshApplianceBuilder::new(info, creds)
                    .with_timeout(timeout)
                    .build(),
            ) as Box<dyn ApplianceClient>
        })
        .collect();

    Ok(Environment::new(appliances)?)
}
