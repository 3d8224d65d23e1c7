//! Sequential fan-out of one request to every appliance

use tracing::{debug, instrument, warn};

use crate::environment::Environment;
use crate::error::CoreError;

/// Open a session on every appliance and collect their banners
///
/// # Errors
/// The first appliance that fails aborts the round
#[instrument(skip(environment), fields(appliances = environment.len()))]
pub async fn connect_all(
    environment: &mut Environment,
    domain: &str,
) -> Result<Vec<String>, CoreError> {
    let mut banners = Vec::with_capacity(environment.len());
    for appliance in environment.appliances_mut() {
        let banner = appliance
            .connect(domain)
            .await
            .map_err(|e| CoreError::appliance(appliance.hostname(), e))?;
        debug!(host = %appliance.hostname(), bytes = banner.len(), "appliance connected");
        banners.push(banner);
    }
    Ok(banners)
}

/// Send `command` to every appliance in order
///
/// The returned responses are index-aligned with the environment.
///
/// # Errors
/// The first appliance that fails aborts the round; no other appliance is
/// retried or skipped
#[instrument(skip(environment), fields(appliances = environment.len()))]
pub async fn send_to_all(
    command: &str,
    environment: &mut Environment,
) -> Result<Vec<String>, CoreError> {
    let mut responses = Vec::with_capacity(environment.len());
    for appliance in environment.appliances_mut() {
        let response = appliance
            .execute(command)
            .await
            .map_err(|e| CoreError::appliance(appliance.hostname(), e))?;
        responses.push(response);
    }
    Ok(responses)
}

/// Close every open session, logging failures
pub async fn disconnect_all(environment: &mut Environment) {
    for appliance in environment.appliances_mut() {
        if !appliance.is_connected() {
            continue;
        }
        if let Err(e) = appliance.disconnect().await {
            warn!(host = %appliance.hostname(), error = %e, "failed to disconnect");
        }
    }
}
