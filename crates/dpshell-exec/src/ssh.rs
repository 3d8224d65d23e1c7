//! Appliance sessions over an SSH shell channel using russh

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::Msg;
use russh::keys::ssh_key;
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key};
use russh::{Channel, ChannelMsg, Disconnect, client};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::credentials::Credentials;
use crate::error::ExecError;
use crate::info::ApplianceInfo;
use crate::prompt::{LoginField, LoginSequence, LoginStep, PromptKind, PromptScanner};
use crate::traits::ApplianceClient;

/// Default time allowed for any single appliance response
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Quiet period after a prompt before the response counts as complete
const SETTLE: Duration = Duration::from_millis(50);

/// SSH client handler for russh
#[derive(Debug)]
struct SshClientHandler;

impl client::Handler for SshClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        // Accept all server keys (like StrictHostKeyChecking=no)
        Ok(true)
    }
}

/// An open SSH connection and its interactive shell channel
struct ShellSession {
    handle: client::Handle<SshClientHandler>,
    channel: Channel<Msg>,
}

/// Appliance reached over SSH
///
/// Holds at most one shell session, opened by `connect` and kept for the
/// lifetime of the client.
pub struct SshAppliance {
    info: ApplianceInfo,
    credentials: Credentials,
    timeout: Duration,
    session: Option<ShellSession>,
}

impl std::fmt::Debug for SshAppliance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshAppliance")
            .field("info", &self.info)
            .field("credentials", &self.credentials)
            .field("timeout", &self.timeout)
            .field("connected", &self.session.is_some())
            .finish()
    }
}

impl SshAppliance {
    /// Create an unconnected appliance client
    pub fn new(info: ApplianceInfo, credentials: Credentials) -> Self {
        Self {
            info,
            credentials,
            timeout: DEFAULT_TIMEOUT,
            session: None,
        }
    }

    /// Open the TCP connection, authenticate and start a shell
    #[instrument(skip(self), fields(host = %self.info.host))]
    async fn open_shell(&self) -> Result<ShellSession, ExecError> {
        info!(
            host = %self.info.host,
            port = self.info.port,
            user = %self.credentials.user,
            "connecting to appliance"
        );

        let config = Arc::new(client::Config::default());
        let connecting = client::connect(
            config,
            (&self.info.host[..], self.info.port),
            SshClientHandler,
        );
        let mut handle = timeout(self.timeout, connecting)
            .await
            .map_err(|_| ExecError::Timeout {
                timeout: self.timeout,
            })?
            .map_err(|e| ExecError::ConnectionFailed(e.to_string()))?;

        self.authenticate(&mut handle).await?;

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;
        channel
            .request_pty(false, "vt100", 200, 24, 0, 0, &[])
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;
        channel
            .request_shell(false)
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        info!(host = %self.info.host, "SSH shell opened");

        Ok(ShellSession { handle, channel })
    }

    async fn authenticate(
        &self,
        handle: &mut client::Handle<SshClientHandler>,
    ) -> Result<(), ExecError> {
        let user = &self.credentials.user;

        let auth_res = if let Some(key_path) = &self.credentials.ssh_key {
            self.credentials
                .validate_key()
                .map_err(|e| ExecError::SshKeyError(e.to_string()))?;
            let key_pair = load_secret_key(key_path, None)
                .map_err(|e| ExecError::SshKeyError(e.to_string()))?;

            let hash_alg = handle
                .best_supported_rsa_hash()
                .await
                .ok()
                .flatten()
                .flatten();
            handle
                .authenticate_publickey(
                    user,
                    PrivateKeyWithHashAlg::new(Arc::new(key_pair), hash_alg),
                )
                .await
        } else {
            let password = self
                .credentials
                .password()
                .map_err(|e| ExecError::CredentialError(e.to_string()))?;
            handle.authenticate_password(user, password).await
        }
        .map_err(|e| ExecError::AuthenticationFailed(e.to_string()))?;

        if !auth_res.success() {
            return Err(ExecError::AuthenticationFailed(format!(
                "SSH authentication rejected for {user}"
            )));
        }
        Ok(())
    }

    /// Answer login, password and domain cues until a command prompt appears
    async fn login(&mut self, domain: &str) -> Result<String, ExecError> {
        let password = self
            .credentials
            .password()
            .map_err(|e| ExecError::CredentialError(e.to_string()))?;
        let user = self.credentials.user.clone();
        let limit = self.timeout;
        let session = self.session.as_mut().ok_or(ExecError::NotConnected)?;

        let mut transcript = String::new();
        let mut sequence = LoginSequence::default();

        loop {
            let (chunk, cue) = read_until_prompt(&mut session.channel, limit).await?;
            transcript.push_str(&chunk);

            let reply = match sequence.next_step(cue) {
                LoginStep::Ready => return Ok(transcript),
                LoginStep::Reply(LoginField::User) => user.as_str(),
                LoginStep::Reply(LoginField::Password) => password.as_str(),
                LoginStep::Reply(LoginField::Domain) => domain,
                LoginStep::Closed => {
                    return Err(ExecError::ConnectionFailed(
                        "appliance closed the session during login".to_string(),
                    ));
                }
                LoginStep::Rejected => {
                    return Err(ExecError::AuthenticationFailed(
                        "appliance rejected the CLI login".to_string(),
                    ));
                }
                LoginStep::Exhausted => {
                    return Err(ExecError::AuthenticationFailed(
                        "appliance never reached a command prompt".to_string(),
                    ));
                }
            };
            debug!(cue = ?cue, "answering login cue");
            send_line(&session.channel, reply, limit).await?;
        }
    }
}

/// Write `line` followed by a newline to the shell
async fn send_line(channel: &Channel<Msg>, line: &str, limit: Duration) -> Result<(), ExecError> {
    let data = format!("{line}\n");
    timeout(limit, channel.data(data.as_bytes()))
        .await
        .map_err(|_| ExecError::Timeout { timeout: limit })?
        .map_err(|e| ExecError::IoError(e.to_string()))
}

/// Collect shell output until it ends in a prompt or the channel closes
///
/// Returns the text read and the prompt that ended it (`None` on close).
/// A prompt only ends the read once the channel has stayed quiet for
/// `SETTLE`, so output lines that happen to end in `# ` do not cut a
/// response short.
async fn read_until_prompt(
    channel: &mut Channel<Msg>,
    limit: Duration,
) -> Result<(String, Option<PromptKind>), ExecError> {
    let mut scanner = PromptScanner::default();

    let reading = async {
        let mut cue = None;
        loop {
            let msg = if cue.is_some() {
                match timeout(SETTLE, channel.wait()).await {
                    Ok(msg) => msg,
                    Err(_) => return cue,
                }
            } else {
                channel.wait().await
            };

            match msg {
                Some(ChannelMsg::Data { data } | ChannelMsg::ExtendedData { data, .. }) => {
                    cue = scanner.push(&data);
                }
                Some(ChannelMsg::Eof | ChannelMsg::Close) | None => return None,
                _ => {}
            }
        }
    };

    let cue = timeout(limit, reading)
        .await
        .map_err(|_| ExecError::Timeout { timeout: limit })?;

    Ok((scanner.into_text(), cue))
}

#[async_trait]
impl ApplianceClient for SshAppliance {
    fn hostname(&self) -> &str {
        &self.info.host
    }

    #[instrument(skip(self), fields(host = %self.info.host))]
    async fn connect(&mut self, domain: &str) -> Result<String, ExecError> {
        if self.session.is_some() {
            return Err(ExecError::AlreadyConnected);
        }

        let session = self.open_shell().await?;
        self.session = Some(session);

        let banner = self.login(domain).await?;
        info!(host = %self.info.host, domain = %domain, "logged into appliance");
        Ok(banner)
    }

    #[instrument(skip(self, command), fields(host = %self.info.host))]
    async fn execute(&mut self, command: &str) -> Result<String, ExecError> {
        let limit = self.timeout;
        let session = self.session.as_mut().ok_or(ExecError::NotConnected)?;

        debug!(command = %command, "sending command");
        send_line(&session.channel, command, limit).await?;

        let (response, cue) = read_until_prompt(&mut session.channel, limit).await?;
        if cue.is_none() {
            // the shell is gone; later commands fail with NotConnected
            info!(host = %self.info.host, "shell closed by appliance");
            self.session = None;
        }
        Ok(response)
    }

    async fn disconnect(&mut self) -> Result<(), ExecError> {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.channel.eof().await {
                warn!(host = %self.info.host, error = %e, "failed to close shell channel");
            }
            session
                .handle
                .disconnect(Disconnect::ByApplication, "", "English")
                .await
                .map_err(|e| ExecError::IoError(e.to_string()))?;
            info!(host = %self.info.host, "SSH disconnected");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

/// Builder for `SshAppliance`
pub struct SshApplianceBuilder {
    info: ApplianceInfo,
    credentials: Credentials,
    timeout: Duration,
}

impl SshApplianceBuilder {
    /// Create builder with required fields
    pub fn new(info: ApplianceInfo, credentials: Credentials) -> Self {
        Self {
            info,
            credentials,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the per-response timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the client
    pub fn build(self) -> SshAppliance {
        SshAppliance {
            timeout: self.timeout,
            ..SshAppliance::new(self.info, self.credentials)
        }
    }
}
