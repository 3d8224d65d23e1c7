//! Appliance address information

use std::fmt;

/// Default SSH port
pub const DEFAULT_PORT: u16 = 22;

/// Network address of an appliance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplianceInfo {
    /// Hostname or address, also used as the display name
    pub host: String,
    /// SSH port (default 22)
    pub port: u16,
}

impl ApplianceInfo {
    /// Create appliance info on the default port
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
        }
    }

    /// Set custom port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Parse `host` or `host:port`
    ///
    /// Bracketed IPv6 literals (`[::1]:2222`) are accepted; a bare IPv6
    /// address without brackets is taken as a host on the default port.
    ///
    /// # Errors
    /// Returns a message when the host is empty or the port is not a number
    pub fn parse(spec: &str) -> Result<Self, String> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err("empty appliance address".to_string());
        }

        if let Some(rest) = spec.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| format!("unterminated '[' in {spec}"))?;
            return match tail.strip_prefix(':') {
                Some(port) => Ok(Self::new(host).with_port(parse_port(port, spec)?)),
                None if tail.is_empty() => Ok(Self::new(host)),
                None => Err(format!("unexpected text after ']' in {spec}")),
            };
        }

        match spec.split_once(':') {
            Some((host, port)) if !port.contains(':') => {
                if host.is_empty() {
                    return Err(format!("missing host in {spec}"));
                }
                Ok(Self::new(host).with_port(parse_port(port, spec)?))
            }
            _ => Ok(Self::new(spec)),
        }
    }
}

fn parse_port(port: &str, spec: &str) -> Result<u16, String> {
    port.parse()
        .map_err(|_| format!("invalid port '{port}' in {spec}"))
}

impl fmt::Display for ApplianceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.port == DEFAULT_PORT {
            write!(f, "{}", self.host)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
