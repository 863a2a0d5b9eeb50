//! Client configuration.
//!
//! These are plain values. Loading them from files or the environment is
//! left to the application; with the `serde` feature they can be
//! deserialized directly.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::user::User;

/// Port used when an address does not name one.
pub const DEFAULT_PORT: u16 = 6667;

/// A `host:port` pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServerAddress {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl ServerAddress {
    /// Create an address from parts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ServerAddress {
            host: host.into(),
            port,
        }
    }

    /// Parse `host[:port]`; the port defaults to [`DEFAULT_PORT`].
    ///
    /// ```
    /// use irclink::config::ServerAddress;
    ///
    /// assert_eq!(ServerAddress::parse("irc.example.com").unwrap().port, 6667);
    /// assert_eq!(ServerAddress::parse("irc.example.com:6697").unwrap().port, 6697);
    /// assert!(ServerAddress::parse("a:b:c").is_err());
    /// ```
    pub fn parse(address: &str) -> Result<Self, ConfigError> {
        let invalid = |reason| ConfigError::InvalidAddress {
            address: address.to_owned(),
            reason,
        };

        let mut parts = address.split(':');
        let host = parts.next().unwrap_or_default();
        let port = parts.next();
        if parts.next().is_some() {
            return Err(invalid("more than one ':'"));
        }
        if host.is_empty() {
            return Err(invalid("empty host"));
        }

        let port = match port {
            None => DEFAULT_PORT,
            Some(port) => port.parse().map_err(|_| invalid("port is not a number"))?,
        };

        Ok(ServerAddress::new(host, port))
    }
}

impl FromStr for ServerAddress {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServerAddress::parse(s)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Everything a [`Client`](crate::Client) needs to connect.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClientConfig {
    /// Server to connect to.
    pub address: ServerAddress,
    /// Upgrade the connection to TLS before registering.
    #[cfg_attr(feature = "serde", serde(default))]
    pub tls: bool,
    /// Registration identity.
    pub user: User,
    /// Fail the connection when nothing is received for this long.
    #[cfg_attr(feature = "serde", serde(default))]
    pub read_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Build a configuration from an address string.
    pub fn new(address: &str, user: User, tls: bool) -> Result<Self, ConfigError> {
        Ok(ClientConfig {
            address: address.parse()?,
            tls,
            user,
            read_timeout: None,
        })
    }

    /// Set the read timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }
}
