//! Error types for the IRC client library.
//!
//! This module defines the client-level error taxonomy along with the
//! narrower errors for configuration, connection and message parsing.

use std::time::Duration;

use thiserror::Error;

/// Convenience type alias for Results using [`ClientError`].
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Top-level client errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The client was configured with an unusable value.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The transport or the TLS layer failed.
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Failed to parse an IRC message.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The raw message string.
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },

    /// A pending line filled the read buffer without a terminator.
    #[error("line exceeds read buffer capacity of {capacity} bytes")]
    LineTooLong {
        /// Capacity of the read buffer.
        capacity: usize,
    },

    /// Every automatic nickname alternative was rejected by the server.
    #[error("nickname {name:?} still in use after {tries} attempts")]
    NicknameExhausted {
        /// Number of collisions seen, including the final one.
        tries: u32,
        /// The nickname originally requested.
        name: String,
    },

    /// The operation needs a live connection.
    #[error("not connected")]
    NotConnected,

    /// `connect` was called while a connection exists or is being made.
    #[error("already connected")]
    AlreadyConnected,
}

impl ClientError {
    /// Whether this error ends the connection it was raised on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::LineTooLong { .. })
    }
}

/// A pending line filled the read buffer without a terminator.
///
/// Lines completed by the same feed before the overflow are handed back in
/// `completed`; only the unterminated bytes are lost.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line exceeds read buffer capacity of {capacity} bytes")]
pub struct LineTooLong {
    /// Capacity of the read buffer.
    pub capacity: usize,
    /// Lines completed before the overflow, in order.
    pub completed: Vec<String>,
}

impl From<LineTooLong> for ClientError {
    fn from(err: LineTooLong) -> Self {
        ClientError::LineTooLong {
            capacity: err.capacity,
        }
    }
}

/// Errors in client configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// The server address is not `host[:port]`.
    #[error("invalid server address {address:?}: {reason}")]
    InvalidAddress {
        /// The address as given.
        address: String,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Errors raised by the transport.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConnectionError {
    /// TCP connect failed.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        /// `host:port` that was dialled.
        address: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The host is not usable as a TLS server name.
    #[error("invalid TLS server name: {0}")]
    InvalidServerName(String),

    /// The TLS handshake failed.
    #[error("TLS handshake with {host} failed: {source}")]
    Tls {
        /// Server name presented for verification.
        host: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading from or writing to the socket failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection.
    #[error("connection closed by peer")]
    Closed,

    /// No data arrived within the configured read timeout.
    #[error("no data received for {0:?}")]
    ReadTimeout(Duration),
}

/// Errors encountered when parsing IRC messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Message was empty.
    #[error("empty message")]
    EmptyMessage,

    /// A tag block was not followed by a space.
    #[error("tag block is not terminated by a space")]
    UnterminatedTags,

    /// A source was not followed by a space.
    #[error("source is not terminated by a space")]
    UnterminatedSource,

    /// A `:` introduced a source but no source followed.
    #[error("empty source")]
    EmptySource,

    /// Nothing was left for the command.
    #[error("missing command")]
    EmptyCommand,
}
