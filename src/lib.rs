//! # irclink
//!
//! An IRC client connection library: it connects over TCP or TLS, registers,
//! reassembles socket reads into lines, parses each line and dispatches it
//! to per-command handlers.
//!
//! ## Features
//!
//! - IRC line parsing with tags, sources, commands and trailing parameters
//! - Fixed-capacity line reassembly that survives partial reads
//! - Case-insensitive command handler registry with built-in `PING` and
//!   nickname-collision handling
//! - Observer hooks for raw traffic, parsed messages and connection errors
//! - Optional TLS via rustls
//!
//! The parser, line buffer and nickname machine do not need Tokio and are
//! available with `default-features = false`.
//!
//! ## Quick Start
//!
//! ### Parsing IRC Messages
//!
//! ```rust
//! use irclink::Message;
//!
//! let raw = "@time=2023-01-01T12:00:00Z :nick!user@host PRIVMSG #channel :Hello!";
//! let message: Message = raw.parse().expect("Valid IRC message");
//!
//! assert_eq!(message.source_nickname(), Some("nick"));
//! assert_eq!(message.param(1), Some("Hello!"));
//! ```
//!
//! ### Running a Client
//!
//! ```no_run
//! use irclink::{Client, User};
//!
//! # async fn run() -> irclink::Result<()> {
//! let client = Client::new("irc.example.com", User::new("bot"), false)?;
//! client.register_handler("PRIVMSG", |client, msg| {
//!     if msg.param(1) == Some("!ping") {
//!         let _ = client.send_fmt(format_args!("PRIVMSG {} :pong", msg.param(0).unwrap_or("")));
//!     }
//! });
//! client.connect().await?;
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod casemap;
pub mod config;
pub mod error;
pub mod line;
pub mod message;
pub mod nick;
pub mod source;
pub mod user;

#[cfg(feature = "tokio")]
pub mod client;
#[cfg(feature = "tokio")]
pub mod event;
#[cfg(feature = "tokio")]
pub mod handler;
#[cfg(feature = "tokio")]
mod transport;

pub use self::config::{ClientConfig, ServerAddress};
pub use self::error::{
    ClientError, ConfigError, ConnectionError, LineTooLong, MessageParseError, Result,
};
pub use self::line::{LineBuffer, READ_BUFFER_CAPACITY};
pub use self::message::{Message, Tag};
pub use self::nick::{NickRetry, NickRetryAction, NickRetryState};
pub use self::source::Source;
pub use self::user::User;

#[cfg(feature = "tokio")]
pub use self::client::{Client, ConnectionState};
#[cfg(feature = "tokio")]
pub use self::event::Observers;
#[cfg(feature = "tokio")]
pub use self::handler::{Handler, HandlerRegistry};
#[cfg(feature = "tokio")]
pub use self::line::LineCodec;
