//! IRC message source types.
//!
//! A source identifies the origin of a message. It is either a bare host
//! (usually a server name) or a user's `nick[!user]@host` mask.
//!
//! # Reference
//! - RFC 2812 Section 2.3.1: Message format

use std::str::FromStr;

/// IRC message source - identifies the origin of a message.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Source {
    /// Bare host, e.g. `irc.example.com`.
    Host(String),
    /// User mask: `nick!user@host`, where the `!user` part is optional.
    User {
        /// Nickname, the text before `!` (or before `@` when there is no `!`).
        nick: String,
        /// Username, the text between `!` and `@`.
        user: Option<String>,
        /// Hostname, the text after `@`.
        host: String,
    },
}

impl Source {
    /// Parse a source token (without the leading `:`).
    ///
    /// A token without `@` is a bare host. Otherwise the part before the
    /// first `@` is split on its first `!` into nick and user.
    pub fn parse(s: &str) -> Self {
        match s.split_once('@') {
            None => Source::Host(s.to_owned()),
            Some((names, host)) => {
                let (nick, user) = match names.split_once('!') {
                    Some((nick, user)) => (nick, Some(user.to_owned())),
                    None => (names, None),
                };
                Source::User {
                    nick: nick.to_owned(),
                    user,
                    host: host.to_owned(),
                }
            }
        }
    }

    /// Create a user source from nick, user, and host components.
    ///
    /// # Example
    ///
    /// ```
    /// use irclink::Source;
    ///
    /// let source = Source::new("nick", "user", "host.example.com");
    /// assert_eq!(source.nick(), Some("nick"));
    /// assert_eq!(source.user(), Some("user"));
    /// assert_eq!(source.host(), "host.example.com");
    /// ```
    pub fn new(nick: impl Into<String>, user: impl Into<String>, host: impl Into<String>) -> Self {
        Source::User {
            nick: nick.into(),
            user: Some(user.into()),
            host: host.into(),
        }
    }

    /// Get the nickname if this is a user source.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Source::User { nick, .. } => Some(nick),
            Source::Host(_) => None,
        }
    }

    /// Get the username if one was given.
    pub fn user(&self) -> Option<&str> {
        match self {
            Source::User { user, .. } => user.as_deref(),
            Source::Host(_) => None,
        }
    }

    /// Get the hostname.
    pub fn host(&self) -> &str {
        match self {
            Source::Host(host) | Source::User { host, .. } => host,
        }
    }
}

impl FromStr for Source {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Source::parse(s))
    }
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Source::parse(s)
    }
}
