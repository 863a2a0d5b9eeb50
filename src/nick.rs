//! Sans-IO nickname retry state machine.
//!
//! When the server answers a registration with `433 ERR_NICKNAMEINUSE` the
//! client tries a short series of alternatives before giving up. This module
//! only decides what to do next; sending the `NICK` line and raising the
//! error are left to the caller.
//!
//! # Example
//!
//! ```
//! use irclink::nick::{NickRetry, NickRetryAction};
//!
//! let mut retry = NickRetry::new();
//! assert_eq!(
//!     retry.on_collision("alice"),
//!     NickRetryAction::Send("alice-1".to_string())
//! );
//! ```

use tracing::debug;

/// Collisions answered with `<nickname>-<n>`.
const SUFFIX_ATTEMPTS: u32 = 3;
/// Collisions answered with a truncated nickname.
const TRUNCATED_ATTEMPTS: u32 = 2;
/// Characters kept from the nickname for truncated alternatives.
const TRUNCATED_LEN: usize = 7;

/// Number of collisions after which retrying stops.
pub const MAX_COLLISIONS: u32 = SUFFIX_ATTEMPTS + TRUNCATED_ATTEMPTS + 1;

/// Where the machine is in its retry sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NickRetryState {
    /// No collision seen since the last reset.
    #[default]
    Idle,
    /// `n` collisions seen, the last one answered with an alternative.
    Retrying(u32),
    /// Every alternative was rejected.
    Exhausted,
}

/// What the caller should do about a collision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NickRetryAction {
    /// Send `NICK` with this nickname.
    Send(String),
    /// Give up. Raised once per connection.
    Exhausted {
        /// Number of collisions seen.
        tries: u32,
        /// The nickname originally requested.
        name: String,
    },
    /// Nothing to do.
    Ignore,
}

/// Nickname retry machine. Reset it whenever a new connection starts.
#[derive(Clone, Debug, Default)]
pub struct NickRetry {
    state: NickRetryState,
}

impl NickRetry {
    /// Create a machine in the [`Idle`](NickRetryState::Idle) state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> NickRetryState {
        self.state
    }

    /// Return to [`Idle`](NickRetryState::Idle).
    pub fn reset(&mut self) {
        self.state = NickRetryState::Idle;
    }

    /// Handle one collision for the requested `nickname`.
    pub fn on_collision(&mut self, nickname: &str) -> NickRetryAction {
        let n = match self.state {
            NickRetryState::Idle => 1,
            NickRetryState::Retrying(n) => n + 1,
            NickRetryState::Exhausted => {
                debug!(nickname, "nickname collision after retries were exhausted");
                return NickRetryAction::Ignore;
            }
        };

        if n >= MAX_COLLISIONS {
            self.state = NickRetryState::Exhausted;
            return NickRetryAction::Exhausted {
                tries: n,
                name: nickname.to_owned(),
            };
        }

        self.state = NickRetryState::Retrying(n);
        let alternative = if n <= SUFFIX_ATTEMPTS {
            format!("{}-{}", nickname, n)
        } else {
            let head: String = nickname.chars().take(TRUNCATED_LEN).collect();
            format!("{}-{}", head, n - SUFFIX_ATTEMPTS)
        };
        debug!(nickname, %alternative, attempt = n, "nickname in use, retrying");

        NickRetryAction::Send(alternative)
    }
}
