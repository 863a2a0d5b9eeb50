//! Command handlers.
//!
//! Handlers are registered per command and invoked synchronously on the
//! reader task for every message carrying that command. Lookup folds the
//! command, so registrations are case-insensitive.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::casemap;
use crate::client::Client;
use crate::message::Message;

/// A command handler.
///
/// Handlers run on the reader task and must not block; spawn anything heavy.
pub type Handler = Arc<dyn Fn(&Client, &Message) + Send + Sync>;

/// Folded command name to handler.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in `PING` and `433` handlers.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("PING", ping);
        registry.register("433", nickname_in_use);
        registry
    }

    /// Bind `handler` to `command`, replacing any existing binding.
    pub fn register<F>(&mut self, command: &str, handler: F)
    where
        F: Fn(&Client, &Message) + Send + Sync + 'static,
    {
        self.insert(command, Arc::new(handler));
    }

    /// Bind an already shared handler.
    pub fn insert(&mut self, command: &str, handler: Handler) {
        if self
            .handlers
            .insert(casemap::fold_command(command), handler)
            .is_some()
        {
            debug!(command, "replaced command handler");
        }
    }

    /// Look up the handler for `command`.
    pub fn get(&self, command: &str) -> Option<Handler> {
        self.handlers.get(&casemap::fold_command(command)).cloned()
    }

    /// Whether a handler is bound to `command`.
    pub fn contains(&self, command: &str) -> bool {
        self.handlers.contains_key(&casemap::fold_command(command))
    }

    /// Number of bound commands.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no command is bound.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Answer `PING <token>` with `PONG :<token>`.
pub fn ping(client: &Client, msg: &Message) {
    let Some(token) = msg.param(0) else {
        warn!(raw = msg.raw(), "PING without parameter ignored");
        return;
    };

    if let Err(e) = client.send_fmt(format_args!("PONG :{}", token)) {
        debug!(error = %e, "could not answer PING");
    }
}

/// `433 ERR_NICKNAMEINUSE`: try the next alternative nickname.
pub fn nickname_in_use(client: &Client, _msg: &Message) {
    client.handle_nick_collision();
}
