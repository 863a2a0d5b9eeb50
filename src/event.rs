//! Observer lists for client notifications.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::ClientError;
use crate::message::Message;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// An ordered list of callbacks fired with a shared payload.
///
/// Subscribers run in registration order. Emitting with no subscribers does
/// nothing. The list is snapshotted before firing, so a callback may
/// subscribe further callbacks; those first fire on the next emit.
pub struct Observers<T: ?Sized> {
    callbacks: RwLock<Vec<Callback<T>>>,
}

impl<T: ?Sized> Default for Observers<T> {
    fn default() -> Self {
        Observers {
            callbacks: RwLock::new(Vec::new()),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Observers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("len", &self.len())
            .finish()
    }
}

impl<T: ?Sized> Observers<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a callback at the end of the list.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.callbacks.write().push(Arc::new(callback));
    }

    /// Fire every callback with `value`.
    pub fn emit(&self, value: &T) {
        let callbacks = self.callbacks.read().clone();
        for callback in &callbacks {
            callback(value);
        }
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    /// Whether there are no subscribers.
    pub fn is_empty(&self) -> bool {
        self.callbacks.read().is_empty()
    }
}

/// The notification channels of a client.
#[derive(Debug, Default)]
pub(crate) struct Notifications {
    pub raw_sent: Observers<str>,
    pub raw_received: Observers<str>,
    pub message: Observers<Message>,
    pub connected: Observers<()>,
    pub connection_error: Observers<ClientError>,
}
