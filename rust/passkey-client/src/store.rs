//! Reactive signals observed by UI layers.
//!
//! A [`Signal`] is a counter whose value carries no meaning of its own: any
//! change tells subscribers to refetch whatever the signal guards (the
//! session, the passkey list).

use passkey_common::{ConditionalSync, SharedCell};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// Signal refreshed after a successful passkey sign-in.
pub const SESSION_SIGNAL: &str = "$sessionSignal";

/// Signal refreshed after a passkey is added.
pub const LIST_PASSKEYS_SIGNAL: &str = "$listPasskeys";

/// An observable change counter.
#[derive(Debug, Clone)]
pub struct Signal {
    sender: Arc<watch::Sender<u64>>,
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

impl Signal {
    /// A signal starting at zero.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(0);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// The current value.
    pub fn get(&self) -> u64 {
        *self.sender.borrow()
    }

    /// Change the value, waking every subscriber.
    pub fn bump(&self) {
        self.sender.send_modify(|value| *value = value.wrapping_add(1));
    }

    /// Observe changes from now on.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.sender.subscribe()
    }
}

/// The client store actions notify once a server has accepted a result.
pub trait Store: ConditionalSync {
    /// Refresh the signal called `name`.
    fn notify(&self, name: &str);
}

impl<S> Store for Arc<S>
where
    S: Store + ?Sized,
{
    fn notify(&self, name: &str) {
        (**self).notify(name)
    }
}

/// A [`Store`] of named [`Signal`]s, created on first use.
#[derive(Debug, Default)]
pub struct SignalStore {
    signals: SharedCell<HashMap<String, Signal>>,
}

impl SignalStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt signals owned elsewhere, such as a plugin's atoms.
    ///
    /// An existing signal with the same name is replaced.
    pub fn register(&self, name: impl Into<String>, signal: Signal) {
        self.signals.write().insert(name.into(), signal);
    }

    /// The signal called `name`, created if it does not exist yet.
    pub fn signal(&self, name: &str) -> Signal {
        if let Some(signal) = self.signals.read().get(name) {
            return signal.clone();
        }
        self.signals
            .write()
            .entry(name.to_owned())
            .or_default()
            .clone()
    }
}

impl Store for SignalStore {
    fn notify(&self, name: &str) {
        tracing::debug!(signal = name, "notify");
        self.signal(name).bump();
    }
}
