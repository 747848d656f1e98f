//! Subscription registry.
//!
//! Maps channels to ordered handler lists. Registration order is delivery
//! order for a given channel. Handlers are reference-counted so dispatch can
//! snapshot a channel's list and invoke it without holding the registry
//! borrow, which is what makes reentrant subscription changes safe.

use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::Channel;
use crate::value::Value;

/// Callback invoked with `(value, key)` on every event for its channel.
///
/// Deletion-channel handlers receive the value the key held before removal.
pub type Handler = Rc<dyn Fn(&Value, &str)>;

/// Unique identifier for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new random subscription id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-channel handler lists, ordered by registration.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    channels: HashMap<Channel, Vec<(SubscriptionId, Handler)>>,
}

impl SubscriptionRegistry {
    /// Register a handler on a channel and return its removal token.
    pub(crate) fn add(&mut self, channel: Channel, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.channels.entry(channel).or_default().push((id, handler));
        id
    }

    /// Remove one subscription by token. Returns whether it existed.
    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        for handlers in self.channels.values_mut() {
            if let Some(pos) = handlers.iter().position(|(hid, _)| *hid == id) {
                handlers.remove(pos);
                return true;
            }
        }
        false
    }

    /// Drop every subscription on a channel. Returns how many were removed.
    pub(crate) fn remove_channel(&mut self, channel: &Channel) -> usize {
        self.channels.remove(channel).map_or(0, |h| h.len())
    }

    /// Snapshot a channel's handlers in delivery order.
    pub(crate) fn handlers(&self, channel: &Channel) -> Vec<Handler> {
        self.channels
            .get(channel)
            .map(|hs| hs.iter().map(|(_, h)| Rc::clone(h)).collect())
            .unwrap_or_default()
    }

    /// Total live subscriptions across all channels.
    pub(crate) fn len(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (channel, handlers) in &self.channels {
            map.entry(&channel.to_string(), &handlers.len());
        }
        map.finish()
    }
}
