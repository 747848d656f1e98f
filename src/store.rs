//! The shared property store.
//!
//! Three cooperating parts behind one struct: the state table (current value
//! per key), the change detector (fingerprint comparison deciding whether a
//! write is news), and the notification bus (per-key, wildcard, and deletion
//! channels). Dispatch is synchronous and single-threaded; interior
//! mutability keeps the store usable from inside its own handlers, and the
//! `!Sync` type makes a multi-threaded host supply its own locking.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use tracing::{debug, error, warn};

use crate::error::StoreResult;
use crate::event::Channel;
use crate::fingerprint::{fingerprint, Fingerprint};
use crate::registry::{Handler, SubscriptionId, SubscriptionRegistry};
use crate::value::Value;

/// Store tuning knobs.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Maximum nested dispatch depth before further emissions are suppressed.
    ///
    /// `None` (the default) places no bound: a handler that keeps writing
    /// changed values can emit indefinitely, which is the caller's problem.
    /// Setting a limit trades lost notifications for a hard stop; suppressed
    /// emissions are counted via [`PropStore::suppressed_emissions`].
    pub max_dispatch_depth: Option<usize>,
}

/// The three tables share one borrow so every operation sees them move
/// together.
#[derive(Default)]
struct Tables {
    props: BTreeMap<String, Value>,
    prints: HashMap<String, Fingerprint>,
    subs: SubscriptionRegistry,
}

/// Shared reactive property store.
///
/// Writes through [`write`](Self::write) are deduplicated by content
/// fingerprint and announced to per-key and wildcard subscribers; duplicate
/// writes are silent no-ops. Hold one instance in an `Rc` for process-wide
/// sharing.
///
/// # Examples
///
/// ```
/// use propstore::{PropStore, Value};
///
/// let store = PropStore::new();
/// store.on("score", |value, key| {
///     println!("{key} is now {value}");
/// });
///
/// assert!(store.write("score", 100).unwrap());  // announced
/// assert!(!store.write("score", 100).unwrap()); // duplicate, silent
/// assert!(store.write("score", 200).unwrap());  // announced again
/// ```
pub struct PropStore {
    cfg: StoreConfig,
    tables: RefCell<Tables>,
    dispatch_depth: Cell<usize>,
    suppressed_emissions: Cell<u64>,
    handler_faults: Cell<u64>,
}

impl PropStore {
    /// Create an empty store with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create an empty store with explicit configuration.
    #[must_use]
    pub fn with_config(cfg: StoreConfig) -> Self {
        Self {
            cfg,
            tables: RefCell::new(Tables::default()),
            dispatch_depth: Cell::new(0),
            suppressed_emissions: Cell::new(0),
            handler_faults: Cell::new(0),
        }
    }

    /// Deduplicated, notifying write.
    ///
    /// Fingerprints `value` and compares against the key's previous
    /// fingerprint. A first-ever write or a changed value is stored and
    /// announced on the key's channel and the wildcard channel, payload
    /// `(value, key)` on both; a structurally identical value is a silent
    /// no-op. Comparison is only against the immediately preceding accepted
    /// value, so changing and changing back re-announces.
    ///
    /// Returns whether the write was accepted and announced.
    ///
    /// # Errors
    ///
    /// [`StoreError::Canonicalization`](crate::StoreError::Canonicalization)
    /// when the value cannot be fingerprinted; no state is mutated.
    pub fn write(&self, key: impl Into<String>, value: impl Into<Value>) -> StoreResult<bool> {
        let key = key.into();
        let value = value.into();
        let print = fingerprint(&value)?;

        let accepted = {
            let mut tables = self.tables.borrow_mut();
            match tables.prints.get(&key) {
                Some(prev) if *prev == print => false,
                _ => {
                    tables.props.insert(key.clone(), value.clone());
                    tables.prints.insert(key.clone(), print);
                    true
                }
            }
        };

        if accepted {
            debug!(key = %key, value = %value, "write accepted");
            self.dispatch(&Channel::Key(key.clone()), &value, &key);
            self.dispatch(&Channel::Wildcard, &value, &key);
        } else {
            debug!(key = %key, "duplicate write suppressed");
        }
        Ok(accepted)
    }

    /// Unconditional, non-notifying write.
    ///
    /// Assigns the value bypassing the change detector and without emitting.
    /// This is the escape hatch for handlers that update a key in reaction
    /// to its own event without starting a feedback loop. The fingerprint
    /// table is left untouched, so the next [`write`](Self::write) still
    /// compares against the last *announced* value.
    pub fn write_silent(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        self.tables.borrow_mut().props.insert(key, value.into());
    }

    /// Delete a key.
    ///
    /// If present: drops every subscription on exactly this key's channel,
    /// announces the deletion with `(previous value, key)`, then removes the
    /// value and its fingerprint. A later write of the same key is a
    /// first-ever write again. Returns whether the key existed; deleting an
    /// absent key is a silent no-op.
    pub fn delete(&self, key: &str) -> bool {
        let previous = {
            let mut tables = self.tables.borrow_mut();
            let Some(prev) = tables.props.get(key).cloned() else {
                return false;
            };
            let dropped = tables.subs.remove_channel(&Channel::key(key));
            debug!(key, dropped_subscriptions = dropped, "deleting property");
            prev
        };

        self.dispatch(&Channel::Deletion, &previous, key);

        let mut tables = self.tables.borrow_mut();
        tables.props.remove(key);
        tables.prints.remove(key);
        true
    }

    /// Whether the key currently holds a value.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.tables.borrow().props.contains_key(key)
    }

    /// Current value of a key, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.tables.borrow().props.get(key).cloned()
    }

    /// Keys currently present, in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.tables.borrow().props.keys().cloned().collect()
    }

    /// Number of keys currently present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.borrow().props.len()
    }

    /// Whether the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.borrow().props.is_empty()
    }

    /// Subscribe to accepted writes of one key.
    ///
    /// Handlers on the same channel run in registration order. The returned
    /// token removes this subscription via [`off`](Self::off); deleting the
    /// key removes it in bulk.
    pub fn on(
        &self,
        key: impl Into<String>,
        handler: impl Fn(&Value, &str) + 'static,
    ) -> SubscriptionId {
        self.subscribe(Channel::Key(key.into()), Rc::new(handler))
    }

    /// Subscribe to accepted writes of every key.
    pub fn on_any(&self, handler: impl Fn(&Value, &str) + 'static) -> SubscriptionId {
        self.subscribe(Channel::Wildcard, Rc::new(handler))
    }

    /// Subscribe to deletions; the handler receives the removed value.
    pub fn on_delete(&self, handler: impl Fn(&Value, &str) + 'static) -> SubscriptionId {
        self.subscribe(Channel::Deletion, Rc::new(handler))
    }

    /// Remove one subscription by token. Returns whether it existed.
    pub fn off(&self, id: SubscriptionId) -> bool {
        self.tables.borrow_mut().subs.remove(id)
    }

    /// Number of live subscriptions across all channels.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.tables.borrow().subs.len()
    }

    /// Re-announce every currently stored value, bypassing the change
    /// detector.
    ///
    /// Fires the per-key and wildcard channels for each present key in
    /// sorted key order, exactly as an accepted write would. Used to bring
    /// newly attached subscribers up to date. Returns the number of keys
    /// redelivered.
    pub fn resync(&self) -> usize {
        let entries: Vec<(String, Value)> = {
            let tables = self.tables.borrow();
            tables
                .props
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };

        for (key, value) in &entries {
            self.dispatch(&Channel::key(key.as_str()), value, key);
            self.dispatch(&Channel::Wildcard, value, key);
        }

        debug!(keys = entries.len(), "resync complete");
        entries.len()
    }

    /// Assignment-sugar view over this store.
    #[must_use]
    pub fn view(&self) -> PropsView<'_> {
        PropsView { store: self }
    }

    /// Emissions dropped by the [`StoreConfig::max_dispatch_depth`] guard.
    #[must_use]
    pub fn suppressed_emissions(&self) -> u64 {
        self.suppressed_emissions.get()
    }

    /// Handler panics caught and isolated during dispatch.
    #[must_use]
    pub fn handler_faults(&self) -> u64 {
        self.handler_faults.get()
    }

    fn subscribe(&self, channel: Channel, handler: Handler) -> SubscriptionId {
        self.tables.borrow_mut().subs.add(channel, handler)
    }

    /// Invoke a channel's handlers with the table borrow released, so
    /// handlers may re-enter any store operation. A panicking handler is
    /// isolated: the fault is logged and dispatch continues with the rest.
    fn dispatch(&self, channel: &Channel, value: &Value, key: &str) {
        if let Some(limit) = self.cfg.max_dispatch_depth {
            if self.dispatch_depth.get() >= limit {
                self.suppressed_emissions
                    .set(self.suppressed_emissions.get() + 1);
                warn!(channel = %channel, key, "dispatch depth limit reached, emission suppressed");
                return;
            }
        }

        let handlers = self.tables.borrow().subs.handlers(channel);
        if handlers.is_empty() {
            return;
        }

        self.dispatch_depth.set(self.dispatch_depth.get() + 1);
        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(value, key))).is_err() {
                self.handler_faults.set(self.handler_faults.get() + 1);
                error!(channel = %channel, key, "subscriber panicked during dispatch, continuing");
            }
        }
        self.dispatch_depth.set(self.dispatch_depth.get() - 1);
    }
}

impl Default for PropStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PropStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.borrow();
        f.debug_struct("PropStore")
            .field("keys", &tables.props.len())
            .field("subscriptions", &tables.subs.len())
            .field("handler_faults", &self.handler_faults.get())
            .finish_non_exhaustive()
    }
}

/// Ergonomic per-key assignment over a [`PropStore`].
///
/// `view.set(key, value)` routes through the deduplicated, notifying write
/// path exactly as [`PropStore::write`] does. The view is sugar over the
/// store's methods, never a separate contract.
#[derive(Debug, Clone, Copy)]
pub struct PropsView<'a> {
    store: &'a PropStore,
}

impl PropsView<'_> {
    /// Observed write, identical to [`PropStore::write`].
    ///
    /// # Errors
    ///
    /// Same as [`PropStore::write`].
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> StoreResult<bool> {
        self.store.write(key, value)
    }

    /// Current value of a key, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.get(key)
    }

    /// Whether the key currently holds a value.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.store.has(key)
    }
}
