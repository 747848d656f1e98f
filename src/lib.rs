//! # propstore - Shared Reactive Property Store
//!
//! A process-wide key/value table whose writes are deduplicated by content
//! and broadcast to interested listeners. Writes are fingerprinted with a
//! canonical serialization, so only writes that carry new information are
//! announced; structurally identical re-writes are silent no-ops.
//!
//! ## Core Concepts
//!
//! - **State Table**: current value per key
//! - **Change Detector**: fingerprint comparison deciding whether a write is news
//! - **Notification Bus**: per-key, wildcard, and deletion channels plus a
//!   `resync` operation that redelivers current state unconditionally
//!
//! ## Usage
//!
//! ```
//! use std::rc::Rc;
//! use propstore::{PropStore, Value};
//!
//! // One instance, shared by handle - no global state required.
//! let store = Rc::new(PropStore::new());
//!
//! store.on("greeting", |value, key| {
//!     println!("{key} changed to {value}");
//! });
//! store.on_any(|value, key| {
//!     println!("something changed: {key} = {value}");
//! });
//!
//! let props = store.view();
//! props.set("greeting", "Hola").unwrap();   // announced
//! props.set("greeting", "Hola").unwrap();   // duplicate, silent
//! props.set("greeting", "Howdy").unwrap();  // announced
//!
//! store.resync();                           // redeliver current state
//! assert!(store.delete("greeting"));
//! ```
//!
//! The store is single-threaded by construction (`!Sync`); a multi-threaded
//! host must wrap it in its own lock.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod event;
pub mod fingerprint;
pub mod registry;
pub mod store;
pub mod value;

// Re-export primary types at crate root for convenience
pub use error::{CanonicalizationError, StoreError, StoreResult};
pub use event::Channel;
pub use fingerprint::{fingerprint, Fingerprint, FINGERPRINT_LEN};
pub use registry::{Handler, SubscriptionId};
pub use store::{PropStore, PropsView, StoreConfig};
pub use value::Value;
