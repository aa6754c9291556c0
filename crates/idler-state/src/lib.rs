//! idler-state — in-memory reconciliation state for faas-idler.
//!
//! # Architecture
//!
//! One [`ReconciliationState`] per target key (`{namespace}/{name}`),
//! held in a concurrent map. Entries use sliding expiration: every `get`
//! or `set` refreshes an entry's last-access time, and an entry left
//! untouched for longer than the TTL reads back as a fresh default.
//! Expiry is evaluated lazily on access; [`StateStore::purge_expired`]
//! releases entries for keys that are never looked up again.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by an `Arc`'d
//! map) and can be shared across async tasks.

pub mod store;
pub mod types;

pub use store::{StateStore, DEFAULT_STATE_TTL};
pub use types::*;
