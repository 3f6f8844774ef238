//! Offline-first synchronization
//!
//! This module provides:
//! - SQLite-backed local cache ([`LocalStore`]) and connectivity probes
//! - The upsert path flattening nested payloads into tables ([`Upserter`])
//! - The read path rebuilding nested objects from rows ([`Hydrator`])
//! - Per-resource controllers ([`ResourceSync`]) sequencing local read,
//!   remote fetch, upsert and re-read
//!
//! The server is authoritative. The local store is a cache that is overwritten
//! row by row on every successful fetch and is never written to by a failed
//! remote write.

pub mod confirm;
pub mod connectivity;
pub mod context;
pub mod denormalize;
pub mod manager;
pub mod properties;
pub mod rehydrate;
pub mod state;
pub mod store;

pub use confirm::{AutoConfirm, Confirm, DeletePrompt, NeverConfirm, StdinConfirm};
pub use connectivity::{ConnectivityProbe, HttpProbe, StaticProbe};
pub use context::{SyncContext, DEFAULT_DEPTH};
pub use denormalize::{UpsertReport, Upserter};
pub use manager::{Combinator, ParentScope, ResourceSync};
pub use rehydrate::{Filter, Hydrator};
pub use state::{Fetched, ItemState, Notice, NoticeBus, NoticeKind, SyncStatus};
pub use store::{LocalStore, RowSet};
