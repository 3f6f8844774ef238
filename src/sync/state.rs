//! Sync outcomes and user-facing notices
//!
//! Reads never fail outward. They report what happened through [`SyncStatus`]
//! and, for conditions the user should see, a [`Notice`] published on the
//! [`NoticeBus`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

pub const OFFLINE_NOTICE: &str = "You don't have an internet connection.";
pub const SYNC_FAILED_NOTICE: &str = "Could not sync with server.";

/// Loading state of a single item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemState<T> {
    /// Nothing is known yet, or the item could not be checked remotely
    Unloaded,
    Loaded(T),
    /// Neither the server nor the local cache has it
    Absent,
}

impl<T> Default for ItemState<T> {
    fn default() -> Self {
        ItemState::Unloaded
    }
}

impl<T> ItemState<T> {
    pub fn is_unloaded(&self) -> bool {
        matches!(self, ItemState::Unloaded)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ItemState::Absent)
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            ItemState::Loaded(item) => Some(item),
            _ => None,
        }
    }

    pub fn into_loaded(self) -> Option<T> {
        match self {
            ItemState::Loaded(item) => Some(item),
            _ => None,
        }
    }
}

/// How far a read got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Remote data was fetched and stored locally
    Synced,
    /// No connection; local data only
    Offline,
    /// The remote call failed; local data only
    RemoteFailed,
    /// The local store failed; in-memory data left as it was
    LocalFailed,
    /// Remote sync was not attempted
    Skipped,
}

impl SyncStatus {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncStatus::Synced)
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Synced => write!(f, "synced"),
            SyncStatus::Offline => write!(f, "offline"),
            SyncStatus::RemoteFailed => write!(f, "remote failed"),
            SyncStatus::LocalFailed => write!(f, "local failed"),
            SyncStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Result of a read: whatever data is available plus how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub status: SyncStatus,
}

impl<T> Fetched<T> {
    pub fn new(data: T, status: SyncStatus) -> Self {
        Self { data, status }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Offline,
    SyncFailed,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub resource: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn offline(resource: &str) -> Self {
        Self::new(NoticeKind::Offline, resource, OFFLINE_NOTICE)
    }

    pub fn sync_failed(resource: &str) -> Self {
        Self::new(NoticeKind::SyncFailed, resource, SYNC_FAILED_NOTICE)
    }

    fn new(kind: NoticeKind, resource: &str, message: &str) -> Self {
        Self {
            kind,
            resource: resource.to_string(),
            message: message.to_string(),
            at: Utc::now(),
        }
    }
}

/// Broadcast channel for notices. Publishing with no subscribers is fine.
#[derive(Debug, Clone)]
pub struct NoticeBus {
    tx: broadcast::Sender<Notice>,
}

impl NoticeBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn publish(&self, notice: Notice) {
        if self.tx.send(notice).is_err() {
            trace!("Notice dropped: no subscribers");
        }
    }
}

impl Default for NoticeBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_state_accessors() {
        let state: ItemState<u32> = ItemState::default();
        assert!(state.is_unloaded());
        assert_eq!(state.loaded(), None);

        let state = ItemState::Loaded(3);
        assert_eq!(state.loaded(), Some(&3));
        assert_eq!(state.into_loaded(), Some(3));

        assert!(ItemState::<u32>::Absent.is_absent());
    }

    #[tokio::test]
    async fn test_notice_bus_delivers_to_subscribers() {
        let bus = NoticeBus::default();
        bus.publish(Notice::offline("properties"));

        let mut rx = bus.subscribe();
        bus.publish(Notice::sync_failed("messages"));

        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.kind, NoticeKind::SyncFailed);
        assert_eq!(notice.resource, "messages");
        assert_eq!(notice.message, "Could not sync with server.");
        assert!(rx.try_recv().is_err());
    }
}
