use std::sync::Arc;

use crate::client::RemoteApi;
use crate::error::SyncResult;
use crate::schema::SchemaRegistry;
use crate::sync::confirm::{Confirm, NeverConfirm};
use crate::sync::connectivity::ConnectivityProbe;
use crate::sync::denormalize::Upserter;
use crate::sync::rehydrate::Hydrator;
use crate::sync::state::NoticeBus;
use crate::sync::store::LocalStore;

/// Relation depth used by reads unless configured otherwise
pub const DEFAULT_DEPTH: usize = 1;

/// Everything a resource controller needs, shared between controllers.
#[derive(Clone)]
pub struct SyncContext {
    pub store: LocalStore,
    pub remote: Arc<dyn RemoteApi>,
    pub probe: Arc<dyn ConnectivityProbe>,
    pub registry: Arc<SchemaRegistry>,
    pub notices: NoticeBus,
    pub confirm: Arc<dyn Confirm>,
    pub depth: usize,
}

impl SyncContext {
    /// Context over the built-in tables. Deletes are refused until a
    /// confirmer is installed with [`SyncContext::with_confirm`].
    pub fn new(
        store: LocalStore,
        remote: Arc<dyn RemoteApi>,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Self {
        Self {
            store,
            remote,
            probe,
            registry: Arc::new(SchemaRegistry::builtin()),
            notices: NoticeBus::default(),
            confirm: Arc::new(NeverConfirm),
            depth: DEFAULT_DEPTH,
        }
    }

    pub fn with_registry(mut self, registry: SchemaRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_confirm(mut self, confirm: Arc<dyn Confirm>) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Create any missing local tables.
    pub async fn init(&self) -> SyncResult<()> {
        self.store.ensure_schema(&self.registry).await
    }

    pub fn upserter(&self) -> Upserter<'_> {
        Upserter::new(&self.store, &self.registry)
    }

    pub fn hydrator(&self) -> Hydrator<'_> {
        Hydrator::new(&self.store, &self.registry)
    }
}
