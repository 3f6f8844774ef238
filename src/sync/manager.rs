//! Resource Sync Manager
//!
//! One [`ResourceSync`] per resource type. Reads serve the local cache first,
//! then, when online, fetch from the server, upsert the payload and re-read
//! the cache. Writes go to the server first and only reach the cache through
//! the re-fetch that follows. No remote or storage failure escapes: callers
//! get the last known data plus a [`SyncStatus`].

use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::error::{SyncError, SyncResult, ValidationError};
use crate::models::Resource;
use crate::protocol::{into_items, RemoteResult};
use crate::sync::confirm::DeletePrompt;
use crate::sync::context::SyncContext;
use crate::sync::rehydrate::Filter;
use crate::sync::state::{Fetched, ItemState, Notice, SyncStatus};

/// How parent conditions are joined when a scope has several columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Or,
    And,
}

/// Ties a resource's collections to a parent resource.
///
/// `columns` are the child's columns holding the parent id; messages use
/// `Sender_ID OR Receiver_ID` so a user's messages include both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentScope {
    pub resource: &'static str,
    pub columns: Vec<&'static str>,
    pub combinator: Combinator,
}

impl ParentScope {
    pub fn new(resource: &'static str, column: &'static str) -> Self {
        Self {
            resource,
            columns: vec![column],
            combinator: Combinator::Or,
        }
    }

    pub fn any(resource: &'static str, columns: &[&'static str]) -> Self {
        Self {
            resource,
            columns: columns.to_vec(),
            combinator: Combinator::Or,
        }
    }

    pub fn all(resource: &'static str, columns: &[&'static str]) -> Self {
        Self {
            resource,
            columns: columns.to_vec(),
            combinator: Combinator::And,
        }
    }

    pub fn filter(&self, parent_id: i64) -> Filter {
        let pairs: Vec<(String, Value)> = self
            .columns
            .iter()
            .map(|column| (column.to_string(), Value::from(parent_id)))
            .collect();
        match self.combinator {
            Combinator::Or => Filter::Any(pairs),
            Combinator::And => Filter::Every(pairs),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RemoteTarget {
    Collection,
    ByParent(i64),
    One(i64),
}

/// Outcome of one remote round (probe, fetch, upsert).
#[derive(Debug, Clone, Copy)]
struct RemoteRound {
    status: SyncStatus,
    /// The server said the requested item does not exist
    not_found: bool,
}

impl RemoteRound {
    fn status(status: SyncStatus) -> Self {
        Self {
            status,
            not_found: false,
        }
    }
}

/// In-memory view handed to the UI.
struct Cache<T> {
    items: Vec<T>,
    items_by_parent: HashMap<i64, Vec<T>>,
    item: HashMap<i64, ItemState<T>>,
}

impl<T> Default for Cache<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            items_by_parent: HashMap::new(),
            item: HashMap::new(),
        }
    }
}

/// Where a collection read lands in the cache.
#[derive(Debug, Clone, Copy)]
enum Slot {
    All,
    Parent(i64),
}

pub struct ResourceSync<T: Resource> {
    ctx: SyncContext,
    parent: Option<ParentScope>,
    id_column: &'static str,
    singular: &'static str,
    state: RwLock<Cache<T>>,
}

impl<T: Resource> ResourceSync<T> {
    /// Controller for `T` using its default parent scope. Fails when the
    /// context's registry has no descriptor for `T::TABLE`.
    pub fn new(ctx: SyncContext) -> SyncResult<Self> {
        let schema = ctx
            .registry
            .get(T::TABLE)
            .ok_or_else(|| SyncError::UnknownResource(T::TABLE.to_string()))?;
        let (id_column, singular) = (schema.id_column, schema.singular);

        Ok(Self {
            parent: T::parent_scope(),
            id_column,
            singular,
            ctx,
            state: RwLock::new(Cache::default()),
        })
    }

    pub fn with_parent(mut self, parent: Option<ParentScope>) -> Self {
        self.parent = parent;
        self
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    pub fn parent_scope(&self) -> Option<&ParentScope> {
        self.parent.as_ref()
    }

    // ==================== Reads ====================

    /// All cached items, refreshed from the server when online.
    pub async fn read_all(&self, refresh: bool) -> Fetched<Vec<T>> {
        if refresh {
            self.state.write().await.items.clear();
        }
        self.read_collection(RemoteTarget::Collection, Filter::All, Slot::All)
            .await
    }

    /// Items belonging to `parent_id`, refreshed from the server when online.
    pub async fn read_all_by_parent(&self, parent_id: i64, refresh: bool) -> Fetched<Vec<T>> {
        let Some(scope) = &self.parent else {
            warn!("{} has no parent scope; nothing to read by parent", T::TABLE);
            return Fetched::new(Vec::new(), SyncStatus::Skipped);
        };
        if refresh {
            self.state.write().await.items_by_parent.remove(&parent_id);
        }
        let filter = scope.filter(parent_id);
        self.read_collection(RemoteTarget::ByParent(parent_id), filter, Slot::Parent(parent_id))
            .await
    }

    /// One item, as a tri-state: unloaded, loaded or confirmed absent.
    pub async fn read_one(&self, id: i64) -> Fetched<ItemState<T>> {
        let filter = Filter::eq(self.id_column, id);

        let mut local = self.read_local(&filter).await.map(first);
        if let Ok(Some(item)) = &local {
            self.set_item(id, ItemState::Loaded(item.clone())).await;
        }

        let round = self.sync_remote(RemoteTarget::One(id)).await;
        if round.status.is_synced() {
            local = self.read_local(&filter).await.map(first);
        }

        let state = match &local {
            Ok(Some(item)) => ItemState::Loaded(item.clone()),
            Ok(None) if round.not_found || round.status.is_synced() => ItemState::Absent,
            Ok(None) => ItemState::Unloaded,
            Err(_) => self.item(id).await,
        };
        debug!("{} #{}: {}", T::TABLE, id, state_name(&state));
        self.set_item(id, state.clone()).await;

        Fetched::new(state, final_status(round.status, local.is_ok()))
    }

    async fn read_collection(&self, target: RemoteTarget, filter: Filter, slot: Slot) -> Fetched<Vec<T>> {
        let mut local_ok = self.load_into(&filter, slot).await;

        let round = self.sync_remote(target).await;
        if round.status.is_synced() {
            local_ok = self.load_into(&filter, slot).await;
        }

        Fetched::new(self.slot(slot).await, final_status(round.status, local_ok))
    }

    // ==================== Writes ====================

    /// Create `item` on the server, then refresh the parent-scoped collection.
    /// Returns whether the server accepted it.
    pub async fn create(&self, parent_id: Option<i64>, item: &T) -> Result<bool, ValidationError> {
        item.validate()?;
        let Some(payload) = self.payload(item) else {
            return Ok(false);
        };
        if !self.ensure_online().await {
            return Ok(false);
        }

        let result = self.ctx.remote.create(T::TABLE, &payload).await;
        if self.accepted("create", result).is_none() {
            return Ok(false);
        }
        self.refresh_scope(parent_id).await;
        Ok(true)
    }

    /// Update `item` (which must carry its id) on the server, then refresh the
    /// parent-scoped collection.
    pub async fn update(&self, item: &T, parent_id: Option<i64>) -> Result<bool, ValidationError> {
        let id = item.id().ok_or_else(|| {
            ValidationError::single(format!("The {} has no id and cannot be updated.", self.singular))
        })?;
        item.validate()?;
        let Some(payload) = self.payload(item) else {
            return Ok(false);
        };
        if !self.ensure_online().await {
            return Ok(false);
        }

        let result = self.ctx.remote.update(T::TABLE, id, &payload).await;
        if self.accepted("update", result).is_none() {
            return Ok(false);
        }
        self.refresh_scope(parent_id).await;
        self.reload_item(id).await;
        Ok(true)
    }

    /// Delete after the user confirms. Refusal, connectivity loss and remote
    /// failure all return `false` without touching the cache.
    pub async fn delete(&self, id: i64, parent_id: Option<i64>) -> bool {
        let prompt = DeletePrompt::for_resource(self.singular);
        if !self.ctx.confirm.confirm(&prompt).await {
            info!("Delete of {} #{} cancelled", self.singular, id);
            return false;
        }
        if !self.ensure_online().await {
            return false;
        }

        let result = self.ctx.remote.delete(T::TABLE, id).await;
        if self.accepted("delete", result).is_none() {
            return false;
        }

        let sql = format!("DELETE FROM {} WHERE {} = ?", T::TABLE, self.id_column);
        if let Err(e) = self.ctx.store.execute(&sql, &[Value::from(id)]).await {
            error!("Failed to drop local {} #{}: {}", self.singular, id, e);
        }
        self.forget(id).await;
        self.refresh_scope(parent_id).await;
        true
    }

    // ==================== Cache accessors ====================

    pub async fn items(&self) -> Vec<T> {
        self.state.read().await.items.clone()
    }

    pub async fn items_by_parent(&self, parent_id: i64) -> Vec<T> {
        self.slot(Slot::Parent(parent_id)).await
    }

    /// Current state of one item; `Unloaded` until [`read_one`](Self::read_one) ran.
    pub async fn item(&self, id: i64) -> ItemState<T> {
        self.state
            .read()
            .await
            .item
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn clear(&self) {
        *self.state.write().await = Cache::default();
    }

    // ==================== Internals ====================

    /// Hydrated local rows for `filter`. Rows that do not decode into `T`
    /// are logged and skipped so one bad row never hides the others.
    async fn read_local(&self, filter: &Filter) -> SyncResult<Vec<T>> {
        let rows = match self
            .ctx
            .hydrator()
            .load(T::TABLE, filter, self.ctx.depth)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                error!("Local read of {} failed: {}", T::TABLE, e);
                return Err(e);
            }
        };

        let total = rows.len();
        let mut items = Vec::with_capacity(total);
        for row in rows {
            let id = row.get(self.id_column).cloned().unwrap_or(Value::Null);
            match serde_json::from_value::<T>(Value::Object(row)) {
                Ok(item) => items.push(item),
                Err(e) => warn!("Skipping unreadable {} row {}: {}", T::TABLE, id, e),
            }
        }

        debug!("{}: {} of {} local rows readable", T::TABLE, items.len(), total);
        Ok(items)
    }

    async fn load_into(&self, filter: &Filter, slot: Slot) -> bool {
        match self.read_local(filter).await {
            Ok(items) => {
                let mut state = self.state.write().await;
                match slot {
                    Slot::All => state.items = items,
                    Slot::Parent(parent_id) => {
                        state.items_by_parent.insert(parent_id, items);
                    }
                }
                true
            }
            Err(_) => false,
        }
    }

    async fn slot(&self, slot: Slot) -> Vec<T> {
        let state = self.state.read().await;
        match slot {
            Slot::All => state.items.clone(),
            Slot::Parent(parent_id) => state
                .items_by_parent
                .get(&parent_id)
                .cloned()
                .unwrap_or_default(),
        }
    }

    async fn set_item(&self, id: i64, item: ItemState<T>) {
        self.state.write().await.item.insert(id, item);
    }

    pub(crate) async fn reload_item(&self, id: i64) {
        if let Ok(found) = self.read_local(&Filter::eq(self.id_column, id)).await {
            if let Some(item) = first(found) {
                self.set_item(id, ItemState::Loaded(item)).await;
            }
        }
    }

    async fn forget(&self, id: i64) {
        let mut state = self.state.write().await;
        state.items.retain(|item| item.id() != Some(id));
        for items in state.items_by_parent.values_mut() {
            items.retain(|item| item.id() != Some(id));
        }
        state.item.insert(id, ItemState::Absent);
    }

    fn payload(&self, item: &T) -> Option<Value> {
        match serde_json::to_value(item) {
            Ok(payload) => Some(payload),
            Err(e) => {
                error!("Failed to serialize {}: {}", self.singular, e);
                None
            }
        }
    }

    pub(crate) async fn ensure_online(&self) -> bool {
        if self.ctx.probe.is_online().await {
            return true;
        }
        info!("{}: offline, write not attempted", T::TABLE);
        self.ctx.notices.publish(Notice::offline(T::TABLE));
        false
    }

    /// Log the outcome of a write and notify on failure. Any 2xx answer
    /// counts as accepted; its body is returned.
    pub(crate) fn accepted(&self, action: &str, result: RemoteResult) -> Option<Value> {
        match result {
            Ok(body) => {
                info!("{} {} accepted by server", self.singular, action);
                Some(body)
            }
            Err(failure) => {
                warn!("{} {} failed: {}", self.singular, action, failure);
                self.ctx.notices.publish(Notice::sync_failed(T::TABLE));
                None
            }
        }
    }

    /// Re-fetch the collection a write affected: the parent-scoped one when
    /// both a parent id and a scope exist, the full collection otherwise.
    pub(crate) async fn refresh_scope(&self, parent_id: Option<i64>) {
        let (target, filter, slot) = match (parent_id, &self.parent) {
            (Some(parent_id), Some(scope)) => (
                RemoteTarget::ByParent(parent_id),
                scope.filter(parent_id),
                Slot::Parent(parent_id),
            ),
            _ => (RemoteTarget::Collection, Filter::All, Slot::All),
        };

        if self.sync_remote(target).await.status.is_synced() {
            self.load_into(&filter, slot).await;
        }
    }

    /// Upsert a payload the server returned outside of a fetch.
    pub(crate) async fn store_payload(&self, payload: Value) -> SyncResult<usize> {
        let items = into_items(payload)
            .ok_or_else(|| SyncError::invalid_payload(T::TABLE, "expected an object or array"))?;
        self.ctx.upserter().upsert(T::TABLE, &items).await
    }

    async fn fetch(&self, target: RemoteTarget) -> RemoteResult {
        let remote = &self.ctx.remote;
        match (target, &self.parent) {
            (RemoteTarget::Collection, _) | (RemoteTarget::ByParent(_), None) => {
                remote.fetch_collection(T::TABLE).await
            }
            (RemoteTarget::ByParent(parent_id), Some(scope)) => {
                remote
                    .fetch_collection_by_parent(scope.resource, parent_id, T::TABLE)
                    .await
            }
            (RemoteTarget::One(id), _) => remote.fetch_one(T::TABLE, id).await,
        }
    }

    async fn sync_remote(&self, target: RemoteTarget) -> RemoteRound {
        if !self.ctx.probe.is_online().await {
            info!("{}: offline, serving cached data", T::TABLE);
            self.ctx.notices.publish(Notice::offline(T::TABLE));
            return RemoteRound::status(SyncStatus::Offline);
        }

        let payload = match self.fetch(target).await {
            Ok(payload) => payload,
            Err(failure) if failure.is_not_found() => {
                debug!("{}: {:?} not found on server", T::TABLE, target);
                return RemoteRound {
                    status: SyncStatus::RemoteFailed,
                    not_found: true,
                };
            }
            Err(failure) => {
                warn!("Remote fetch of {} failed: {}", T::TABLE, failure);
                self.ctx.notices.publish(Notice::sync_failed(T::TABLE));
                return RemoteRound::status(SyncStatus::RemoteFailed);
            }
        };

        let Some(items) = into_items(payload) else {
            if let RemoteTarget::One(_) = target {
                return RemoteRound {
                    status: SyncStatus::Synced,
                    not_found: true,
                };
            }
            warn!("Remote {} payload is not a list of objects", T::TABLE);
            self.ctx.notices.publish(Notice::sync_failed(T::TABLE));
            return RemoteRound::status(SyncStatus::RemoteFailed);
        };

        let report = self.ctx.upserter().upsert_each(T::TABLE, &items).await;
        debug!(
            "{}: stored {} rows from {} items",
            T::TABLE,
            report.written,
            items.len()
        );
        if report.failed.is_empty() || report.stored > 0 {
            // Whatever reached the store is re-read; bad items were logged
            RemoteRound::status(SyncStatus::Synced)
        } else {
            error!("Failed to store any remote {}", T::TABLE);
            RemoteRound::status(SyncStatus::LocalFailed)
        }
    }
}

fn first<T>(items: Vec<T>) -> Option<T> {
    items.into_iter().next()
}

fn final_status(remote: SyncStatus, local_ok: bool) -> SyncStatus {
    if local_ok {
        remote
    } else {
        SyncStatus::LocalFailed
    }
}

fn state_name<T>(state: &ItemState<T>) -> &'static str {
    match state {
        ItemState::Unloaded => "unloaded",
        ItemState::Loaded(_) => "loaded",
        ItemState::Absent => "absent",
    }
}
