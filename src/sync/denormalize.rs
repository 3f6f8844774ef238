//! Upsert path
//!
//! Flattens nested resource objects into rows of their own tables. Each object
//! is written with `INSERT OR REPLACE` keyed by its id, then every non-null
//! relationship payload is upserted into the related table, recursively, using
//! the related table's own descriptor.

use futures::future::{join_all, BoxFuture, FutureExt};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::{SyncError, SyncResult};
use crate::protocol::into_items;
use crate::schema::{RelationKind, ResourceSchema, SchemaRegistry};
use crate::sync::store::LocalStore;

/// Writes nested payloads into the local store.
pub struct Upserter<'a> {
    store: &'a LocalStore,
    registry: &'a SchemaRegistry,
}

/// Outcome of [`Upserter::upsert_each`].
#[derive(Debug, Default)]
pub struct UpsertReport {
    /// Rows written across all tables
    pub written: usize,
    /// Top-level items stored with all their relations
    pub stored: usize,
    /// Index of each top-level item that failed, with its error
    pub failed: Vec<(usize, SyncError)>,
}

/// Child payloads collected from one parent object.
struct ChildBatch {
    target: &'static str,
    items: Vec<Value>,
}

impl<'a> Upserter<'a> {
    pub fn new(store: &'a LocalStore, registry: &'a SchemaRegistry) -> Self {
        Self { store, registry }
    }

    /// Upsert `items` into `table` and their relationships into the related
    /// tables. Returns the number of rows written across all tables.
    ///
    /// Children of one object are written concurrently and all of them finish
    /// before this call returns; if any failed, the first error is reported.
    pub fn upsert<'b>(&'b self, table: &'b str, items: &'b [Value]) -> BoxFuture<'b, SyncResult<usize>> {
        async move {
            let schema = self
                .registry
                .get(table)
                .ok_or_else(|| SyncError::UnknownResource(table.to_string()))?;

            let mut written = 0;
            for item in items {
                written += self.upsert_object(schema, item).await?;
            }
            Ok(written)
        }
        .boxed()
    }

    /// Upsert every top-level item on its own. A failing item is logged and
    /// recorded in the report; the items after it are still written.
    pub async fn upsert_each(&self, table: &str, items: &[Value]) -> UpsertReport {
        let mut report = UpsertReport::default();
        let Some(schema) = self.registry.get(table) else {
            warn!("No schema for {}; {} items not stored", table, items.len());
            report.failed = (0..items.len())
                .map(|index| (index, SyncError::UnknownResource(table.to_string())))
                .collect();
            return report;
        };

        for (index, item) in items.iter().enumerate() {
            match self.upsert_object(schema, item).await {
                Ok(written) => {
                    report.written += written;
                    report.stored += 1;
                }
                Err(e) => {
                    warn!("Skipping {} item {}: {}", table, index, e);
                    report.failed.push((index, e));
                }
            }
        }
        report
    }

    async fn upsert_object(&self, schema: &ResourceSchema, item: &Value) -> SyncResult<usize> {
        let object = item
            .as_object()
            .ok_or_else(|| SyncError::invalid_payload(schema.table, "expected a JSON object"))?;

        let id = match object.get(schema.id_column) {
            Some(id) if !id.is_null() => id.clone(),
            _ => {
                return Err(SyncError::invalid_payload(
                    schema.table,
                    format!("missing {}", schema.id_column),
                ))
            }
        };

        let mut columns = Vec::new();
        let mut params = Vec::new();
        for column in &schema.columns {
            if let Some(value) = object.get(column.name) {
                columns.push(column.name);
                params.push(value.clone());
            }
        }

        let mut batches = Vec::new();
        for relation in &schema.relations {
            let value = match object.get(relation.key) {
                Some(value) if !value.is_null() => value,
                _ => continue,
            };

            if !self.registry.contains(relation.target) {
                if relation.sidecar {
                    columns.push(relation.key);
                    params.push(Value::String(value.to_string()));
                } else {
                    debug!(
                        "No local table for {}.{}; payload not stored",
                        schema.table, relation.key
                    );
                }
                continue;
            }

            let Some(mut children) = into_items(value.clone()) else {
                debug!("Ignoring non-object payload at {}.{}", schema.table, relation.key);
                continue;
            };

            // Nested children do not always repeat their parent's id
            if let RelationKind::HasMany { foreign_column, .. } = relation.kind {
                for child in children.iter_mut() {
                    if let Some(child) = child.as_object_mut() {
                        child
                            .entry(foreign_column)
                            .or_insert_with(|| id.clone());
                    }
                }
            }

            batches.push(ChildBatch {
                target: relation.target,
                items: children,
            });
        }

        for key in object.keys() {
            if schema.find_column(key).is_none() && schema.find_relation(key).is_none() {
                trace!("Skipping undeclared key {}.{}", schema.table, key);
            }
        }

        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            schema.table,
            columns.join(", "),
            placeholders
        );
        self.store.execute(&sql, &params).await?;

        let results = join_all(
            batches
                .iter()
                .map(|batch| self.upsert(batch.target, &batch.items)),
        )
        .await;

        let mut written = 1;
        let mut first_error = None;
        for result in results {
            match result {
                Ok(count) => written += count,
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(_) => {}
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }
}
