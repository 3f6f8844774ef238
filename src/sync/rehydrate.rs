//! Read path
//!
//! Rebuilds nested objects from flat rows by resolving each declared relation
//! against the related table. `depth` bounds how far this goes: depth 0 returns
//! bare rows, depth 1 attaches related rows without their own relations, and
//! so on.

use futures::future::{join_all, BoxFuture, FutureExt};
use serde_json::Value;
use tracing::trace;

use crate::error::{SyncError, SyncResult};
use crate::schema::{Relation, RelationKind, ResourceSchema, Row, SchemaRegistry};
use crate::sync::store::LocalStore;

/// Row filter for local reads. Column names are checked against the table's
/// descriptor and values are always bound as parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Value),
    /// Any of the conditions holds (OR)
    Any(Vec<(String, Value)>),
    /// Every condition holds (AND)
    Every(Vec<(String, Value)>),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(column.into(), value.into())
    }

    fn to_sql(&self, schema: &ResourceSchema) -> SyncResult<(String, Vec<Value>)> {
        let conditions: Vec<(&String, &Value)> = match self {
            Filter::All => return Ok((String::new(), Vec::new())),
            Filter::Eq(column, value) => vec![(column, value)],
            Filter::Any(pairs) | Filter::Every(pairs) => pairs.iter().map(|(c, v)| (c, v)).collect(),
        };

        let mut parts = Vec::with_capacity(conditions.len());
        let mut params = Vec::with_capacity(conditions.len());
        for (column, value) in conditions {
            ensure_column(schema, column)?;
            parts.push(format!("{} = ?", column));
            params.push(value.clone());
        }

        let clause = match (self, parts.is_empty()) {
            (Filter::Any(_), true) => " WHERE 0".to_string(),
            (_, true) => String::new(),
            (Filter::Any(_), false) => format!(" WHERE {}", parts.join(" OR ")),
            (_, false) => format!(" WHERE {}", parts.join(" AND ")),
        };
        Ok((clause, params))
    }
}

fn ensure_column(schema: &ResourceSchema, column: &str) -> SyncResult<()> {
    if schema.find_column(column).is_some() {
        Ok(())
    } else {
        Err(SyncError::invalid_payload(
            schema.table,
            format!("unknown column {}", column),
        ))
    }
}

/// Reads rows and attaches their relationship data.
pub struct Hydrator<'a> {
    store: &'a LocalStore,
    registry: &'a SchemaRegistry,
}

impl<'a> Hydrator<'a> {
    pub fn new(store: &'a LocalStore, registry: &'a SchemaRegistry) -> Self {
        Self { store, registry }
    }

    fn schema(&self, table: &str) -> SyncResult<&'a ResourceSchema> {
        self.registry
            .get(table)
            .ok_or_else(|| SyncError::UnknownResource(table.to_string()))
    }

    /// Raw rows of `table` matching `filter`, ordered by `order_by` (then id).
    pub async fn select(
        &self,
        table: &str,
        filter: &Filter,
        order_by: Option<&str>,
    ) -> SyncResult<Vec<Row>> {
        let schema = self.schema(table)?;
        let (clause, params) = filter.to_sql(schema)?;

        let order = match order_by {
            Some(column) if column != schema.id_column => {
                ensure_column(schema, column)?;
                format!("{}, {}", column, schema.id_column)
            }
            _ => schema.id_column.to_string(),
        };

        let sql = format!("SELECT * FROM {}{} ORDER BY {}", schema.table, clause, order);
        Ok(self.store.execute(&sql, &params).await?.rows)
    }

    /// Select and hydrate in one step.
    pub async fn load(&self, table: &str, filter: &Filter, depth: usize) -> SyncResult<Vec<Row>> {
        let rows = self.select(table, filter, None).await?;
        self.hydrate(table, rows, depth).await
    }

    /// Decode raw rows of `table` and attach relations up to `depth` levels.
    pub fn hydrate<'b>(
        &'b self,
        table: &'b str,
        rows: Vec<Row>,
        depth: usize,
    ) -> BoxFuture<'b, SyncResult<Vec<Row>>> {
        async move {
            let schema = self.schema(table)?;
            join_all(rows.into_iter().map(|raw| self.hydrate_row(schema, raw, depth)))
                .await
                .into_iter()
                .collect()
        }
        .boxed()
    }

    async fn hydrate_row(&self, schema: &ResourceSchema, raw: Row, depth: usize) -> SyncResult<Row> {
        let sidecars: Vec<(&'static str, Value)> = schema
            .sidecar_columns()
            .filter_map(|key| schema.sidecar_payload(&raw, key).map(|v| (key, v)))
            .collect();

        let mut row = schema.decode_row(raw);
        if depth == 0 {
            return Ok(row);
        }

        for relation in &schema.relations {
            let resolved = if self.registry.contains(relation.target) {
                self.resolve(schema, relation, &row, depth - 1).await?
            } else {
                None
            };

            let value = resolved.or_else(|| {
                sidecars
                    .iter()
                    .find(|(key, _)| *key == relation.key)
                    .map(|(_, payload)| payload.clone())
            });

            match value {
                Some(value) => {
                    row.insert(relation.key.to_string(), value);
                }
                None => trace!("{}.{} not loaded", schema.table, relation.key),
            }
        }
        Ok(row)
    }

    async fn resolve(
        &self,
        schema: &ResourceSchema,
        relation: &Relation,
        row: &Row,
        depth: usize,
    ) -> SyncResult<Option<Value>> {
        match relation.kind {
            RelationKind::HasMany {
                foreign_column,
                order_by,
            } => {
                let Some(id) = row.get(schema.id_column) else {
                    return Ok(None);
                };
                let raw = self
                    .select(relation.target, &Filter::eq(foreign_column, id.clone()), order_by)
                    .await?;
                let children = self.hydrate(relation.target, raw, depth).await?;
                Ok(Some(Value::Array(
                    children.into_iter().map(Value::Object).collect(),
                )))
            }
            RelationKind::BelongsTo {
                local_column,
                join_column,
            } => {
                let Some(key) = row.get(local_column) else {
                    return Ok(None);
                };
                let mut raw = self
                    .select(relation.target, &Filter::eq(join_column, key.clone()), None)
                    .await?;
                raw.truncate(1);
                let mut found = self.hydrate(relation.target, raw, depth).await?;
                Ok(found.pop().map(Value::Object))
            }
        }
    }
}
