//! Resource Schema Descriptors
//!
//! Every locally cached resource is described by a [`ResourceSchema`]: its table,
//! primary-id column, typed scalar columns and declared relationships. Both the
//! upsert path and the read path are driven by these descriptors, so nothing is
//! inferred from key names at runtime.

mod builtin;

use serde_json::{Map, Value};
use std::collections::HashMap;

pub use builtin::{favorites, images, messages, properties, users};

/// A flat row as stored in (or read from) a local table.
pub type Row = Map<String, Value>;

/// Storage type of a scalar column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    /// Stored as 0/1, read back as a JSON boolean
    Boolean,
    /// Arrays and objects stored as JSON text
    Json,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer | ColumnType::Boolean => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text | ColumnType::Json => "TEXT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
}

/// Cardinality of a relationship plus the columns used to resolve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    /// Child rows in `target` whose `foreign_column` equals this row's id.
    HasMany {
        foreign_column: &'static str,
        order_by: Option<&'static str>,
    },
    /// One row in `target` whose `join_column` equals this row's `local_column`.
    BelongsTo {
        local_column: &'static str,
        join_column: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Key under which the related data appears on the nested object
    pub key: &'static str,
    /// Table holding the related rows
    pub target: &'static str,
    pub kind: RelationKind,
    /// Whether the parent table carries a TEXT column named after `key`
    pub sidecar: bool,
}

impl Relation {
    pub fn is_has_many(&self) -> bool {
        matches!(self.kind, RelationKind::HasMany { .. })
    }
}

/// Descriptor for one resource: remote path segment, local table and layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSchema {
    pub table: &'static str,
    /// Human name used in prompts ("property", "message", ...)
    pub singular: &'static str,
    pub id_column: &'static str,
    pub columns: Vec<Column>,
    pub relations: Vec<Relation>,
}

impl ResourceSchema {
    /// Start a descriptor; the id column is registered as an INTEGER column.
    pub fn new(table: &'static str, singular: &'static str, id_column: &'static str) -> Self {
        Self {
            table,
            singular,
            id_column,
            columns: vec![Column {
                name: id_column,
                kind: ColumnType::Integer,
            }],
            relations: Vec::new(),
        }
    }

    pub fn column(mut self, name: &'static str, kind: ColumnType) -> Self {
        self.columns.push(Column { name, kind });
        self
    }

    pub fn integer(self, name: &'static str) -> Self {
        self.column(name, ColumnType::Integer)
    }

    pub fn real(self, name: &'static str) -> Self {
        self.column(name, ColumnType::Real)
    }

    pub fn text(self, name: &'static str) -> Self {
        self.column(name, ColumnType::Text)
    }

    pub fn boolean(self, name: &'static str) -> Self {
        self.column(name, ColumnType::Boolean)
    }

    pub fn json(self, name: &'static str) -> Self {
        self.column(name, ColumnType::Json)
    }

    pub fn has_many(
        mut self,
        key: &'static str,
        target: &'static str,
        foreign_column: &'static str,
    ) -> Self {
        self.relations.push(Relation {
            key,
            target,
            kind: RelationKind::HasMany {
                foreign_column,
                order_by: None,
            },
            sidecar: false,
        });
        self
    }

    pub fn has_many_ordered(
        mut self,
        key: &'static str,
        target: &'static str,
        foreign_column: &'static str,
        order_by: &'static str,
    ) -> Self {
        self.relations.push(Relation {
            key,
            target,
            kind: RelationKind::HasMany {
                foreign_column,
                order_by: Some(order_by),
            },
            sidecar: false,
        });
        self
    }

    pub fn belongs_to(
        mut self,
        key: &'static str,
        target: &'static str,
        local_column: &'static str,
        join_column: &'static str,
    ) -> Self {
        self.relations.push(Relation {
            key,
            target,
            kind: RelationKind::BelongsTo {
                local_column,
                join_column,
            },
            sidecar: false,
        });
        self
    }

    /// Give every relation declared so far a sidecar TEXT column.
    pub fn with_sidecars(mut self) -> Self {
        for relation in &mut self.relations {
            relation.sidecar = true;
        }
        self
    }

    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn find_relation(&self, key: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.key == key)
    }

    pub fn sidecar_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.relations.iter().filter(|r| r.sidecar).map(|r| r.key)
    }

    /// Convert a raw SQLite row into the JSON shape the rest of the system sees.
    ///
    /// NULL columns are dropped, booleans and JSON columns are restored to
    /// their JSON types. Sidecar columns are left out; the hydrator decides
    /// whether their payload is needed.
    pub fn decode_row(&self, raw: Row) -> Row {
        let mut row = Row::new();
        for (name, value) in raw {
            if value.is_null() {
                continue;
            }
            match self.find_column(&name) {
                Some(column) => {
                    row.insert(name, decode_value(column.kind, value));
                }
                None if self.find_relation(&name).is_some() => {}
                None => {
                    row.insert(name, value);
                }
            }
        }
        row
    }

    /// The declared, non-null columns of an object; relationship payloads and
    /// unknown keys are dropped.
    pub fn scalar_fields(&self, object: &Row) -> Row {
        self.columns
            .iter()
            .filter_map(|c| {
                object
                    .get(c.name)
                    .filter(|v| !v.is_null())
                    .map(|v| (c.name.to_string(), v.clone()))
            })
            .collect()
    }

    /// Parse the payload stored in a sidecar column, if any.
    pub fn sidecar_payload(&self, raw: &Row, key: &str) -> Option<Value> {
        match raw.get(key)? {
            Value::String(text) => serde_json::from_str(text).ok(),
            Value::Null => None,
            other => Some(other.clone()),
        }
    }
}

fn decode_value(kind: ColumnType, value: Value) -> Value {
    match (kind, value) {
        (ColumnType::Boolean, Value::Number(n)) => Value::Bool(n.as_f64().unwrap_or(0.0) != 0.0),
        (ColumnType::Boolean, Value::String(s)) => Value::Bool(matches!(s.as_str(), "1" | "true")),
        (ColumnType::Json, Value::String(s)) => {
            serde_json::from_str(&s).unwrap_or(Value::String(s))
        }
        (_, value) => value,
    }
}

/// Lookup table from table name to descriptor.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<&'static str, ResourceSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the five tables of the rental application.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(users());
        registry.register(properties());
        registry.register(images());
        registry.register(favorites());
        registry.register(messages());
        registry
    }

    pub fn register(&mut self, schema: ResourceSchema) {
        self.schemas.insert(schema.table, schema);
    }

    pub fn get(&self, table: &str) -> Option<&ResourceSchema> {
        self.schemas.get(table)
    }

    pub fn contains(&self, table: &str) -> bool {
        self.schemas.contains_key(table)
    }

    /// Descriptors in a stable (table name) order.
    pub fn schemas(&self) -> Vec<&ResourceSchema> {
        let mut all: Vec<&ResourceSchema> = self.schemas.values().collect();
        all.sort_by_key(|s| s.table);
        all
    }
}
