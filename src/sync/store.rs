//! Offline Sync Local Storage
//!
//! SQLite-backed cache for the remote resources. All statements go through
//! [`LocalStore::execute`], which runs each one in its own transaction behind a
//! single async mutex, so concurrent callers are serialized the way the embedded
//! engine requires.

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::{Number, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::error::SyncResult;
use crate::schema::{ResourceSchema, Row, SchemaRegistry};

/// Rows returned by a statement plus the number of rows it changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub rows: Vec<Row>,
    pub rows_affected: usize,
}

/// Local storage backend using SQLite
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl LocalStore {
    /// Open or create a local store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> SyncResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.as_ref().to_path_buf()),
        })
    }

    /// Open a throwaway store that lives only as long as this handle
    pub fn open_in_memory() -> SyncResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Open a local store in the default location (user data directory)
    pub fn open_default(app_name: &str) -> SyncResult<Self> {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| {
                std::env::current_dir().unwrap_or_else(|_| Path::new(".").to_path_buf())
            })
            .join(app_name);

        std::fs::create_dir_all(&data_dir)?;
        Self::open(data_dir.join("rental.db"))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Execute one parameterized statement inside its own transaction.
    ///
    /// Statements that produce columns return their rows as JSON maps; all
    /// others report how many rows they changed.
    pub async fn execute(&self, sql: &str, params: &[Value]) -> SyncResult<RowSet> {
        let mut conn = self.conn.lock().await;
        run_statement(&mut conn, sql, params).map_err(|e| {
            error!("SQL error: {} ({})", e, sql.trim());
            e
        })
    }

    /// Create the tables described by the registry if they do not exist yet
    pub async fn ensure_schema(&self, registry: &SchemaRegistry) -> SyncResult<()> {
        for schema in registry.schemas() {
            self.execute(&create_table_sql(schema), &[]).await?;
            debug!("Ensured local table {}", schema.table);
        }
        Ok(())
    }
}

fn run_statement(conn: &mut Connection, sql: &str, params: &[Value]) -> SyncResult<RowSet> {
    let tx = conn.transaction()?;
    let result = {
        let mut stmt = tx.prepare(sql)?;
        let bound = params.iter().map(to_sql_value);

        if stmt.column_count() == 0 {
            let rows_affected = stmt.execute(params_from_iter(bound))?;
            RowSet {
                rows: Vec::new(),
                rows_affected,
            }
        } else {
            let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();
            let mut rows = Vec::new();
            let mut cursor = stmt.query(params_from_iter(bound))?;
            while let Some(row) = cursor.next()? {
                let mut out = Row::new();
                for (i, name) in names.iter().enumerate() {
                    out.insert(name.clone(), from_sql_value(row.get_ref(i)?));
                }
                rows.push(out);
            }
            RowSet {
                rows,
                rows_affected: 0,
            }
        }
    };
    tx.commit()?;
    Ok(result)
}

/// DDL for one descriptor: typed columns, the id as primary key and a TEXT
/// column for each sidecar relation.
pub fn create_table_sql(schema: &ResourceSchema) -> String {
    let mut columns: Vec<String> = schema
        .columns
        .iter()
        .map(|c| {
            if c.name == schema.id_column {
                format!("{} {} PRIMARY KEY", c.name, c.kind.sql_type())
            } else {
                format!("{} {}", c.name, c.kind.sql_type())
            }
        })
        .collect();
    columns.extend(schema.sidecar_columns().map(|key| format!("{} TEXT", key)));

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        schema.table,
        columns.join(", ")
    )
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        // Arrays and objects are kept as JSON text
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::from(bytes.to_vec()),
    }
}
