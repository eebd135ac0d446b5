use rusqlite::{params_from_iter, types::Value as SqlValue, Connection};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};

use crate::error::{Error, Result};
use crate::record::{FieldValue, Record};
use crate::schema::{FieldKind, Schema, Select, SqlQuery};
use crate::value::Value;

/// Relation hops resolved per record unless configured otherwise.
pub const DEFAULT_MAX_RELATION_DEPTH: usize = 16;

const IN_MEMORY: &str = ":memory:";

fn default_max_relation_depth() -> usize {
    DEFAULT_MAX_RELATION_DEPTH
}

/// SQLite store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Path to the SQLite database file, or `:memory:`
    pub db_path: String,
    /// How many relations deep `get`/`all` will hydrate before giving up
    #[serde(default = "default_max_relation_depth")]
    pub max_relation_depth: usize,
}

impl SqliteConfig {
    /// Create a new SQLite config for the given path
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            max_relation_depth: DEFAULT_MAX_RELATION_DEPTH,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(IN_MEMORY)
    }

    pub fn with_max_relation_depth(mut self, depth: usize) -> Self {
        self.max_relation_depth = depth;
        self
    }
}

/// Mapping engine: owns one connection and turns record operations into statements.
///
/// Every write runs in SQLite's autocommit mode, so each call commits on its
/// own. Nothing here spans more than one statement per record.
#[derive(Debug)]
pub struct Database {
    config: SqliteConfig,
    connection: Connection,
    /// Table name -> schema name, for tables created through this engine.
    tables: HashMap<String, String>,
}

impl Database {
    /// Open (or create) the store described by `config`
    pub fn open(config: SqliteConfig) -> Result<Self> {
        tracing::debug!(path = %config.db_path, "opening sqlite store");
        let connection = if config.db_path == IN_MEMORY {
            Connection::open_in_memory()?
        } else {
            Connection::open(&config.db_path)?
        };
        Ok(Self {
            config,
            connection,
            tables: HashMap::new(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(SqliteConfig::in_memory())
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Close the connection, surfacing any error SQLite reports while doing so.
    pub fn close(self) -> Result<()> {
        tracing::debug!(path = %self.config.db_path, "closing sqlite store");
        self.connection.close().map_err(|(_, err)| Error::Sqlite(err))
    }

    /// Create the schema's table if it does not exist yet.
    #[tracing::instrument(level = "debug", skip(self, schema), fields(table = %schema.table_name()))]
    pub fn create(&mut self, schema: &Schema) -> Result<()> {
        if let Some(owner) = self.tables.get(schema.table_name()) {
            if owner != schema.name() {
                return Err(Error::InvalidSchema(format!(
                    "{} and {} both map to table {}",
                    owner,
                    schema.name(),
                    schema.table_name()
                )));
            }
        }
        self.execute(&SqlQuery::new(&schema.create_sql()))?;
        self.tables
            .insert(schema.table_name().to_string(), schema.name().to_string());
        Ok(())
    }

    /// Insert an unsaved record and write the assigned id back onto it.
    ///
    /// Records that already have an id are left alone; use [`Database::update`].
    #[tracing::instrument(level = "debug", skip(self, record), fields(table = %record.schema().table_name()))]
    pub fn save(&self, record: &mut Record) -> Result<()> {
        if let Some(id) = record.id() {
            tracing::trace!(id, "record already persisted");
            return Ok(());
        }
        let query = record.schema().insert(record)?;
        self.execute(&query)?;
        let id = self.connection.last_insert_rowid();
        record.assign_id(id);
        tracing::debug!(id, "assigned identity");
        Ok(())
    }

    /// Write the record's current field values to its row.
    #[tracing::instrument(level = "debug", skip(self, record), fields(table = %record.schema().table_name(), id = ?record.id()))]
    pub fn update(&self, record: &Record) -> Result<()> {
        let query = record.schema().update(record)?;
        let changed = self.execute(&query)?;
        tracing::debug!(changed, "updated rows");
        Ok(())
    }

    /// Load one record by id, hydrating its relations.
    #[tracing::instrument(level = "debug", skip(self, schema), fields(table = %schema.table_name()))]
    pub fn get(&self, schema: &Arc<Schema>, id: i64) -> Result<Record> {
        self.fetch(schema, id, 0)
    }

    /// Load every row of the schema. Order is whatever the store returns.
    #[tracing::instrument(level = "debug", skip(self, schema), fields(table = %schema.table_name()))]
    pub fn all(&self, schema: &Arc<Schema>) -> Result<Vec<Record>> {
        let rows = self.query(&schema.select_all())?;
        tracing::debug!(rows = rows.len(), "loaded rows");
        rows.into_iter()
            .map(|(id, values)| self.hydrate(schema, id, values, 0))
            .collect()
    }

    /// Delete by id, returning the number of rows removed.
    #[tracing::instrument(level = "debug", skip(self, schema), fields(table = %schema.table_name()))]
    pub fn delete(&self, schema: &Schema, id: i64) -> Result<usize> {
        let deleted = self.execute(&schema.delete(id))?;
        tracing::debug!(deleted, "deleted rows");
        Ok(deleted)
    }

    /// Delete the row behind a persisted record.
    pub fn delete_record(&self, record: &Record) -> Result<usize> {
        let id = record
            .id()
            .ok_or_else(|| Error::MissingIdentity(record.schema().name().to_string()))?;
        self.delete(record.schema(), id)
    }

    /// Names of the user tables in the store, sorted.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.connection.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name;",
        )?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut tables = Vec::new();
        for name in names {
            tables.push(name?);
        }
        Ok(tables)
    }

    fn execute(&self, query: &SqlQuery) -> Result<usize> {
        tracing::trace!(sql = %query.statement, params = query.params.values.len(), "executing statement");
        let changed = self.connection.execute(
            &query.statement,
            params_from_iter(query.params.values.iter()),
        )?;
        Ok(changed)
    }

    /// Run a SELECT, returning each row's id and its remaining raw columns.
    fn query(&self, select: &Select) -> Result<Vec<(i64, Vec<SqlValue>)>> {
        tracing::trace!(sql = %select.query.statement, "running query");
        let width = select.columns.len();
        let mut stmt = self.connection.prepare(&select.query.statement)?;
        let rows = stmt.query_map(params_from_iter(select.query.params.values.iter()), |row| {
            let id = row.get::<_, i64>(0)?;
            let values = (1..width)
                .map(|index| row.get::<_, SqlValue>(index))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok((id, values))
        })?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    fn fetch(&self, schema: &Arc<Schema>, id: i64, depth: usize) -> Result<Record> {
        if depth > self.config.max_relation_depth {
            return Err(Error::RelationDepthExceeded {
                schema: schema.name().to_string(),
                max_depth: self.config.max_relation_depth,
            });
        }
        let (id, values) = self
            .query(&schema.select_by_id(id))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound {
                schema: schema.name().to_string(),
                id,
            })?;
        self.hydrate(schema, id, values, depth)
    }

    /// Build a record from raw columns, resolving each relation with another fetch.
    fn hydrate(
        &self,
        schema: &Arc<Schema>,
        id: i64,
        values: Vec<SqlValue>,
        depth: usize,
    ) -> Result<Record> {
        let mut record = Record::persisted(schema, id);
        for (field, raw) in schema.fields().iter().zip(values) {
            let value = match (field.kind(), raw) {
                (FieldKind::Column(column), raw) => {
                    FieldValue::Value(Value::from_sql(raw, column.data_type()))
                }
                (FieldKind::ForeignKey(fk), SqlValue::Integer(key)) => {
                    FieldValue::Record(Box::new(self.fetch(fk.target(), key, depth + 1)?))
                }
                (FieldKind::ForeignKey(_), SqlValue::Null) => FieldValue::Value(Value::Null),
                (FieldKind::ForeignKey(fk), raw) => {
                    return Err(Error::TypeMismatch {
                        schema: schema.name().to_string(),
                        field: field.name().to_string(),
                        expected: format!("{} id", fk.target().name()),
                        actual: raw.data_type().to_string(),
                    });
                }
            };
            record.load(field.name(), value);
        }
        Ok(record)
    }
}
