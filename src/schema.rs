//! Schema declarations and the SQL statements generated from them.
//!
//! Every statement builder here is a pure function of the schema's declared
//! fields. Nothing in this module touches the store.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::record::{FieldValue, Record};
use crate::value::{DataType, Value};

/// Positional parameter bindings for SQL statements
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Params {
    pub values: Vec<Value>,
}

impl Params {
    /// Create a new Params object
    pub fn new() -> Self {
        Self::default()
    }
    /// Bind the next placeholder
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self
    }
}

/// SQL statement with its bound parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub statement: String,
    pub params: Params,
}

impl SqlQuery {
    pub fn new(statement: &str) -> Self {
        Self {
            statement: statement.to_string(),
            params: Params::new(),
        }
    }
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

/// A SELECT statement plus the storage column names it returns, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub query: SqlQuery,
    pub columns: Vec<String>,
}

/// A scalar field declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    data_type: DataType,
}

impl Column {
    pub fn new(data_type: DataType) -> Self {
        Self { data_type }
    }

    /// Declare a column from a type name such as `"str"` or `"INTEGER"`.
    pub fn parse(type_name: &str) -> Result<Self> {
        Ok(Self::new(type_name.parse()?))
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn sql_type(&self) -> &'static str {
        self.data_type.sql_type()
    }
}

impl From<DataType> for Column {
    fn from(data_type: DataType) -> Self {
        Self::new(data_type)
    }
}

/// A many-to-one link to another schema, stored as `<field>_id INTEGER`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    target: Arc<Schema>,
}

impl ForeignKey {
    pub fn new(target: &Arc<Schema>) -> Self {
        Self {
            target: Arc::clone(target),
        }
    }

    pub fn target(&self) -> &Arc<Schema> {
        &self.target
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Column(Column),
    ForeignKey(ForeignKey),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    kind: FieldKind,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Storage column name: the field name, or `<field>_id` for relations.
    pub fn column_name(&self) -> String {
        match self.kind {
            FieldKind::Column(_) => self.name.clone(),
            FieldKind::ForeignKey(_) => format!("{}_id", self.name),
        }
    }

    /// Column definition fragment used in CREATE TABLE.
    pub fn definition(&self) -> String {
        match &self.kind {
            FieldKind::Column(column) => format!("{} {}", self.name, column.sql_type()),
            FieldKind::ForeignKey(_) => format!("{}_id INTEGER", self.name),
        }
    }
}

/// A named record type.
///
/// Fields are kept sorted by name, so every generated statement lists columns
/// in the same order: `id` first, then the declared fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    table_name: String,
    fields: Vec<Field>,
}

impl Schema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower-cased schema name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Storage columns in statement order, `id` first.
    pub fn columns(&self) -> Vec<String> {
        std::iter::once("id".to_string())
            .chain(self.fields.iter().map(Field::column_name))
            .collect()
    }

    pub fn create_sql(&self) -> String {
        let definitions = std::iter::once("id INTEGER PRIMARY KEY AUTOINCREMENT".to_string())
            .chain(self.fields.iter().map(Field::definition))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({});",
            self.table_name, definitions
        )
    }

    /// INSERT for a new record; `id` is left for the store to assign.
    pub fn insert(&self, record: &Record) -> Result<SqlQuery> {
        self.check_owner(record)?;
        let params = self.bind_fields(record)?;
        let columns = self
            .fields
            .iter()
            .map(Field::column_name)
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; self.fields.len()].join(", ");
        let statement = format!(
            "INSERT INTO {} ({}) VALUES ({});",
            self.table_name, columns, placeholders
        );
        Ok(SqlQuery::new(&statement).with_params(params))
    }

    pub fn select_all(&self) -> Select {
        let columns = self.columns();
        let statement = format!("SELECT {} FROM {};", columns.join(", "), self.table_name);
        Select {
            query: SqlQuery::new(&statement),
            columns,
        }
    }

    pub fn select_by_id(&self, id: i64) -> Select {
        let columns = self.columns();
        let statement = format!(
            "SELECT {} FROM {} WHERE id = ?;",
            columns.join(", "),
            self.table_name
        );
        Select {
            query: SqlQuery::new(&statement).with_params(Params::new().with_value(id)),
            columns,
        }
    }

    pub fn update(&self, record: &Record) -> Result<SqlQuery> {
        self.check_owner(record)?;
        let id = record
            .id()
            .ok_or_else(|| Error::MissingIdentity(self.name.clone()))?;
        let params = self.bind_fields(record)?.with_value(id);
        let assignments = self
            .fields
            .iter()
            .map(|field| format!("{} = ?", field.column_name()))
            .collect::<Vec<_>>()
            .join(", ");
        let statement = format!(
            "UPDATE {} SET {} WHERE id = ?;",
            self.table_name, assignments
        );
        Ok(SqlQuery::new(&statement).with_params(params))
    }

    pub fn delete(&self, id: i64) -> SqlQuery {
        let statement = format!("DELETE FROM {} WHERE id = ?;", self.table_name);
        SqlQuery::new(&statement).with_params(Params::new().with_value(id))
    }

    fn check_owner(&self, record: &Record) -> Result<()> {
        if record.schema().as_ref() != self {
            return Err(Error::InvalidSchema(format!(
                "{} record cannot be written through schema {}",
                record.schema().name(),
                self.name
            )));
        }
        Ok(())
    }

    /// Bound values for every declared field, in field order.
    fn bind_fields(&self, record: &Record) -> Result<Params> {
        let mut params = Params::new();
        for field in &self.fields {
            let value = record
                .field(&field.name)
                .ok_or_else(|| Error::MissingField {
                    schema: self.name.clone(),
                    field: field.name.clone(),
                })?;
            params = params.with_value(self.bind_value(field, value)?);
        }
        Ok(params)
    }

    fn bind_value(&self, field: &Field, value: &FieldValue) -> Result<Value> {
        match (&field.kind, value) {
            (FieldKind::Column(column), FieldValue::Value(value)) => {
                if value.fits(column.data_type()) {
                    Ok(value.clone().widen(column.data_type()))
                } else {
                    Err(self.mismatch(field, column.data_type().to_string(), value.kind()))
                }
            }
            (FieldKind::ForeignKey(fk), FieldValue::Record(related)) => {
                related
                    .id()
                    .map(Value::Integer)
                    .ok_or_else(|| Error::UnresolvedReference {
                        schema: self.name.clone(),
                        field: field.name.clone(),
                        target: fk.target().name().to_string(),
                    })
            }
            (FieldKind::ForeignKey(_), FieldValue::Key(key)) => Ok(Value::Integer(*key)),
            (FieldKind::ForeignKey(_), FieldValue::Value(Value::Null)) => Ok(Value::Null),
            (FieldKind::Column(column), _) => {
                Err(self.mismatch(field, column.data_type().to_string(), "record"))
            }
            (FieldKind::ForeignKey(fk), FieldValue::Value(value)) => {
                Err(self.mismatch(field, fk.target().name().to_string(), value.kind()))
            }
        }
    }

    fn mismatch(&self, field: &Field, expected: String, actual: &str) -> Error {
        Error::TypeMismatch {
            schema: self.name.clone(),
            field: field.name.clone(),
            expected,
            actual: actual.to_string(),
        }
    }
}

/// Collects field declarations; `build` validates them once and freezes the schema.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<Field>,
}

impl SchemaBuilder {
    pub fn column(mut self, name: impl Into<String>, column: impl Into<Column>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            kind: FieldKind::Column(column.into()),
        });
        self
    }

    pub fn foreign_key(mut self, name: impl Into<String>, target: &Arc<Schema>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            kind: FieldKind::ForeignKey(ForeignKey::new(target)),
        });
        self
    }

    pub fn build(self) -> Result<Arc<Schema>> {
        let SchemaBuilder { name, mut fields } = self;
        if !is_identifier(&name) {
            return Err(Error::InvalidSchema(format!(
                "schema name {name:?} is not a valid identifier"
            )));
        }
        if is_keyword(&name) {
            return Err(Error::InvalidSchema(format!(
                "table name {} is an SQLite keyword",
                name.to_lowercase()
            )));
        }
        if fields.is_empty() {
            return Err(Error::InvalidSchema(format!("{name} declares no fields")));
        }

        fields.sort_by(|a, b| a.name.cmp(&b.name));
        for pair in fields.windows(2) {
            if pair[0].name == pair[1].name {
                return Err(Error::DuplicateField {
                    schema: name,
                    field: pair[0].name.clone(),
                });
            }
        }

        let mut columns = vec!["id".to_string()];
        for field in &fields {
            if !is_identifier(&field.name) {
                return Err(Error::InvalidSchema(format!(
                    "{name}.{:?} is not a valid field name",
                    field.name
                )));
            }
            let column = field.column_name();
            if is_keyword(&column) {
                return Err(Error::InvalidSchema(format!(
                    "{name}.{} maps to column {column}, which is an SQLite keyword",
                    field.name
                )));
            }
            if columns.iter().any(|c| c.eq_ignore_ascii_case(&column)) {
                return Err(Error::InvalidSchema(format!(
                    "{name}.{} maps to column {column}, which is already taken",
                    field.name
                )));
            }
            columns.push(column);
        }

        Ok(Arc::new(Schema {
            table_name: name.to_lowercase(),
            name,
            fields,
        }))
    }
}

/// SQLite keywords, sorted. Identifiers are interpolated unquoted, so none of
/// these may name a table or column.
const SQLITE_KEYWORDS: &[&str] = &[
    "ABORT", "ACTION", "ADD", "AFTER", "ALL", "ALTER", "ALWAYS", "ANALYZE", "AND", "AS", "ASC",
    "ATTACH", "AUTOINCREMENT", "BEFORE", "BEGIN", "BETWEEN", "BY", "CASCADE", "CASE", "CAST",
    "CHECK", "COLLATE", "COLUMN", "COMMIT", "CONFLICT", "CONSTRAINT", "CREATE", "CROSS",
    "CURRENT", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "DATABASE", "DEFAULT",
    "DEFERRABLE", "DEFERRED", "DELETE", "DESC", "DETACH", "DISTINCT", "DO", "DROP", "EACH",
    "ELSE", "END", "ESCAPE", "EXCEPT", "EXCLUDE", "EXCLUSIVE", "EXISTS", "EXPLAIN", "FAIL",
    "FILTER", "FIRST", "FOLLOWING", "FOR", "FOREIGN", "FROM", "FULL", "GENERATED", "GLOB",
    "GROUP", "GROUPS", "HAVING", "IF", "IGNORE", "IMMEDIATE", "IN", "INDEX", "INDEXED",
    "INITIALLY", "INNER", "INSERT", "INSTEAD", "INTERSECT", "INTO", "IS", "ISNULL", "JOIN", "KEY",
    "LAST", "LEFT", "LIKE", "LIMIT", "MATCH", "MATERIALIZED", "NATURAL", "NO", "NOT", "NOTHING",
    "NOTNULL", "NULL", "NULLS", "OF", "OFFSET", "ON", "OR", "ORDER", "OTHERS", "OUTER", "OVER",
    "PARTITION", "PLAN", "PRAGMA", "PRECEDING", "PRIMARY", "QUERY", "RAISE", "RANGE", "RECURSIVE",
    "REFERENCES", "REGEXP", "REINDEX", "RELEASE", "RENAME", "REPLACE", "RESTRICT", "RETURNING",
    "RIGHT", "ROLLBACK", "ROW", "ROWS", "SAVEPOINT", "SELECT", "SET", "TABLE", "TEMP",
    "TEMPORARY", "THEN", "TIES", "TO", "TRANSACTION", "TRIGGER", "UNBOUNDED", "UNION", "UNIQUE",
    "UPDATE", "USING", "VACUUM", "VALUES", "VIEW", "VIRTUAL", "WHEN", "WHERE", "WINDOW", "WITH",
    "WITHOUT",
];

fn is_keyword(name: &str) -> bool {
    SQLITE_KEYWORDS
        .binary_search(&name.to_ascii_uppercase().as_str())
        .is_ok()
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
