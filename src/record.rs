//! Runtime instances of a [`Schema`].

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::{collections::BTreeMap, sync::Arc};

use crate::error::{Error, Result};
use crate::schema::{FieldKind, Schema};
use crate::value::Value;

/// Value held by one field of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Scalar column value. A relation read back as NULL also lands here.
    Value(Value),
    /// Hydrated or caller-supplied related record.
    Record(Box<Record>),
    /// Raw foreign key, not resolved into a record.
    Key(i64),
}

/// A row of some schema, persisted or not.
///
/// `id` is `None` until the store assigns one on first save; after that it
/// never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<Schema>,
    id: Option<i64>,
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(schema: &Arc<Schema>) -> Self {
        Self {
            schema: Arc::clone(schema),
            id: None,
            fields: BTreeMap::new(),
        }
    }

    /// A record standing in for a row that already exists under `id`.
    pub fn persisted(schema: &Arc<Schema>, id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::new(schema)
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: i64) {
        debug_assert!(self.id.is_none(), "record identity is immutable");
        self.id = Some(id);
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Point a relation field at `related`. See [`Record::set_related`].
    pub fn with_related(mut self, name: &str, related: Record) -> Result<Self> {
        self.set_related(name, related)?;
        Ok(self)
    }

    pub fn with_key(mut self, name: &str, key: i64) -> Result<Self> {
        self.set_key(name, key)?;
        Ok(self)
    }

    /// Set a scalar field. A relation field only accepts `Value::Null` here.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match self.declared(name)? {
            FieldKind::Column(column) if !value.fits(column.data_type()) => {
                Err(self.mismatch(name, column.data_type().to_string(), value.kind()))
            }
            FieldKind::ForeignKey(fk) if !value.is_null() => {
                Err(self.mismatch(name, fk.target().name().to_string(), value.kind()))
            }
            FieldKind::Column(column) => {
                let value = value.widen(column.data_type());
                self.fields.insert(name.to_string(), FieldValue::Value(value));
                Ok(())
            }
            FieldKind::ForeignKey(_) => {
                self.fields.insert(name.to_string(), FieldValue::Value(value));
                Ok(())
            }
        }
    }

    /// Point a relation field at `related`, which must be a record of the target schema.
    ///
    /// The record is stored by value. Save it before handing it over: a copy
    /// taken while it was unsaved keeps `id == None` even after the original
    /// is saved, and inserting this record then fails with
    /// [`Error::UnresolvedReference`]. Use [`Record::set_key`] to link by id alone.
    pub fn set_related(&mut self, name: &str, related: Record) -> Result<()> {
        match self.declared(name)? {
            FieldKind::ForeignKey(fk) if related.schema.as_ref() == fk.target().as_ref() => {
                self.fields
                    .insert(name.to_string(), FieldValue::Record(Box::new(related)));
                Ok(())
            }
            FieldKind::ForeignKey(fk) => Err(self.mismatch(
                name,
                fk.target().name().to_string(),
                related.schema.name(),
            )),
            FieldKind::Column(column) => {
                Err(self.mismatch(name, column.data_type().to_string(), "record"))
            }
        }
    }

    /// Point a relation field at a raw key without loading the target row.
    pub fn set_key(&mut self, name: &str, key: i64) -> Result<()> {
        match self.declared(name)? {
            FieldKind::ForeignKey(_) => {
                self.fields.insert(name.to_string(), FieldValue::Key(key));
                Ok(())
            }
            FieldKind::Column(column) => {
                Err(self.mismatch(name, column.data_type().to_string(), "key"))
            }
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Scalar value of a field, `None` if unset or holding a relation.
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.fields.get(name)? {
            FieldValue::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Typed copy of a scalar field.
    pub fn get_as<T>(&self, name: &str) -> Result<T>
    where
        T: TryFrom<Value, Error = Value>,
    {
        let value = self.value(name).cloned().ok_or_else(|| Error::MissingField {
            schema: self.schema.name().to_string(),
            field: name.to_string(),
        })?;
        T::try_from(value).map_err(|value| {
            self.mismatch(name, std::any::type_name::<T>().to_string(), value.kind())
        })
    }

    pub fn related(&self, name: &str) -> Option<&Record> {
        match self.fields.get(name)? {
            FieldValue::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Foreign key stored in a relation field, whether hydrated or raw.
    pub fn key(&self, name: &str) -> Option<i64> {
        match self.fields.get(name)? {
            FieldValue::Record(record) => record.id,
            FieldValue::Key(key) => Some(*key),
            FieldValue::Value(_) => None,
        }
    }

    /// Store a value read back from the database, skipping setter checks.
    pub(crate) fn load(&mut self, name: &str, value: FieldValue) {
        self.fields.insert(name.to_string(), value);
    }

    fn declared(&self, name: &str) -> Result<FieldKind> {
        self.schema
            .field(name)
            .map(|field| field.kind().clone())
            .ok_or_else(|| Error::UnknownField {
                schema: self.schema.name().to_string(),
                field: name.to_string(),
            })
    }

    fn mismatch(&self, name: &str, expected: String, actual: &str) -> Error {
        Error::TypeMismatch {
            schema: self.schema.name().to_string(),
            field: name.to_string(),
            expected,
            actual: actual.to_string(),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry("id", &self.id)?;
        for (name, value) in &self.fields {
            match value {
                FieldValue::Value(value) => map.serialize_entry(name, value)?,
                FieldValue::Record(record) => map.serialize_entry(name, record.as_ref())?,
                FieldValue::Key(key) => map.serialize_entry(name, key)?,
            }
        }
        map.end()
    }
}

/// A plain struct with one field per declared column and an explicit identity.
pub trait Model: Sized {
    fn schema() -> Arc<Schema>;

    fn id(&self) -> Option<i64>;

    fn to_record(&self) -> Result<Record>;

    fn from_record(record: &Record) -> Result<Self>;
}
