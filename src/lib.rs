//! Minimal object-relational mapping over SQLite for the Runar ecosystem.
//!
//! # Intention
//!
//! - Declare record types as [`Schema`]s and map [`Record`]s of them onto
//!   SQLite tables.
//! - Generate every statement from the schema; bind every data value as a
//!   parameter.
//! - Resolve foreign keys back into records when reading.
//!
//! # Architectural Boundaries
//!
//! - Only the mapping core belongs here: schemas, records, statement
//!   generation, and the [`Database`] that executes them.
//! - No filtering beyond primary-key lookup, no migrations, no multi-statement
//!   transactions, no pooling.
//!
//! ```no_run
//! use rust_orm::{DataType, Database, Record, Schema};
//!
//! # fn main() -> rust_orm::Result<()> {
//! let author = Schema::builder("Author")
//!     .column("name", DataType::Text)
//!     .column("age", DataType::Integer)
//!     .build()?;
//!
//! let mut db = Database::open_in_memory()?;
//! db.create(&author)?;
//!
//! let mut alex = Record::new(&author).with("name", "Alex")?.with("age", 69)?;
//! db.save(&mut alex)?;
//! assert_eq!(alex.id(), Some(1));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod record;
pub mod schema;
pub mod sqlite;
pub mod value;

pub use error::{Error, Result};
pub use record::{FieldValue, Model, Record};
pub use schema::{Column, Field, FieldKind, ForeignKey, Params, Schema, SchemaBuilder, Select, SqlQuery};
pub use sqlite::{Database, SqliteConfig, DEFAULT_MAX_RELATION_DEPTH};
pub use value::{DataType, Value};
