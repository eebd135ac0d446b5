#![allow(dead_code)]

use rust_orm::{DataType, Database, Schema, SqliteConfig};
use std::sync::Arc;
use tempfile::NamedTempFile;

pub fn author() -> Arc<Schema> {
    Schema::builder("Author")
        .column("name", DataType::Text)
        .column("age", DataType::Integer)
        .build()
        .unwrap()
}

pub fn book(author: &Arc<Schema>) -> Arc<Schema> {
    Schema::builder("Book")
        .column("title", DataType::Text)
        .column("published", DataType::Integer)
        .foreign_key("author", author)
        .build()
        .unwrap()
}

// Helper function to create an in-memory database with the given tables
pub fn create_test_db(schemas: &[&Arc<Schema>]) -> rust_orm::Result<Database> {
    let mut db = Database::open_in_memory()?;
    for schema in schemas {
        db.create(schema)?;
    }
    Ok(db)
}

// Helper function to create a temporary file-based database
pub fn create_temp_db() -> rust_orm::Result<(Database, NamedTempFile)> {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap();
    let db = Database::open(SqliteConfig::new(path))?;
    Ok((db, temp_file))
}
