mod common;

use anyhow::Result;
use common::create_test_db;
use rust_orm::{DataType, Model, Record, Schema};
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, PartialEq)]
struct UserProfile {
    id: Option<i64>,
    username: String,
    email: String,
    verified: bool,
}

impl Model for UserProfile {
    fn schema() -> Arc<Schema> {
        static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
        SCHEMA
            .get_or_init(|| {
                Schema::builder("UserProfile")
                    .column("username", DataType::Text)
                    .column("email", DataType::Text)
                    .column("verified", DataType::Boolean)
                    .build()
                    .expect("valid schema")
            })
            .clone()
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn to_record(&self) -> rust_orm::Result<Record> {
        let schema = Self::schema();
        let record = match self.id {
            Some(id) => Record::persisted(&schema, id),
            None => Record::new(&schema),
        };
        record
            .with("username", self.username.as_str())?
            .with("email", self.email.as_str())?
            .with("verified", self.verified)
    }

    fn from_record(record: &Record) -> rust_orm::Result<Self> {
        Ok(Self {
            id: record.id(),
            username: record.get_as("username")?,
            email: record.get_as("email")?,
            verified: record.get_as("verified")?,
        })
    }
}

#[test]
fn test_table_name_is_lower_cased() -> Result<()> {
    let db = create_test_db(&[&UserProfile::schema()])?;
    assert_eq!(db.list_tables()?, vec!["userprofile"]);
    Ok(())
}

#[test]
fn test_model_round_trip() -> Result<()> {
    let schema = UserProfile::schema();
    let db = create_test_db(&[&schema])?;

    let mut user = UserProfile {
        id: None,
        username: "testuser".into(),
        email: "test@example.com".into(),
        verified: false,
    };
    let mut record = user.to_record()?;
    db.save(&mut record)?;
    user.id = record.id();
    assert_eq!(user.id(), Some(1));

    let fetched = UserProfile::from_record(&db.get(&schema, 1)?)?;
    assert_eq!(fetched, user);

    user.email = "newemail@example.com".into();
    user.verified = true;
    db.update(&user.to_record()?)?;

    let fetched = UserProfile::from_record(&db.get(&schema, 1)?)?;
    assert_eq!(fetched.email, "newemail@example.com");
    assert!(fetched.verified);
    Ok(())
}
