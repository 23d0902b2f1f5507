#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use modelbase_core::{
    Column, ColumnType, Constraint, Database, DatabaseConfig, Model, ModelId, ModelResult,
    Record, Schema,
};
use once_cell::sync::Lazy;
use tempfile::TempDir;

static DUMMY_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::builder("Dummy")
        .column(Column::new("name", ColumnType::Text).not_null())
        .column(Column::new("birthdate", ColumnType::Date))
        .build()
        .expect("valid Dummy schema")
});

static REPR_DUMMY_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::builder("ReprDummy")
        .column(Column::new("firstname", ColumnType::Text))
        .column(Column::new("lastname", ColumnType::Text))
        .column(Column::new("age", ColumnType::Integer))
        .column(Column::new("_secret", ColumnType::Text))
        .build()
        .expect("valid ReprDummy schema")
});

static EVENT_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::builder("Event")
        .column(Column::new("title", ColumnType::Text).not_null())
        .column(Column::new("starts_at", ColumnType::DateTime).not_null())
        .column(Column::new("day", ColumnType::Date))
        .column(Column::new("all_day", ColumnType::Boolean).not_null())
        .build()
        .expect("valid Event schema")
});

static GADGET_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::builder("Gadget")
        .column(Column::new("label", ColumnType::Text).not_null().max_len(16))
        .column(Column::new("weight", ColumnType::Real))
        .column(Column::new("active", ColumnType::Boolean))
        .constraint(Constraint::unique("uq_gadgets_label", &["label"]))
        .build()
        .expect("valid Gadget schema")
});

#[derive(Debug, Clone, PartialEq)]
pub struct Dummy {
    pub id: Option<ModelId>,
    pub name: String,
    pub birthdate: Option<NaiveDate>,
}

impl Dummy {
    pub fn new(name: &str, birthdate: Option<NaiveDate>) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            birthdate,
        }
    }
}

impl Model for Dummy {
    fn schema() -> &'static Schema {
        &DUMMY_SCHEMA
    }

    fn id(&self) -> Option<ModelId> {
        self.id
    }

    fn set_id(&mut self, id: ModelId) {
        self.id = Some(id);
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("name", self.name.as_str())
            .with("birthdate", self.birthdate)
    }

    fn from_record(mut record: Record) -> ModelResult<Self> {
        Ok(Self {
            id: record.take_id()?,
            name: record.take_text("name")?,
            birthdate: record.take_opt_date("birthdate")?,
        })
    }
}

/// Only attributes that were set are part of the record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReprDummy {
    pub id: Option<ModelId>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub age: Option<i64>,
    pub secret: Option<String>,
}

impl Model for ReprDummy {
    fn schema() -> &'static Schema {
        &REPR_DUMMY_SCHEMA
    }

    fn id(&self) -> Option<ModelId> {
        self.id
    }

    fn set_id(&mut self, id: ModelId) {
        self.id = Some(id);
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new().with("id", self.id);
        if let Some(firstname) = &self.firstname {
            record.insert("firstname", firstname.as_str());
        }
        if let Some(lastname) = &self.lastname {
            record.insert("lastname", lastname.as_str());
        }
        if let Some(age) = self.age {
            record.insert("age", age);
        }
        if let Some(secret) = &self.secret {
            record.insert("_secret", secret.as_str());
        }
        record
    }

    fn from_record(mut record: Record) -> ModelResult<Self> {
        Ok(Self {
            id: record.take_id()?,
            firstname: record.take_opt_text("firstname")?,
            lastname: record.take_opt_text("lastname")?,
            age: record.take_opt_i64("age")?,
            secret: record.take_opt_text("_secret")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: Option<ModelId>,
    pub title: String,
    pub starts_at: NaiveDateTime,
    pub day: Option<NaiveDate>,
    pub all_day: bool,
}

impl Model for Event {
    fn schema() -> &'static Schema {
        &EVENT_SCHEMA
    }

    fn id(&self) -> Option<ModelId> {
        self.id
    }

    fn set_id(&mut self, id: ModelId) {
        self.id = Some(id);
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("title", self.title.as_str())
            .with("starts_at", self.starts_at)
            .with("day", self.day)
            .with("all_day", self.all_day)
    }

    fn from_record(mut record: Record) -> ModelResult<Self> {
        Ok(Self {
            id: record.take_id()?,
            title: record.take_text("title")?,
            starts_at: record.take_datetime("starts_at")?,
            day: record.take_opt_date("day")?,
            all_day: record.take_bool("all_day")?,
        })
    }
}

/// Loosely typed entity: carries whatever attributes it is given, so tests
/// can hand the model layer records that do not fit the schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gadget {
    pub id: Option<ModelId>,
    pub attributes: Record,
}

impl Gadget {
    pub fn new(attributes: Record) -> Self {
        Self {
            id: None,
            attributes,
        }
    }
}

impl Model for Gadget {
    fn schema() -> &'static Schema {
        &GADGET_SCHEMA
    }

    fn id(&self) -> Option<ModelId> {
        self.id
    }

    fn set_id(&mut self, id: ModelId) {
        self.id = Some(id);
    }

    fn to_record(&self) -> Record {
        let mut record = self.attributes.clone();
        record.insert("id", self.id);
        record
    }

    fn from_record(mut record: Record) -> ModelResult<Self> {
        let id = record.take_id()?;
        Ok(Self {
            id,
            attributes: record,
        })
    }
}

/// File-backed database in a temp directory, removed on drop.
pub struct TestDb {
    pub db: Database,
    _dir: TempDir,
}

impl TestDb {
    /// Empty database without any table.
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DatabaseConfig::new(dir.path().join("app.db")));
        Self { db, _dir: dir }
    }

    /// Database with every fixture table created.
    pub fn new() -> Self {
        let test_db = Self::empty();
        Dummy::create_table(&test_db.db).unwrap();
        ReprDummy::create_table(&test_db.db).unwrap();
        Event::create_table(&test_db.db).unwrap();
        Gadget::create_table(&test_db.db).unwrap();
        test_db
    }

    pub fn opened_sessions(&self) -> u64 {
        self.db.session_stats().opened
    }

    pub fn active_sessions(&self) -> u64 {
        self.db.session_stats().active()
    }

    /// Row count read through a raw session.
    pub fn count_rows(&self, table: &str) -> i64 {
        self.db
            .with_session(|session| {
                session
                    .connection()
                    .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
                        row.get(0)
                    })
                    .map_err(modelbase_core::DbError::from)
            })
            .unwrap()
    }
}

pub fn jon_birthdate() -> NaiveDate {
    NaiveDate::from_ymd_opt(1986, 4, 4).unwrap()
}
