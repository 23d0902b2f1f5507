//! Active-record base for entity types.
//!
//! # Responsibility
//! - Give each entity type save/fetch/select/delete behavior and
//!   dict/JSON conversions without per-entity boilerplate.
//! - Keep entity-specific code down to a schema declaration and the
//!   conversion to and from a [`Record`].
//!
//! # Invariants
//! - One entity type maps to exactly one table, described by its
//!   [`Schema`]; attribute names map 1:1 to column names.
//! - `id() == None` means the instance has never been persisted.
//! - Every active-record call uses its own session (see [`crate::db`]).
//!
//! # See also
//! - [`crate::schema`] for registration and table naming.

mod active_record;
mod error;
mod record;
mod serialize;
mod value;

pub use error::{ErrorKind, ModelError, ModelResult};
pub use record::{Filter, Record};
pub use value::Value;

use crate::db::{Database, DbResult};
use crate::schema::{self, Schema};

/// Primary key type shared by every entity.
pub type ModelId = i64;

/// An entity persisted through the active-record operations.
///
/// Implementors supply the schema and the record conversions; everything
/// else is provided.
pub trait Model: Sized {
    /// Registered schema, usually a `static Lazy<Schema>`.
    fn schema() -> &'static Schema;

    fn id(&self) -> Option<ModelId>;

    fn set_id(&mut self, id: ModelId);

    /// Attributes that are currently set, keyed by column name. `id` may be
    /// included or left out.
    fn to_record(&self) -> Record;

    /// Builds an instance from a record whose values already match the
    /// schema column types.
    fn from_record(record: Record) -> ModelResult<Self>;

    fn create_table(db: &Database) -> DbResult<()> {
        schema::create_table(db, Self::schema())
    }

    fn drop_table(db: &Database) -> DbResult<()> {
        schema::drop_table(db, Self::schema())
    }

    /// Inserts the instance, or merges it onto the row with the same id.
    ///
    /// Only the attributes in [`Model::to_record`] are written; stored
    /// columns the record leaves out keep their value. Returns the stored
    /// row as read back before commit.
    ///
    /// # Errors
    /// - `SavingModelFailed` when the record does not fit the schema.
    /// - `UnableToSaveModelInDB` when the write or commit fails; the
    ///   transaction is rolled back first.
    fn save(self, db: &Database) -> ModelResult<Self> {
        active_record::save(db, self)
    }

    /// Loads the row with `id`.
    ///
    /// # Errors
    /// - `InvalidModelId` for a null or non-integer id; no session is opened.
    /// - `UnknownModelId` when no row matches.
    /// - `UnableToFetchModelFromDB` / `FetchingModelFailed` for storage and
    ///   decoding failures respectively.
    fn fetch<I: Into<Value>>(db: &Database, id: I) -> ModelResult<Self> {
        active_record::fetch(db, id.into())
    }

    /// Fetches a fresh copy using the instance's own id.
    fn reload(&self, db: &Database) -> ModelResult<Self> {
        active_record::fetch(db, Value::from(self.id()))
    }

    /// Rows matching every condition in `filter`, ordered by id, capped at
    /// `limit` when given. An empty filter matches every row.
    fn select(db: &Database, filter: &Filter, limit: Option<u32>) -> ModelResult<Vec<Self>> {
        active_record::select(db, filter, limit)
    }

    /// Deletes the row with the instance's id and confirms it is gone.
    fn delete(&self, db: &Database) -> ModelResult<()> {
        active_record::delete(db, self)
    }

    /// Public attributes; private (`_`-prefixed) ones and an unsaved id are
    /// left out.
    fn to_dict(&self) -> Record {
        serialize::to_dict(self)
    }

    /// `to_dict` as a JSON object with ISO-8601 dates.
    fn to_json(&self) -> String {
        serialize::to_json(self)
    }

    /// Builds an instance, coercing each value to its column type.
    fn from_dict(record: Record) -> ModelResult<Self> {
        serialize::from_dict(record)
    }

    fn from_json(text: &str) -> ModelResult<Self> {
        serialize::from_json(text)
    }

    /// `TypeName(a=..., b=...)` with attributes sorted by name.
    fn repr(&self) -> String {
        serialize::repr(self)
    }
}
