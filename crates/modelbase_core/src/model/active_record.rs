//! Save, fetch, select and delete on top of per-call sessions.
//!
//! # Responsibility
//! - Translate entity records into parameterized SQL for one table.
//! - Map storage failures onto the active-record error taxonomy.
//!
//! # Invariants
//! - Each operation opens exactly one session and releases it before
//!   returning.
//! - Write paths run inside one transaction and roll back before reporting
//!   any failure.
//! - Argument validation (ids, filter attributes, record values) happens
//!   before a session is opened.

use super::error::{ModelError, ModelResult};
use super::record::{Filter, Record};
use super::value::Value;
use super::{Model, ModelId};
use crate::db::{Database, DbError, DbResult, Session};
use crate::schema::ddl::quote_identifier;
use crate::schema::{Schema, PRIMARY_KEY};
use log::{debug, error, warn};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use std::time::Instant;

enum ReadError {
    Db(DbError),
    Decode(String),
}

impl From<rusqlite::Error> for ReadError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<DbError> for ReadError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

enum DeleteOutcome {
    Deleted,
    Missing,
    Lingering(i64),
}

pub(crate) fn save<M: Model>(db: &Database, model: M) -> ModelResult<M> {
    let schema = M::schema();
    let entity = schema.entity_name();
    let id = model.id();
    let started_at = Instant::now();

    let values = match write_values(schema, model.to_record()) {
        Ok(values) => values,
        Err(message) => {
            error!(
                "event=model_save module=model status=error entity={} id={} error_code=invalid_record error={}",
                entity,
                display_id(id),
                message
            );
            return Err(ModelError::SavingModelFailed(message));
        }
    };

    debug!(
        "event=model_save module=model status=start entity={} id={}",
        entity,
        display_id(id)
    );

    let mut session = db.open_session().map_err(|err| {
        error!(
            "event=model_save module=model status=error entity={} id={} error_code=session_failed error={}",
            entity,
            display_id(id),
            err
        );
        ModelError::UnableToSaveModelInDB(err)
    })?;

    let stored = match write_row(&mut session, schema, id, &values) {
        Ok(stored) => stored,
        Err(err) => {
            rollback_quietly(&mut session, entity);
            let (error_code, err) = match err {
                ReadError::Db(err) => ("db_write_failed", ModelError::UnableToSaveModelInDB(err)),
                ReadError::Decode(message) => {
                    ("decode_failed", ModelError::SavingModelFailed(message))
                }
            };
            error!(
                "event=model_save module=model status=error entity={} id={} duration_ms={} error_code={} error={}",
                entity,
                display_id(id),
                started_at.elapsed().as_millis(),
                error_code,
                err
            );
            return Err(err);
        }
    };

    let saved = M::from_record(stored).map_err(|err| {
        error!(
            "event=model_save module=model status=error entity={} id={} error_code=decode_failed error={}",
            entity,
            display_id(id),
            err
        );
        ModelError::SavingModelFailed(err.to_string())
    })?;
    debug!(
        "event=model_save module=model status=ok entity={} id={} duration_ms={}",
        entity,
        display_id(saved.id()),
        started_at.elapsed().as_millis()
    );
    Ok(saved)
}

pub(crate) fn fetch<M: Model>(db: &Database, id: Value) -> ModelResult<M> {
    let schema = M::schema();
    let entity = schema.entity_name();
    let id = match id {
        Value::Integer(id) => id,
        other => {
            error!(
                "event=model_fetch module=model status=error entity={} error_code=invalid_id id_type={}",
                entity,
                other.type_name()
            );
            return Err(ModelError::InvalidModelId(format!(
                "{entity} id must be an integer, got {}",
                other.repr()
            )));
        }
    };
    let started_at = Instant::now();
    debug!(
        "event=model_fetch module=model status=start entity={} id={}",
        entity, id
    );

    let session = db
        .open_session()
        .map_err(ModelError::UnableToFetchModelFromDB)?;
    let sql = format!(
        "{} WHERE {} = ?1;",
        select_sql(schema),
        quote_identifier(PRIMARY_KEY)
    );

    let binds = [SqlValue::Integer(id)];
    let mut records = match read_records(session.connection(), schema, &sql, &binds) {
        Ok(records) => records,
        Err(ReadError::Db(err)) => {
            error!(
                "event=model_fetch module=model status=error entity={} id={} error_code=db_read_failed error={}",
                entity, id, err
            );
            return Err(ModelError::UnableToFetchModelFromDB(err));
        }
        Err(ReadError::Decode(message)) => {
            error!(
                "event=model_fetch module=model status=error entity={} id={} error_code=decode_failed error={}",
                entity, id, message
            );
            return Err(ModelError::FetchingModelFailed(message));
        }
    };

    let Some(record) = records.pop() else {
        error!(
            "event=model_fetch module=model status=error entity={} id={} error_code=unknown_id",
            entity, id
        );
        return Err(ModelError::UnknownModelId {
            entity: entity.to_string(),
            id,
        });
    };

    let model = M::from_record(record).map_err(|err| {
        error!(
            "event=model_fetch module=model status=error entity={} id={} error_code=decode_failed error={}",
            entity, id, err
        );
        ModelError::FetchingModelFailed(err.to_string())
    })?;
    debug!(
        "event=model_fetch module=model status=ok entity={} id={} duration_ms={}",
        entity,
        id,
        started_at.elapsed().as_millis()
    );
    Ok(model)
}

pub(crate) fn select<M: Model>(
    db: &Database,
    filter: &Filter,
    limit: Option<u32>,
) -> ModelResult<Vec<M>> {
    let schema = M::schema();
    let entity = schema.entity_name();
    let started_at = Instant::now();

    let mut clauses = Vec::with_capacity(filter.conditions().len());
    let mut binds = Vec::with_capacity(filter.conditions().len() + 1);
    for (name, value) in filter.conditions() {
        let Some(column) = schema.column(name) else {
            error!(
                "event=model_select module=model status=error entity={} error_code=invalid_attribute attribute={}",
                entity, name
            );
            return Err(ModelError::InvalidModelAttribute(format!(
                "`{name}` is not an attribute of {entity}"
            )));
        };
        let value = value.clone().coerce(column.kind()).map_err(|value| {
            error!(
                "event=model_select module=model status=error entity={} error_code=invalid_attribute attribute={} value_type={}",
                entity,
                name,
                value.type_name()
            );
            ModelError::InvalidModelAttribute(format!(
                "`{name}` of {entity} expects {}, got {}",
                column.kind(),
                value.type_name()
            ))
        })?;

        let quoted = quote_identifier(column.name());
        if value.is_null() {
            clauses.push(format!("{quoted} IS NULL"));
        } else {
            binds.push(value.to_sql());
            clauses.push(format!("{quoted} = ?{}", binds.len()));
        }
    }

    let mut sql = select_sql(schema);
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(&format!(" ORDER BY {} ASC", quote_identifier(PRIMARY_KEY)));
    if let Some(limit) = limit {
        binds.push(SqlValue::Integer(i64::from(limit)));
        sql.push_str(&format!(" LIMIT ?{}", binds.len()));
    }
    sql.push(';');

    debug!(
        "event=model_select module=model status=start entity={} filters=[{}] limit={}",
        entity,
        filter.describe(),
        limit.map_or_else(|| "none".to_string(), |limit| limit.to_string())
    );

    let session = db
        .open_session()
        .map_err(ModelError::UnableToSelectFromDB)?;
    let records = match read_records(session.connection(), schema, &sql, &binds) {
        Ok(records) => records,
        Err(ReadError::Db(err)) => {
            error!(
                "event=model_select module=model status=error entity={} error_code=db_read_failed error={}",
                entity, err
            );
            return Err(ModelError::UnableToSelectFromDB(err));
        }
        Err(ReadError::Decode(message)) => {
            error!(
                "event=model_select module=model status=error entity={} error_code=decode_failed error={}",
                entity, message
            );
            return Err(ModelError::SelectingModelsFailed(message));
        }
    };

    let models = records
        .into_iter()
        .map(M::from_record)
        .collect::<ModelResult<Vec<M>>>()
        .map_err(|err| ModelError::SelectingModelsFailed(err.to_string()))?;
    debug!(
        "event=model_select module=model status=ok entity={} count={} duration_ms={}",
        entity,
        models.len(),
        started_at.elapsed().as_millis()
    );
    Ok(models)
}

pub(crate) fn delete<M: Model>(db: &Database, model: &M) -> ModelResult<()> {
    let schema = M::schema();
    let entity = schema.entity_name();
    let Some(id) = model.id() else {
        error!(
            "event=model_delete module=model status=error entity={} error_code=invalid_id",
            entity
        );
        return Err(ModelError::InvalidModelId(format!(
            "{entity} has no id; it was never saved"
        )));
    };
    let started_at = Instant::now();
    debug!(
        "event=model_delete module=model status=start entity={} id={}",
        entity, id
    );

    let mut session = db
        .open_session()
        .map_err(ModelError::UnableToDeleteModelFromDB)?;

    let outcome = match delete_row(&mut session, schema, id) {
        Ok(outcome) => outcome,
        Err(err) => {
            rollback_quietly(&mut session, entity);
            error!(
                "event=model_delete module=model status=error entity={} id={} error_code=db_delete_failed error={}",
                entity, id, err
            );
            return Err(ModelError::UnableToDeleteModelFromDB(err));
        }
    };

    match outcome {
        DeleteOutcome::Deleted => {}
        DeleteOutcome::Missing => {
            rollback_quietly(&mut session, entity);
            error!(
                "event=model_delete module=model status=error entity={} id={} error_code=unknown_id",
                entity, id
            );
            return Err(ModelError::UnknownModelId {
                entity: entity.to_string(),
                id,
            });
        }
        DeleteOutcome::Lingering(remaining) => {
            rollback_quietly(&mut session, entity);
            error!(
                "event=model_delete module=model status=error entity={} id={} error_code=rows_remaining remaining={}",
                entity, id, remaining
            );
            return Err(ModelError::DeletingModelFailed(format!(
                "{remaining} {entity} row(s) with id {id} remain after delete"
            )));
        }
    }

    if let Err(err) = session.commit() {
        rollback_quietly(&mut session, entity);
        error!(
            "event=model_delete module=model status=error entity={} id={} error_code=commit_failed error={}",
            entity, id, err
        );
        return Err(ModelError::UnableToDeleteModelFromDB(err));
    }

    debug!(
        "event=model_delete module=model status=ok entity={} id={} duration_ms={}",
        entity,
        id,
        started_at.elapsed().as_millis()
    );
    Ok(())
}

/// Columns the record sets, in schema order, with values checked against
/// the column type. The primary key travels separately; columns the record
/// leaves out are not written.
fn write_values(schema: &Schema, mut record: Record) -> Result<Vec<(&str, SqlValue)>, String> {
    record.remove(PRIMARY_KEY);

    let mut values = Vec::with_capacity(record.len());
    for column in schema.data_columns() {
        let Some(value) = record.remove(column.name()) else {
            continue;
        };
        let value = value.coerce(column.kind()).map_err(|value| {
            format!(
                "attribute `{}` expects {}, got {}",
                column.name(),
                column.kind(),
                value.type_name()
            )
        })?;
        values.push((column.name(), value.to_sql()));
    }

    if let Some(unknown) = record.keys().next() {
        return Err(format!(
            "`{unknown}` is not an attribute of {}",
            schema.entity_name()
        ));
    }
    Ok(values)
}

/// Inserts the row, or merges the given columns onto the row with `id`.
///
/// Returns the stored row as read back inside the same transaction.
fn write_row(
    session: &mut Session,
    schema: &Schema,
    id: Option<ModelId>,
    values: &[(&str, SqlValue)],
) -> Result<Record, ReadError> {
    session.begin()?;
    let conn = session.connection();
    let table = quote_identifier(schema.table_name());
    let columns: Vec<&str> = values.iter().map(|(column, _)| *column).collect();
    let binds = values.iter().map(|(_, value)| value);

    let saved_id = match id {
        None => {
            conn.execute(&insert_sql(&table, &columns, false), params_from_iter(binds))?;
            conn.last_insert_rowid()
        }
        Some(id) if columns.is_empty() => {
            conn.execute(
                &format!(
                    "INSERT OR IGNORE INTO {table} ({}) VALUES (?1);",
                    quote_identifier(PRIMARY_KEY)
                ),
                [id],
            )?;
            id
        }
        Some(id) => {
            let key = SqlValue::Integer(id);
            let updated = conn.execute(
                &update_sql(&table, &columns),
                params_from_iter(binds.clone().chain(std::iter::once(&key))),
            )?;
            if updated == 0 {
                conn.execute(
                    &insert_sql(&table, &columns, true),
                    params_from_iter(std::iter::once(&key).chain(binds)),
                )?;
            }
            id
        }
    };

    let sql = format!(
        "{} WHERE {} = ?1;",
        select_sql(schema),
        quote_identifier(PRIMARY_KEY)
    );
    let stored = read_records(conn, schema, &sql, &[SqlValue::Integer(saved_id)])?
        .pop()
        .ok_or_else(|| {
            ReadError::Decode(format!(
                "{} row {saved_id} missing after write",
                schema.table_name()
            ))
        })?;

    session.commit()?;
    Ok(stored)
}

fn delete_row(session: &mut Session, schema: &Schema, id: ModelId) -> DbResult<DeleteOutcome> {
    session.begin()?;
    let conn = session.connection();
    let table = quote_identifier(schema.table_name());
    let pk = quote_identifier(PRIMARY_KEY);

    let deleted = conn.execute(&format!("DELETE FROM {table} WHERE {pk} = ?1;"), [id])?;
    if deleted == 0 {
        return Ok(DeleteOutcome::Missing);
    }

    let remaining: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE {pk} = ?1;"),
        [id],
        |row| row.get(0),
    )?;
    if remaining != 0 {
        return Ok(DeleteOutcome::Lingering(remaining));
    }
    Ok(DeleteOutcome::Deleted)
}

fn read_records(
    conn: &Connection,
    schema: &Schema,
    sql: &str,
    binds: &[SqlValue],
) -> Result<Vec<Record>, ReadError> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(binds))?;
    let mut records = Vec::new();

    while let Some(row) = rows.next()? {
        let mut record = Record::new();
        for (index, column) in schema.columns().iter().enumerate() {
            let value = Value::from_sql(column.kind(), row.get_ref(index)?).map_err(|message| {
                ReadError::Decode(format!(
                    "{}.{}: {message}",
                    schema.table_name(),
                    column.name()
                ))
            })?;
            record.insert(column.name(), value);
        }
        records.push(record);
    }

    Ok(records)
}

fn select_sql(schema: &Schema) -> String {
    let columns = schema
        .columns()
        .iter()
        .map(|column| quote_identifier(column.name()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT {columns} FROM {}",
        quote_identifier(schema.table_name())
    )
}

fn insert_sql(table: &str, columns: &[&str], with_id: bool) -> String {
    let mut quoted = Vec::with_capacity(columns.len() + 1);
    if with_id {
        quoted.push(quote_identifier(PRIMARY_KEY));
    }
    quoted.extend(columns.iter().map(|column| quote_identifier(column)));

    if quoted.is_empty() {
        return format!("INSERT INTO {table} DEFAULT VALUES;");
    }
    let placeholders = (1..=quoted.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders});",
        quoted.join(", ")
    )
}

fn update_sql(table: &str, columns: &[&str]) -> String {
    let assignments = columns
        .iter()
        .enumerate()
        .map(|(index, column)| format!("{} = ?{}", quote_identifier(column), index + 1))
        .collect::<Vec<_>>();
    format!(
        "UPDATE {table} SET {} WHERE {} = ?{};",
        assignments.join(", "),
        quote_identifier(PRIMARY_KEY),
        assignments.len() + 1
    )
}

fn rollback_quietly(session: &mut Session, entity: &str) {
    if let Err(err) = session.rollback() {
        warn!(
            "event=tx_rollback module=model status=error entity={} session={} error={}",
            entity,
            session.id(),
            err
        );
    }
}

fn display_id(id: Option<ModelId>) -> String {
    id.map_or_else(|| "none".to_string(), |id| id.to_string())
}
