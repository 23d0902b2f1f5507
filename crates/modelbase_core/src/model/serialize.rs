//! Dict, JSON and textual forms of entities.

use super::error::{ModelError, ModelResult};
use super::record::Record;
use super::value::Value;
use super::Model;
use crate::schema::{is_private_name, PRIMARY_KEY};
use log::warn;
use serde::de::Error as _;

pub(crate) fn to_dict<M: Model>(model: &M) -> Record {
    let mut record = model.to_record();
    record.retain(|name, value| {
        !is_private_name(name) && !(name.as_str() == PRIMARY_KEY && value.is_null())
    });
    record
}

pub(crate) fn to_json<M: Model>(model: &M) -> String {
    let object = to_dict(model)
        .into_iter()
        .map(|(name, value)| (name, value.to_json()))
        .collect::<serde_json::Map<_, _>>();
    serde_json::Value::Object(object).to_string()
}

pub(crate) fn from_dict<M: Model>(record: Record) -> ModelResult<M> {
    let schema = M::schema();
    let mut coerced = Record::new();

    for (name, value) in record {
        let Some(column) = schema.column(&name) else {
            return Err(ModelError::InvalidModelAttribute(format!(
                "`{name}` is not an attribute of {}",
                schema.entity_name()
            )));
        };
        let value = value.coerce(column.kind()).map_err(|value| {
            ModelError::InvalidModelAttribute(format!(
                "attribute `{name}` expects {}, got {}",
                column.kind(),
                value.type_name()
            ))
        })?;
        coerced.insert(name, value);
    }

    M::from_record(coerced)
}

pub(crate) fn from_json<M: Model>(text: &str) -> ModelResult<M> {
    let entity = M::schema().entity_name();
    let parsed: serde_json::Value = serde_json::from_str(text).map_err(|err| {
        warn!(
            "event=model_from_json module=model status=error entity={} error_code=invalid_json error={}",
            entity, err
        );
        ModelError::UnableToCreateModelFromJSON(err)
    })?;

    let serde_json::Value::Object(object) = parsed else {
        return Err(ModelError::UnableToCreateModelFromJSON(
            serde_json::Error::custom(format!("{entity} JSON must be an object")),
        ));
    };

    let mut record = Record::new();
    for (name, value) in object {
        let Some(value) = Value::from_json(value) else {
            return Err(ModelError::UnableToCreateModelFromJSON(
                serde_json::Error::custom(format!(
                    "attribute `{name}` of {entity} must be a scalar"
                )),
            ));
        };
        record.insert(name, value);
    }

    from_dict(record)
}

pub(crate) fn repr<M: Model>(model: &M) -> String {
    let attributes = to_dict(model)
        .iter()
        .map(|(name, value)| format!("{name}={}", value.repr()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}({attributes})", M::schema().entity_name())
}
