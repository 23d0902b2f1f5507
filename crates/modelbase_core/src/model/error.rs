//! Active-record error taxonomy.
//!
//! # Invariants
//! - Storage failures are wrapped (`UnableTo…`) with the underlying error kept
//!   as `source()`; rusqlite errors never surface unwrapped.
//! - Every variant collapses into exactly one [`ErrorKind`].

use super::ModelId;
use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ModelResult<T> = Result<T, ModelError>;

/// Closed set of failure categories callers branch on.
///
/// Delete failures of either origin report `UnableToDeleteModelFromDB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidModelId,
    UnknownModelId,
    SavingModelFailed,
    FetchingModelFailed,
    InvalidModelAttribute,
    SelectingModelsFailed,
    UnableToDeleteModelFromDB,
    UnableToCreateModelFromJSON,
}

#[derive(Debug)]
pub enum ModelError {
    InvalidModelId(String),
    UnknownModelId { entity: String, id: ModelId },
    UnableToSaveModelInDB(DbError),
    SavingModelFailed(String),
    UnableToFetchModelFromDB(DbError),
    FetchingModelFailed(String),
    InvalidModelAttribute(String),
    UnableToSelectFromDB(DbError),
    SelectingModelsFailed(String),
    UnableToDeleteModelFromDB(DbError),
    DeletingModelFailed(String),
    UnableToCreateModelFromJSON(serde_json::Error),
}

impl ModelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidModelId(_) => ErrorKind::InvalidModelId,
            Self::UnknownModelId { .. } => ErrorKind::UnknownModelId,
            Self::UnableToSaveModelInDB(_) | Self::SavingModelFailed(_) => {
                ErrorKind::SavingModelFailed
            }
            Self::UnableToFetchModelFromDB(_) | Self::FetchingModelFailed(_) => {
                ErrorKind::FetchingModelFailed
            }
            Self::InvalidModelAttribute(_) => ErrorKind::InvalidModelAttribute,
            Self::UnableToSelectFromDB(_) | Self::SelectingModelsFailed(_) => {
                ErrorKind::SelectingModelsFailed
            }
            Self::UnableToDeleteModelFromDB(_) | Self::DeletingModelFailed(_) => {
                ErrorKind::UnableToDeleteModelFromDB
            }
            Self::UnableToCreateModelFromJSON(_) => ErrorKind::UnableToCreateModelFromJSON,
        }
    }

    /// True when the failure came from the storage engine itself.
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            Self::UnableToSaveModelInDB(_)
                | Self::UnableToFetchModelFromDB(_)
                | Self::UnableToSelectFromDB(_)
                | Self::UnableToDeleteModelFromDB(_)
        )
    }
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidModelId(message) => write!(f, "invalid model id: {message}"),
            Self::UnknownModelId { entity, id } => write!(f, "unknown {entity} id: {id}"),
            Self::UnableToSaveModelInDB(err) => write!(f, "unable to save model in db: {err}"),
            Self::SavingModelFailed(message) => write!(f, "saving model failed: {message}"),
            Self::UnableToFetchModelFromDB(err) => {
                write!(f, "unable to fetch model from db: {err}")
            }
            Self::FetchingModelFailed(message) => write!(f, "fetching model failed: {message}"),
            Self::InvalidModelAttribute(message) => {
                write!(f, "invalid model attribute: {message}")
            }
            Self::UnableToSelectFromDB(err) => write!(f, "unable to select from db: {err}"),
            Self::SelectingModelsFailed(message) => {
                write!(f, "selecting models failed: {message}")
            }
            Self::UnableToDeleteModelFromDB(err) => {
                write!(f, "unable to delete model from db: {err}")
            }
            Self::DeletingModelFailed(message) => write!(f, "deleting model failed: {message}"),
            Self::UnableToCreateModelFromJSON(err) => {
                write!(f, "unable to create model from json: {err}")
            }
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnableToSaveModelInDB(err)
            | Self::UnableToFetchModelFromDB(err)
            | Self::UnableToSelectFromDB(err)
            | Self::UnableToDeleteModelFromDB(err) => Some(err),
            Self::UnableToCreateModelFromJSON(err) => Some(err),
            Self::InvalidModelId(_)
            | Self::UnknownModelId { .. }
            | Self::SavingModelFailed(_)
            | Self::FetchingModelFailed(_)
            | Self::InvalidModelAttribute(_)
            | Self::SelectingModelsFailed(_)
            | Self::DeletingModelFailed(_) => None,
        }
    }
}
