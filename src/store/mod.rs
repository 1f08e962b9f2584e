//! The movement collection: a backend-agnostic facade over the CSV file and the SQLite database.
//!
//! A collection is opened per request, loads every movement up front, and flushes each mutation to
//! its backend immediately. Backends implement the subset of [`Movements`] they support; the rest
//! report [`StoreError::Unsupported`].

mod csv;
mod db;

pub use self::csv::CsvMovements;
pub use self::db::DbMovements;
pub(crate) use self::csv::write as write_csv;

use crate::model::Movement;
use crate::{Config, Storage};
use async_trait::async_trait;
use std::fmt::{Display, Formatter};

/// Why a store operation did not succeed.
#[derive(Debug)]
pub enum StoreError {
    /// No movement has this id.
    NotFound(i64),
    /// The backend does not implement the named operation.
    Unsupported(&'static str),
    /// The movement cannot be stored as it is.
    Invalid(String),
    /// The backend failed. The failure has already been logged.
    Backend(anyhow::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "Movement not found: {id}"),
            StoreError::Unsupported(op) => {
                write!(f, "The '{op}' operation is not supported by this storage")
            }
            StoreError::Invalid(msg) => write!(f, "Invalid movement: {msg}"),
            StoreError::Backend(e) => write!(f, "Storage failure: {e:#}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Backend(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(value: anyhow::Error) -> Self {
        StoreError::Backend(value)
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The operations a movement collection can offer. Every mutation is written to the backend
/// before the call returns.
#[async_trait]
pub trait Movements: Send + Sync {
    /// Every movement loaded when the collection was opened, in backend order.
    fn movements(&self) -> &[Movement];

    async fn add(&mut self, _movement: Movement) -> StoreResult<()> {
        Err(StoreError::Unsupported("add"))
    }

    async fn delete(&mut self, _id: i64) -> StoreResult<()> {
        Err(StoreError::Unsupported("delete"))
    }

    async fn find_by_id(&self, _id: i64) -> StoreResult<Movement> {
        Err(StoreError::Unsupported("find_by_id"))
    }

    /// Returns the number of records that were changed.
    async fn edit(&mut self, _movement: Movement) -> StoreResult<u64> {
        Err(StoreError::Unsupported("edit"))
    }
}

/// Opens the collection for the storage selected in `config`. A collection that cannot be loaded
/// is empty.
pub async fn open(config: &Config) -> Box<dyn Movements> {
    match config.storage() {
        Storage::Csv => Box::new(CsvMovements::open(config.csv_path()).await),
        Storage::Db => Box::new(DbMovements::open(config.db().clone()).await),
    }
}
