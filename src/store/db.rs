//! The relational backend, backed by the `movimientos` table.

use crate::db::{Db, SELECT_ALL};
use crate::model::Movement;
use crate::store::{Movements, StoreError, StoreResult};
use async_trait::async_trait;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct DbMovements {
    db: Db,
    movements: Vec<Movement>,
}

impl DbMovements {
    /// Loads every row of the table. If the query fails the collection is empty.
    pub(crate) async fn open(db: Db) -> Self {
        let movements = match db.query(SELECT_ALL).await {
            Ok(rows) => rows.iter().map(Movement::from_row).collect(),
            Err(e) => {
                warn!(
                    "Unable to load movements from {}: {e:#}",
                    db.path().display()
                );
                Vec::new()
            }
        };
        Self { db, movements }
    }
}

#[async_trait]
impl Movements for DbMovements {
    fn movements(&self) -> &[Movement] {
        &self.movements
    }

    /// Inserts `movement`; the stored copy carries the id assigned by the database.
    async fn add(&mut self, movement: Movement) -> StoreResult<()> {
        if movement.has_errors() {
            return Err(StoreError::Invalid(movement.errors().join("; ")));
        }
        let id = self.db.insert(&movement).await?;
        self.movements.push(movement.with_id(id));
        Ok(())
    }

    async fn delete(&mut self, id: i64) -> StoreResult<()> {
        self.db.delete(id).await?;
        self.movements.retain(|m| m.id() != Some(id));
        Ok(())
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Movement> {
        match self.db.fetch_one(id).await? {
            Some(row) => Ok(Movement::from_row(&row)),
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn edit(&mut self, movement: Movement) -> StoreResult<u64> {
        let affected = self.db.update(&movement).await?;
        if let Some(existing) = self.movements.iter_mut().find(|m| m.id() == movement.id()) {
            *existing = movement;
        }
        Ok(affected)
    }
}
