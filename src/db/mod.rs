//! This module is responsible for reading, writing and managing the SQLite database.
//!
//! Every operation opens its own connection and closes it before returning. There is no pool and
//! no transaction that spans more than one call.

mod migrations;
mod row;

pub use row::{Field, Row};

use crate::model::{parse_iso_date, Movement};
use crate::store::{StoreError, StoreResult};
use crate::Result;
use anyhow::{bail, Context};
use rust_decimal::prelude::ToPrimitive;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteQueryResult};
use sqlx::{Connection, Sqlite, SqliteConnection};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

pub(crate) const SELECT_ALL: &str = "SELECT id, fecha, concepto, tipo, cantidad FROM movimientos";
const SELECT_ONE: &str = "SELECT id, fecha, concepto, tipo, cantidad FROM movimientos WHERE id=?";
const DELETE: &str = "DELETE FROM movimientos WHERE id=?";
const UPDATE: &str = "UPDATE movimientos SET fecha=?, concepto=?, tipo=?, cantidad=? WHERE id=?";
const INSERT: &str = "INSERT INTO movimientos (fecha, concepto, tipo, cantidad) VALUES (?, ?, ?, ?)";

#[derive(Debug, Clone)]
pub(crate) struct Db {
    path: PathBuf,
    options: SqliteConnectOptions,
}

impl Db {
    /// - Validates that there is a SQLite file at `path`
    /// - Updates the database schema with migrations if it is out-of-date
    /// - Returns a constructed `Db` object for further operations
    pub(crate) async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("The SQLite database is missing '{}'", path.display())
        }
        let db = Self::new(path, false);
        db.migrate().await?;
        Ok(db)
    }

    /// - Validates that no file currently exists at `path`
    /// - Creates a new SQLite file at `path`
    /// - Initializes the database schema
    /// - Returns a constructed `Db` object for further operations
    pub(crate) async fn init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("A file already exists at '{}'", path.display())
        }
        let db = Self::new(path, true);
        db.migrate().await?;
        Ok(db)
    }

    fn new(path: &Path, create: bool) -> Self {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(create);
        Self {
            path: path.to_path_buf(),
            options,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    async fn connect(&self) -> Result<SqliteConnection> {
        SqliteConnection::connect_with(&self.options)
            .await
            .with_context(|| format!("Unable to open SQLite database {}", self.path.display()))
    }

    async fn migrate(&self) -> Result<()> {
        let mut conn = self.connect().await?;
        migrations::bootstrap(&mut conn).await?;
        let current = migrations::version(&mut conn).await?;
        migrations::run(&mut conn, current, migrations::CURRENT_VERSION).await?;
        close(conn).await;
        Ok(())
    }

    /// Executes a read query and maps every result row using the cursor's column descriptors.
    ///
    /// `sql` is executed as given: never interpolate user input into it.
    pub(crate) async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        let mut conn = self.connect().await?;
        let rows = sqlx::query(sql)
            .fetch_all(&mut conn)
            .await
            .with_context(|| format!("Query failed: {sql}"));
        close(conn).await;
        rows?.iter().map(Row::from_sqlite).collect()
    }

    /// Deletes the movement with `id`. Returns `NotFound` when no row was affected.
    pub(crate) async fn delete(&self, id: i64) -> StoreResult<()> {
        let done = self
            .execute(sqlx::query(DELETE).bind(id))
            .await
            .map_err(|e| {
                error!("Unable to delete movement {id}: {e:#}");
                StoreError::Backend(e)
            })?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        debug!("Deleted movement {id}");
        Ok(())
    }

    /// Selects the movement with `id`. The `fecha` field of the returned row is a `Field::Date`.
    pub(crate) async fn fetch_one(&self, id: i64) -> StoreResult<Option<Row>> {
        let found = self.fetch(id).await.map_err(|e| {
            error!("Unable to fetch movement {id}: {e:#}");
            StoreError::Backend(e)
        })?;
        let Some(mut row) = found else {
            return Ok(None);
        };
        let date = match row.get("fecha") {
            Some(Field::Text(s)) => parse_iso_date(s).ok_or_else(|| {
                StoreError::Backend(anyhow::anyhow!(
                    "Movement {id} has a stored date '{s}' that is not ISO 8601"
                ))
            })?,
            other => {
                return Err(StoreError::Backend(anyhow::anyhow!(
                    "Movement {id} has a stored date that is not text: {other:?}"
                )))
            }
        };
        row.set("fecha", Field::Date(date));
        Ok(Some(row))
    }

    async fn fetch(&self, id: i64) -> Result<Option<Row>> {
        let mut conn = self.connect().await?;
        let found = sqlx::query(SELECT_ONE)
            .bind(id)
            .fetch_optional(&mut conn)
            .await
            .with_context(|| format!("Unable to select movement {id}"));
        close(conn).await;
        found?.as_ref().map(Row::from_sqlite).transpose()
    }

    /// Writes every mutable field of `movement` to the row with the same id. Returns the number of
    /// affected rows, which is at least 1 on success.
    pub(crate) async fn update(&self, movement: &Movement) -> StoreResult<u64> {
        let Some(id) = movement.id() else {
            return Err(StoreError::Invalid(String::from(
                "A movement without an id cannot be updated",
            )));
        };
        let params = Params::new(movement)?;
        let query = sqlx::query(UPDATE)
            .bind(params.date)
            .bind(params.concept)
            .bind(params.kind)
            .bind(params.amount)
            .bind(id);
        let done = self.execute(query).await.map_err(|e| {
            error!("Unable to update movement {id}: {e:#}");
            StoreError::Backend(e)
        })?;
        match done.rows_affected() {
            0 => Err(StoreError::NotFound(id)),
            n => {
                debug!("Updated movement {id}");
                Ok(n)
            }
        }
    }

    /// Inserts `movement` as a new row and returns the id that SQLite assigned to it.
    pub(crate) async fn insert(&self, movement: &Movement) -> StoreResult<i64> {
        let params = Params::new(movement)?;
        let query = sqlx::query(INSERT)
            .bind(params.date)
            .bind(params.concept)
            .bind(params.kind)
            .bind(params.amount);
        let done = self.execute(query).await.map_err(|e| {
            error!("Unable to insert movement: {e:#}");
            StoreError::Backend(e)
        })?;
        let id = done.last_insert_rowid();
        debug!("Inserted movement {id}");
        Ok(id)
    }

    /// Runs a single statement in its own transaction: commit on success, rollback on failure.
    async fn execute<'q>(
        &self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Result<SqliteQueryResult> {
        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await.context("Unable to begin transaction")?;
        let outcome = match query.execute(&mut *tx).await {
            Ok(done) => tx
                .commit()
                .await
                .map(|_| done)
                .context("Unable to commit transaction"),
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!("Rollback failed: {rollback}");
                }
                Err(e).context("Statement failed and was rolled back")
            }
        };
        close(conn).await;
        outcome
    }
}

/// Closes `conn`, logging instead of failing: the work on it is already done.
async fn close(conn: SqliteConnection) {
    if let Err(e) = conn.close().await {
        warn!("Unable to close SQLite connection cleanly: {e}");
    }
}

/// The bind values for the mutable columns of a movement.
struct Params {
    date: String,
    concept: String,
    kind: String,
    amount: f64,
}

impl Params {
    fn new(movement: &Movement) -> StoreResult<Self> {
        let Some(date) = movement.date() else {
            return Err(StoreError::Invalid(String::from(
                "A movement without a valid date cannot be stored",
            )));
        };
        let amount = movement.amount().to_f64().ok_or_else(|| {
            StoreError::Invalid(format!(
                "The amount {} cannot be stored as a number",
                movement.amount()
            ))
        })?;
        Ok(Self {
            date: date.format("%Y-%m-%d").to_string(),
            concept: movement.concept().to_string(),
            kind: movement.kind().code().to_string(),
            amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MovementType;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    async fn test_db() -> (TempDir, Db) {
        let dir = TempDir::new().unwrap();
        let db = Db::init(dir.path().join("balance.db")).await.unwrap();
        (dir, db)
    }

    fn movement(fecha: &str, concepto: &str, tipo: &str, cantidad: &str) -> Movement {
        Movement::from_row(&Row::from_iter([
            ("fecha", fecha),
            ("concepto", concepto),
            ("tipo", tipo),
            ("cantidad", cantidad),
        ]))
    }

    #[tokio::test]
    async fn test_init_refuses_existing_file() {
        let (dir, _db) = test_db().await;
        let result = Db::init(dir.path().join("balance.db")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_load_requires_existing_file() {
        let dir = TempDir::new().unwrap();
        let result = Db::load(dir.path().join("nope.db")).await;
        assert!(result.unwrap_err().to_string().contains("missing"));
    }

    #[tokio::test]
    async fn test_load_after_init() {
        let (dir, db) = test_db().await;
        db.insert(&movement("2024-11-01", "Calabaza", "G", "3.56"))
            .await
            .unwrap();
        let loaded = Db::load(dir.path().join("balance.db")).await.unwrap();
        assert_eq!(loaded.query(SELECT_ALL).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_assigns_ids() {
        let (_dir, db) = test_db().await;
        let first = db
            .insert(&movement("2024-11-01", "Calabaza", "G", "3.56"))
            .await
            .unwrap();
        let second = db
            .insert(&movement("2024-11-02", "Nómina", "I", "1500"))
            .await
            .unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_insert_rejects_movement_without_date() {
        let (_dir, db) = test_db().await;
        let result = db.insert(&movement("nope", "Calabaza", "G", "3.56")).await;
        assert!(matches!(result, Err(StoreError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_query_maps_columns_in_cursor_order() {
        let (_dir, db) = test_db().await;
        let id = db
            .insert(&movement("2024-11-01", "Calabaza", "G", "3.56"))
            .await
            .unwrap();
        let rows = db.query(SELECT_ALL).await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(
            row.columns().collect::<Vec<_>>(),
            vec!["id", "fecha", "concepto", "tipo", "cantidad"]
        );
        assert_eq!(row.get("id"), Some(&Field::Integer(id)));
        assert_eq!(row.get("fecha"), Some(&Field::text("2024-11-01")));
        assert_eq!(row.get("tipo"), Some(&Field::text("G")));
        assert_eq!(row.get("cantidad"), Some(&Field::Real(3.56)));
    }

    #[tokio::test]
    async fn test_query_with_bad_sql_is_an_error() {
        let (_dir, db) = test_db().await;
        assert!(db.query("SELECT * FROM nowhere").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_existing_and_missing() {
        let (_dir, db) = test_db().await;
        let id = db
            .insert(&movement("2024-11-01", "Calabaza", "G", "3.56"))
            .await
            .unwrap();

        assert!(matches!(db.delete(id + 100).await, Err(StoreError::NotFound(_))));
        db.delete(id).await.unwrap();
        assert!(db.fetch_one(id).await.unwrap().is_none());
        assert!(matches!(db.delete(id).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_fetch_one_converts_date() {
        let (_dir, db) = test_db().await;
        let id = db
            .insert(&movement("2024-11-01", "Calabaza", "G", "3.56"))
            .await
            .unwrap();
        let row = db.fetch_one(id).await.unwrap().unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 11, 1).unwrap();
        assert_eq!(row.get("fecha"), Some(&Field::Date(expected)));
        assert_eq!(row.get("concepto"), Some(&Field::text("Calabaza")));
    }

    #[tokio::test]
    async fn test_fetch_one_with_corrupt_date_is_backend_error() {
        let (_dir, db) = test_db().await;
        let mut conn = db.connect().await.unwrap();
        sqlx::query("INSERT INTO movimientos (id, fecha, concepto, tipo, cantidad) VALUES (9, '01/11/2024', 'x', 'G', 1.0)")
            .execute(&mut conn)
            .await
            .unwrap();
        close(conn).await;
        assert!(matches!(db.fetch_one(9).await, Err(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn test_fetch_one_with_unpadded_date_is_backend_error() {
        let (_dir, db) = test_db().await;
        let mut conn = db.connect().await.unwrap();
        sqlx::query("INSERT INTO movimientos (id, fecha, concepto, tipo, cantidad) VALUES (3, '2024-1-5', 'x', 'G', 1.0)")
            .execute(&mut conn)
            .await
            .unwrap();
        close(conn).await;
        assert!(matches!(db.fetch_one(3).await, Err(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn test_update_existing() {
        let (_dir, db) = test_db().await;
        let id = db
            .insert(&movement("2024-11-01", "Calabaza", "G", "3.56"))
            .await
            .unwrap();
        let changed = Movement::from_row(
            &Row::from_iter([
                ("fecha", "2024-12-24"),
                ("concepto", "Cesta"),
                ("tipo", "I"),
                ("cantidad", "40.5"),
            ])
            .with("id", Field::Integer(id)),
        );

        let affected = db.update(&changed).await.unwrap();
        assert_eq!(affected, 1);

        let row = db.fetch_one(id).await.unwrap().unwrap();
        let reloaded = Movement::from_row(&row);
        assert_eq!(reloaded.id(), Some(id));
        assert_eq!(reloaded.date(), NaiveDate::from_ymd_opt(2024, 12, 24));
        assert_eq!(reloaded.concept(), "Cesta");
        assert_eq!(reloaded.kind(), MovementType::Income);
        assert_eq!(reloaded.amount(), Decimal::new(405, 1));
    }

    #[tokio::test]
    async fn test_update_missing_id() {
        let (_dir, db) = test_db().await;
        let ghost = Movement::from_row(
            &Row::from_iter([("fecha", "2024-12-24"), ("cantidad", "1")])
                .with("id", Field::Integer(42)),
        );
        assert!(matches!(db.update(&ghost).await, Err(StoreError::NotFound(42))));

        let no_id = movement("2024-12-24", "Cesta", "G", "1");
        assert!(matches!(db.update(&no_id).await, Err(StoreError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_update_when_table_is_gone_is_backend_error() {
        let (_dir, db) = test_db().await;
        let mut conn = db.connect().await.unwrap();
        sqlx::query("DROP TABLE movimientos")
            .execute(&mut conn)
            .await
            .unwrap();
        close(conn).await;

        let m = Movement::from_row(
            &Row::from_iter([("fecha", "2024-12-24"), ("cantidad", "1")])
                .with("id", Field::Integer(1)),
        );
        assert!(matches!(db.update(&m).await, Err(StoreError::Backend(_))));
        assert!(matches!(db.delete(1).await, Err(StoreError::Backend(_))));
    }
}
