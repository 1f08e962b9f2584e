//! The flat-file backend. The whole collection lives in one CSV file with a header row; every save
//! rewrites the file from scratch. There is no locking, so concurrent writers can lose data.

use crate::db::Row;
use crate::model::Movement;
use crate::store::{Movements, StoreError, StoreResult};
use crate::{utils, Result};
use anyhow::Context;
use async_trait::async_trait;
use csv::{ReaderBuilder, Writer};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The persisted columns, in file order.
pub(crate) const HEADERS: [&str; 5] = ["id", "fecha", "concepto", "tipo", "cantidad"];

#[derive(Debug, Clone)]
pub struct CsvMovements {
    path: PathBuf,
    movements: Vec<Movement>,
}

impl CsvMovements {
    /// Opens the collection stored at `path`. If the file cannot be read the collection is empty.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let movements = match load(&path).await {
            Ok(movements) => movements,
            Err(e) => {
                warn!("Unable to load movements from {}: {e:#}", path.display());
                Vec::new()
            }
        };
        Self { path, movements }
    }

    /// Rewrites the whole file from the in-memory collection.
    pub async fn save(&self) -> Result<()> {
        write(&self.path, &self.movements).await
    }
}

#[async_trait]
impl Movements for CsvMovements {
    fn movements(&self) -> &[Movement] {
        &self.movements
    }

    /// Appends `movement` and rewrites the file.
    async fn add(&mut self, movement: Movement) -> StoreResult<()> {
        if movement.has_errors() {
            return Err(StoreError::Invalid(movement.errors().join("; ")));
        }
        self.movements.push(movement);
        if let Err(e) = self.save().await {
            warn!("Unable to save movements to {}: {e:#}", self.path.display());
            self.movements.pop();
            return Err(StoreError::Backend(e));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Movement> {
        self.movements
            .iter()
            .find(|m| m.id() == Some(id))
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }
}

/// Reads every record of the file at `path` and validates it into a `Movement`.
pub(crate) async fn load(path: &Path) -> Result<Vec<Movement>> {
    let content = utils::read(path).await?;
    // short or long rows are left to the validator
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());
    let headers = reader
        .headers()
        .with_context(|| format!("Unable to read the header of {}", path.display()))?
        .clone();

    let mut movements = Vec::new();
    for (ix, record) in reader.records().enumerate() {
        let record = record
            .with_context(|| format!("Unable to read record {} of {}", ix + 1, path.display()))?;
        let row: Row = headers.iter().zip(record.iter()).collect();
        movements.push(Movement::from_row(&row));
    }
    debug!("Loaded {} movements from {}", movements.len(), path.display());
    Ok(movements)
}

/// Writes the header and one record per movement to `path`, replacing the file.
pub(crate) async fn write(path: &Path, movements: &[Movement]) -> Result<()> {
    let mut writer = Writer::from_writer(Vec::new());
    writer
        .write_record(HEADERS)
        .context("Unable to serialize the CSV header")?;
    for movement in movements {
        writer
            .write_record(movement.to_record())
            .context("Unable to serialize a movement")?;
    }
    let data = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Unable to finish writing CSV data: {e}"))?;
    utils::write(path, data).await?;
    debug!("Saved {} movements to {}", movements.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MovementType;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn movement(fecha: &str, concepto: &str, tipo: &str, cantidad: &str) -> Movement {
        Movement::from_row(&Row::from_iter([
            ("fecha", fecha),
            ("concepto", concepto),
            ("tipo", tipo),
            ("cantidad", cantidad),
        ]))
    }

    #[tokio::test]
    async fn test_save_then_load_reproduces_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movimientos.csv");
        let originals = vec![
            movement("2024-11-01", "Calabaza", "G", "3.56"),
            movement("2024-11-02", "Nómina, noviembre", "I", "1500"),
            movement("2024-11-03", "Café \"solo\"", "G", "1.20"),
        ];
        write(&path, &originals).await.unwrap();

        let loaded = load(&path).await.unwrap();
        assert_eq!(loaded.len(), originals.len());
        for (a, b) in originals.iter().zip(loaded.iter()) {
            assert_eq!(a.date(), b.date());
            assert_eq!(a.concept(), b.concept());
            assert_eq!(a.kind(), b.kind());
            assert_eq!(a.amount(), b.amount());
            assert!(!b.has_errors());
        }
    }

    #[tokio::test]
    async fn test_file_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movimientos.csv");
        write(&path, &[movement("2024-11-01", "Calabaza", "G", "3.56")])
            .await
            .unwrap();
        let content = utils::read(&path).await.unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("id,fecha,concepto,tipo,cantidad"));
        assert_eq!(lines.next(), Some(",2024-11-01,Calabaza,G,3.56"));
        assert_eq!(lines.next(), None);
    }

    #[tokio::test]
    async fn test_save_empty_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movimientos.csv");
        write(&path, &[]).await.unwrap();
        assert!(load(&path).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let movements = CsvMovements::open(dir.path().join("nope.csv")).await;
        assert!(movements.movements().is_empty());
    }

    #[tokio::test]
    async fn test_open_keeps_invalid_rows_with_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movimientos.csv");
        utils::write(
            &path,
            "fecha,concepto,tipo,cantidad\n2024-13-40,Calabaza,G,-5\n2024-11-01,Pan,G,1\n",
        )
        .await
        .unwrap();
        let movements = CsvMovements::open(&path).await;
        assert_eq!(movements.movements().len(), 2);
        assert_eq!(movements.movements()[0].errors().len(), 2);
        assert!(!movements.movements()[1].has_errors());
    }

    #[tokio::test]
    async fn test_add_rewrites_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movimientos.csv");
        write(&path, &[movement("2024-11-01", "Calabaza", "G", "3.56")])
            .await
            .unwrap();

        let mut movements = CsvMovements::open(&path).await;
        movements
            .add(movement("2024-11-05", "Regalo", "I", "20"))
            .await
            .unwrap();

        let reopened = CsvMovements::open(&path).await;
        assert_eq!(reopened.movements().len(), 2);
        let added = &reopened.movements()[1];
        assert_eq!(added.concept(), "Regalo");
        assert_eq!(added.kind(), MovementType::Income);
        assert_eq!(added.amount(), Decimal::from(20));
    }

    #[tokio::test]
    async fn test_ragged_rows_are_loaded_and_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movimientos.csv");
        utils::write(
            &path,
            "id,fecha,concepto,tipo,cantidad\n\
             1,2024-11-01,Pan,G,1\n\
             2,2024-11-02,Leche\n\
             3,2024-11-03,Huevos,G,2.5,extra\n",
        )
        .await
        .unwrap();

        let mut movements = CsvMovements::open(&path).await;
        assert_eq!(movements.movements().len(), 3);
        let short = &movements.movements()[1];
        assert_eq!(short.concept(), "Leche");
        assert_eq!(short.amount(), Decimal::ZERO);
        assert!(short.has_errors());
        let long = &movements.movements()[2];
        assert!(!long.has_errors());
        assert_eq!(long.amount(), Decimal::new(25, 1));

        movements
            .add(movement("2024-11-05", "Regalo", "I", "20"))
            .await
            .unwrap();
        let reopened = CsvMovements::open(&path).await;
        assert_eq!(reopened.movements().len(), 4);
        assert_eq!(reopened.movements()[0].concept(), "Pan");
        assert_eq!(reopened.movements()[3].concept(), "Regalo");
    }

    #[tokio::test]
    async fn test_failed_add_leaves_collection_unchanged() {
        let dir = TempDir::new().unwrap();
        // the parent directory does not exist, so the rewrite fails
        let path = dir.path().join("missing").join("movimientos.csv");
        let mut movements = CsvMovements::open(&path).await;
        let result = movements
            .add(movement("2024-11-05", "Regalo", "I", "20"))
            .await;
        assert!(matches!(result, Err(StoreError::Backend(_))));
        assert!(movements.movements().is_empty());
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_movement() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movimientos.csv");
        let mut movements = CsvMovements::open(&path).await;
        let result = movements.add(movement("nope", "Calabaza", "G", "3.56")).await;
        assert!(matches!(result, Err(StoreError::Invalid(_))));
        assert!(movements.movements().is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movimientos.csv");
        utils::write(&path, "id,fecha,concepto,tipo,cantidad\n4,2024-11-01,Pan,G,1\n")
            .await
            .unwrap();
        let movements = CsvMovements::open(&path).await;
        assert_eq!(movements.find_by_id(4).await.unwrap().concept(), "Pan");
        assert!(matches!(
            movements.find_by_id(5).await,
            Err(StoreError::NotFound(5))
        ));
    }

    #[tokio::test]
    async fn test_delete_and_edit_are_unsupported() {
        let dir = TempDir::new().unwrap();
        let mut movements = CsvMovements::open(dir.path().join("movimientos.csv")).await;
        assert!(matches!(
            movements.delete(1).await,
            Err(StoreError::Unsupported("delete"))
        ));
        let m = movement("2024-11-01", "Calabaza", "G", "3.56");
        assert!(matches!(
            movements.edit(m).await,
            Err(StoreError::Unsupported("edit"))
        ));
    }
}
