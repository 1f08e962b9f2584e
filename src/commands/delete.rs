//! Delete command handler.

use crate::commands::Out;
use crate::{store, Config, Result};
use anyhow::Context;

/// Deletes the movement `id` from the configured storage.
pub async fn delete(config: Config, id: i64) -> Result<Out<i64>> {
    let mut movements = store::open(&config).await;
    movements
        .delete(id)
        .await
        .with_context(|| format!("Unable to delete movement {id}"))?;
    Ok(Out::new(format!("Deleted movement {id}"), id))
}
