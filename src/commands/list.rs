use crate::commands::Out;
use crate::model::Movement;
use crate::{store, Config, Result};
use tracing::warn;

/// Loads every movement of the configured storage. The message holds one line per movement.
pub async fn list(config: Config) -> Result<Out<Vec<Movement>>> {
    let collection = store::open(&config).await;
    let movements = collection.movements().to_vec();

    for movement in movements.iter().filter(|m| m.has_errors()) {
        warn!("Invalid movement '{movement}': {}", movement.errors().join("; "));
    }

    let message = if movements.is_empty() {
        format!("No movements found in {} storage", config.storage())
    } else {
        movements
            .iter()
            .map(|m| match m.id() {
                Some(id) => format!("{id:>5} | {m}"),
                None => format!("{:>5} | {m}", "-"),
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    Ok(Out::new(message, movements))
}
