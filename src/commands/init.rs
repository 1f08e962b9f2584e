use crate::commands::Out;
use crate::{Config, Result, Settings};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory and:
/// - Creates and migrates the SQLite database `balance.db`
/// - Creates `movimientos.csv` holding only the header row
///
/// # Arguments
/// - `balance_home` - The directory that will be the root of data directory, e.g. `$HOME/balance`
/// - `settings` - The process settings, kept on the returned `Config`
///
/// # Errors
/// - Returns an error if the database already exists or if any file operations fail.
pub async fn init(balance_home: &Path, settings: Settings) -> Result<Out<()>> {
    let config = Config::create(balance_home, settings)
        .await
        .context("Unable to create the data directory")?;
    Ok(format!(
        "Successfully created the balance directory at {}",
        config.root().display()
    )
    .into())
}
