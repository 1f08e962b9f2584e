//! Configuration for balance.
//!
//! All settings are read once at startup, from command line flags or from `BALANCE_*` environment
//! variables (see `args`), and turned into a `Config`. The `Config` is passed explicitly to the
//! commands, the web layer and the store; nothing reads the environment after startup.
//!
//! The data directory, `$BALANCE_HOME`, holds both backends:
//! - `balance.db` - the SQLite database
//! - `movimientos.csv` - the flat file

use crate::db::Db;
use crate::store;
use crate::{utils, Result};
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "balance";
const BALANCE_DB: &str = "balance.db";
const MOVEMENTS_CSV: &str = "movimientos.csv";

/// Minimum length, in bytes, of the secret that signs the flash cookie.
pub const MIN_SECRET_LEN: usize = 64;

/// Which backend the movement collection uses.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    serde::Serialize,
    serde::Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Storage {
    /// The flat CSV file.
    Csv,
    /// The SQLite database.
    #[default]
    Db,
}

serde_plain::derive_display_from_serialize!(Storage);
serde_plain::derive_fromstr_from_deserialize!(Storage);

/// A secret that is never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Debug for SecretKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretKey(****)")
    }
}

/// The process-wide settings that do not depend on the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    debug: bool,
    app_name: String,
    secret_key: Option<SecretKey>,
    storage: Storage,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            app_name: APP_NAME.to_string(),
            secret_key: None,
            storage: Storage::default(),
        }
    }
}

impl Settings {
    pub fn new(
        debug: bool,
        app_name: impl Into<String>,
        secret_key: Option<String>,
        storage: Storage,
    ) -> Self {
        Self {
            debug,
            app_name: app_name.into(),
            secret_key: secret_key.map(SecretKey::new),
            storage,
        }
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn secret_key(&self) -> Option<&SecretKey> {
        self.secret_key.as_ref()
    }

    pub fn storage(&self) -> Storage {
        self.storage
    }
}

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$BALANCE_HOME` and the `Settings`. It provides paths to the files that are
/// expected in the data directory and a handle to the SQLite database.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    settings: Settings,
    db: Db,
    csv_path: PathBuf,
}

impl Config {
    /// Creates the data directory and:
    /// - Creates and migrates the SQLite database
    /// - Creates a CSV file that holds only the header row, unless one is already there
    ///
    /// # Errors
    /// - Returns an error if the database already exists or any file operation fails.
    pub async fn create(dir: impl Into<PathBuf>, settings: Settings) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the balance home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let db = Db::init(root.join(BALANCE_DB))
            .await
            .context("Unable to create SQLite DB")?;

        let csv_path = root.join(MOVEMENTS_CSV);
        if !csv_path.exists() {
            store::write_csv(&csv_path, &[])
                .await
                .context("Unable to create the movements CSV file")?;
        }

        Ok(Self {
            root,
            settings,
            db,
            csv_path,
        })
    }

    /// This will
    /// - validate that `balance_home` exists
    /// - load and migrate the SQLite database
    /// - validate that the CSV file exists when it is the selected storage
    pub async fn load(balance_home: impl Into<PathBuf>, settings: Settings) -> Result<Self> {
        let maybe_relative = balance_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("Balance Home is missing, run 'balance init' first")?;
        let _ = utils::read_dir(&root)
            .await
            .context("Balance Home is not a directory")?;

        let db = Db::load(root.join(BALANCE_DB))
            .await
            .context("Unable to load SQLite DB")?;

        let csv_path = root.join(MOVEMENTS_CSV);
        if settings.storage() == Storage::Csv && !csv_path.is_file() {
            bail!("The movements file is missing '{}'", csv_path.display())
        }

        Ok(Self {
            root,
            settings,
            db,
            csv_path,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn db(&self) -> &Db {
        &self.db
    }

    pub fn sqlite_path(&self) -> &Path {
        self.db.path()
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn storage(&self) -> Storage {
        self.settings.storage()
    }

    pub fn debug(&self) -> bool {
        self.settings.debug()
    }

    pub fn app_name(&self) -> &str {
        self.settings.app_name()
    }

    /// Returns the secret that signs cookies, which must be present and long enough.
    pub fn secret_key(&self) -> Result<&SecretKey> {
        let secret = self
            .settings
            .secret_key()
            .context("A secret key is required, set BALANCE_SECRET_KEY or --secret-key")?;
        ensure!(
            secret.as_bytes().len() >= MIN_SECRET_LEN,
            "The secret key must be at least {MIN_SECRET_LEN} bytes long"
        );
        Ok(secret)
    }
}
