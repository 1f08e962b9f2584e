//! These structs provide the CLI interface for the balance CLI.

use crate::config::Storage;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// balance: A small tracker for income and expense movements.
///
/// Movements are kept either in a CSV file or in a SQLite database inside the data directory. You
/// can list and delete them from the command line, or run a small web application to browse,
/// create and edit them.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory with an empty SQLite database and an empty CSV file.
    ///
    /// By default the data directory is $HOME/balance. Pass --data-dir or set BALANCE_HOME to
    /// put it somewhere else.
    Init,
    /// Run the web application.
    Serve(ServeArgs),
    /// Print every movement, one per line.
    List,
    /// Delete the movement with the given id.
    Delete(DeleteArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where balance data is held. Defaults to ~/balance
    #[arg(long, env = "BALANCE_HOME", default_value_t = default_balance_home())]
    data_dir: DisplayPath,

    /// Which backend holds the movements.
    #[arg(long, env = "BALANCE_STORAGE", value_enum, default_value_t = Storage::Db)]
    storage: Storage,

    /// Run the web application in debug mode.
    #[arg(long, env = "BALANCE_DEBUG")]
    debug: bool,

    /// The application name shown in the web pages.
    #[arg(long, env = "BALANCE_APP", default_value = "balance")]
    app: String,

    /// The secret used to sign cookies. At least 64 bytes.
    #[arg(long, env = "BALANCE_SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,
}

impl Common {
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn data_dir(&self) -> &DisplayPath {
        &self.data_dir
    }

    pub fn storage(&self) -> Storage {
        self.storage
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn secret_key(&self) -> Option<&str> {
        self.secret_key.as_deref()
    }
}

/// (Not shown): Args for the `balance serve` command.
#[derive(Debug, Parser, Clone)]
pub struct ServeArgs {
    /// The address to listen on.
    #[arg(long, default_value = "127.0.0.1:5000")]
    bind: SocketAddr,
}

impl ServeArgs {
    pub fn bind(&self) -> SocketAddr {
        self.bind
    }
}

/// (Not shown): Args for the `balance delete` command.
#[derive(Debug, Parser, Clone)]
pub struct DeleteArgs {
    /// The id of the movement to delete.
    id: i64,
}

impl DeleteArgs {
    pub fn id(&self) -> i64 {
        self.id
    }
}

fn default_balance_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("balance"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --data-dir or BALANCE_HOME instead of relying on the default \
                balance home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("balance")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
