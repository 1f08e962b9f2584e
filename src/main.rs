use balance::args::{Args, Command, Common};
use balance::{commands, Config, Result, Settings};
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().data_dir().path();
    let settings = settings(args.common());

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Init => commands::init(home, settings).await?.print(),

        Command::Serve(serve_args) => {
            let config = Config::load(home, settings).await?;
            commands::serve(config, serve_args.bind()).await?.print()
        }

        Command::List => {
            let config = Config::load(home, settings).await?;
            commands::list(config).await?.print()
        }

        Command::Delete(delete_args) => {
            let config = Config::load(home, settings).await?;
            commands::delete(config, delete_args.id()).await?.print()
        }
    };
    Ok(())
}

fn settings(common: &Common) -> Settings {
    Settings::new(
        common.debug(),
        common.app(),
        common.secret_key().map(String::from),
        common.storage(),
    )
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
