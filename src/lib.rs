pub mod args;
pub mod commands;
mod config;
mod db;
mod error;
pub mod model;
pub mod store;
mod utils;
pub mod web;

pub use config::{Config, SecretKey, Settings, Storage};
pub use db::{Field, Row};
pub use error::Error;
pub use error::Result;
pub use model::{Movement, MovementType};
