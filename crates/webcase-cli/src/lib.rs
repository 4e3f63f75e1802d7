//! webcase CLI library
//!
//! Configuration, suite discovery, static validation and reporting for the
//! `webcase` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod discovery;
pub mod error;
pub mod report;
pub mod validate;

pub use cli::{Cli, Commands, Selection};
pub use commands::{run_suites, CommandDispatcher};
pub use config::{AppConfig, ConfigError};
pub use discovery::LoadedSuite;
pub use error::{CliError, Result};
pub use report::{Report, SuiteReport};
