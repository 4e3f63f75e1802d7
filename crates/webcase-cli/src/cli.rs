//! Command-line interface definitions and parsing

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "webcase", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Which suites and cases a command operates on
#[derive(Args, Debug, Clone, Default)]
pub struct Selection {
    /// Suite files or directories (defaults to the configured suites path)
    pub suites: Vec<PathBuf>,

    /// Only run the named case (repeatable)
    #[arg(long = "case", value_name = "NAME")]
    pub cases: Vec<String>,

    /// Keep suite files whose name, or cases whose name, contains this text
    #[arg(short, long, value_name = "SUBSTR")]
    pub keyword: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run test suites against a browser
    Run {
        #[command(flatten)]
        selection: Selection,

        /// Locator catalog YAML file
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,

        /// Browser to run in (repeatable; overrides the configuration)
        #[arg(long = "browser", value_name = "NAME")]
        browsers: Vec<String>,

        /// Show the browser window
        #[arg(long)]
        headed: bool,

        /// WebDriver endpoint
        #[arg(long, value_name = "URL")]
        webdriver_url: Option<String>,

        /// Write a JSON report to this file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,

        /// Re-run failed cases up to N times
        #[arg(long, default_value_t = 0, value_name = "N")]
        reruns: u32,
    },
    /// List suites and their expanded cases
    List {
        #[command(flatten)]
        selection: Selection,
    },
    /// Check suites against the catalog without a browser
    Validate {
        #[command(flatten)]
        selection: Selection,

        /// Locator catalog YAML file
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_arguments() {
        let cli = Cli::try_parse_from([
            "webcase",
            "-v",
            "run",
            "suites/login.yaml",
            "--case",
            "login_ok",
            "--case",
            "login_bad",
            "-k",
            "login",
            "--browser",
            "firefox",
            "--browser",
            "edge",
            "--headed",
            "--reruns",
            "2",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Run {
                selection,
                browsers,
                headed,
                reruns,
                report,
                ..
            } => {
                assert_eq!(selection.suites, vec![PathBuf::from("suites/login.yaml")]);
                assert_eq!(selection.cases, vec!["login_ok", "login_bad"]);
                assert_eq!(selection.keyword.as_deref(), Some("login"));
                assert_eq!(browsers, vec!["firefox", "edge"]);
                assert!(headed);
                assert_eq!(reruns, 2);
                assert!(report.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["webcase", "list", "-c", "ci.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("ci.toml")));
        assert!(matches!(cli.command, Commands::List { .. }));
    }
}
