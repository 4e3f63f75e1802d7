//! Command handlers for the webcase CLI

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{info, warn};
use webcase_core::{expand, Browser, CaseRunner, ExecutorConfig, LocatorCatalog, StepExecutor};
use webcase_webdriver::WebDriverBrowser;

use crate::cli::{Cli, Commands, Selection};
use crate::config::AppConfig;
use crate::discovery::LoadedSuite;
use crate::error::Result;
use crate::report::{Report, SuiteReport};
use crate::validate::validate_suite;

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command; `Ok(false)` means it ran but found failures
    pub async fn execute(cli: Cli, mut config: AppConfig) -> Result<bool> {
        match cli.command {
            Commands::Run {
                selection,
                catalog,
                browsers,
                headed,
                webdriver_url,
                report,
                reruns,
            } => {
                if !browsers.is_empty() {
                    config.browser.browsers = browsers;
                }
                if headed {
                    config.browser.headed = true;
                }
                if let Some(url) = webdriver_url {
                    config.browser.webdriver_url = url;
                }
                if catalog.is_some() {
                    config.paths.catalog = catalog;
                }
                config.validate()?;
                Self::handle_run_command(&config, &selection, report.as_deref(), reruns).await
            }
            Commands::List { selection } => Self::handle_list_command(&config, &selection),
            Commands::Validate { selection, catalog } => {
                if catalog.is_some() {
                    config.paths.catalog = catalog;
                }
                Self::handle_validate_command(&config, &selection)
            }
        }
    }

    /// Run the selected suites once per configured browser
    async fn handle_run_command(
        config: &AppConfig,
        selection: &Selection,
        report_path: Option<&Path>,
        reruns: u32,
    ) -> Result<bool> {
        let suites = selection.load(&config.paths.suites)?;
        let catalog = Arc::new(load_catalog(config.paths.catalog.as_deref())?);
        let executor_config = config.executor_config();

        let mut reports = Vec::new();
        for kind in config.browser_kinds()? {
            let session = Arc::new(
                WebDriverBrowser::connect(&config.browser.webdriver_url, config.session_options(kind)).await?,
            );
            let browser: Arc<dyn Browser> = session.clone();
            let runs = run_suites(browser, &catalog, &executor_config, &suites, reruns, &kind.to_string()).await;
            if let Err(e) = session.quit().await {
                warn!("Failed to quit {} session: {:#}", kind, e);
            }
            reports.extend(runs);
        }

        let report = Report::new(reports);
        println!();
        println!("{}", report.summary());
        if let Some(path) = report_path {
            report.write_json(path)?;
            info!("Report written to {}", path.display());
        }
        Ok(report.success)
    }

    /// Print suites and their expanded case names
    fn handle_list_command(config: &AppConfig, selection: &Selection) -> Result<bool> {
        for loaded in selection.load(&config.paths.suites)? {
            println!("{}", loaded.path.display());
            for (key, definition) in loaded.suite.iter() {
                match expand(key, definition) {
                    Ok(instances) => {
                        for instance in instances {
                            println!("  {}", instance.case_name);
                        }
                    }
                    Err(e) => println!("  {} (invalid: {})", key, e),
                }
            }
        }
        Ok(true)
    }

    /// Report every static problem in the selected suites
    fn handle_validate_command(config: &AppConfig, selection: &Selection) -> Result<bool> {
        let catalog = load_catalog(config.paths.catalog.as_deref())?;
        let suites = selection.load(&config.paths.suites)?;

        let mut total = 0;
        for loaded in &suites {
            let issues = validate_suite(&loaded.name, &loaded.suite, &catalog);
            for issue in &issues {
                println!("{}", issue);
            }
            total += issues.len();
        }

        println!("{} suite(s) checked, {} issue(s) found", suites.len(), total);
        Ok(total == 0)
    }
}

/// Load the locator catalog, or an empty one when none is configured
pub fn load_catalog(path: Option<&Path>) -> Result<LocatorCatalog> {
    match path {
        Some(path) => {
            info!("Loading locator catalog from: {}", path.display());
            Ok(LocatorCatalog::load(path)?)
        }
        None => Ok(LocatorCatalog::default()),
    }
}

/// Run every case of every suite against one browser.
///
/// Each suite gets its own runner so screenshot registries stay per suite.
/// Failed cases are re-run up to `reruns` times and only the last attempt is
/// kept.
pub async fn run_suites(
    browser: Arc<dyn Browser>,
    catalog: &Arc<LocatorCatalog>,
    config: &ExecutorConfig,
    suites: &[LoadedSuite],
    reruns: u32,
    browser_name: &str,
) -> Vec<SuiteReport> {
    let mut reports = Vec::with_capacity(suites.len());

    for loaded in suites {
        info!("Running {} in {}", loaded.path.display(), browser_name);
        let executor = StepExecutor::new(browser.clone(), catalog.clone()).with_config(config.clone());
        let mut runner = CaseRunner::new(executor);

        let mut cases = IndexMap::new();
        for name in loaded.suite.names() {
            let mut result = runner.execute_test_case(&loaded.suite, name).await;
            let mut attempt = 0;
            while !result.success && attempt < reruns {
                attempt += 1;
                warn!("Re-running {} (attempt {} of {})", name, attempt, reruns);
                result = runner.execute_test_case(&loaded.suite, name).await;
            }
            cases.insert(name.to_string(), result);
        }

        let report = SuiteReport {
            suite: loaded.name.clone(),
            path: loaded.path.clone(),
            browser: browser_name.to_string(),
            cases,
        };
        report.print();
        reports.push(report);
    }

    reports
}

