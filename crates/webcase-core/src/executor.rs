//! Step execution
//!
//! [`StepExecutor::execute`] never fails: every error is folded into the
//! returned [`StepResult`] together with the time spent. Settle policies run
//! around dispatch here, not inside individual handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde_yaml::Value;
use tracing::{error, info};

use crate::action::{ActionKind, Command, ExpectToken};
use crate::browser::Browser;
use crate::catalog::LocatorCatalog;
use crate::clock::{as_millis_f64, StepClock, SystemClock};
use crate::error::StepError;
use crate::handlers::{press_key_name, HandlerArgs};
use crate::normalize::{normalize, NormalizedStep};
use crate::result::StepResult;
use crate::screenshot::ScreenshotRegistry;
use crate::settle::SettlePolicy;
use crate::value::{non_empty_text, value_text};

// ----------------------------------------------------------------------------
// Configuration and Context
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Default timeout for actions and reads
    pub action_timeout: Duration,
    /// Default timeout for assertions that poll the page
    pub assertion_timeout: Duration,
    /// Interval between polls of an element's state
    pub poll_interval: Duration,
    /// Root for screenshots and other artifacts
    pub artifacts_dir: PathBuf,
    /// Page names usable with `navigate`
    pub pages: IndexMap<String, String>,
    pub settle: SettlePolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            action_timeout: Duration::from_millis(30_000),
            assertion_timeout: Duration::from_millis(5_000),
            poll_interval: Duration::from_millis(100),
            artifacts_dir: PathBuf::from("test-results"),
            pages: IndexMap::new(),
            settle: SettlePolicy::default(),
        }
    }
}

/// Mutable state shared by the steps of one runner
#[derive(Debug, Default)]
pub struct RunContext {
    pub screenshots: ScreenshotRegistry,
    /// Input value of the case instance being run
    pub current_input: String,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }
}

// ----------------------------------------------------------------------------
// Step Executor
// ----------------------------------------------------------------------------

pub struct StepExecutor {
    browser: Arc<dyn Browser>,
    catalog: Arc<LocatorCatalog>,
    clock: Arc<dyn StepClock>,
    config: ExecutorConfig,
}

impl StepExecutor {
    pub fn new(browser: Arc<dyn Browser>, catalog: Arc<LocatorCatalog>) -> Self {
        Self {
            browser,
            catalog,
            clock: Arc::new(SystemClock::new()),
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn StepClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn catalog(&self) -> &LocatorCatalog {
        &self.catalog
    }

    pub(crate) fn browser(&self) -> &dyn Browser {
        self.browser.as_ref()
    }

    pub fn clock(&self) -> &dyn StepClock {
        self.clock.as_ref()
    }

    /// Normalize and execute one raw step record
    pub async fn execute_raw(&self, raw: &Value, step_num: usize, ctx: &mut RunContext) -> StepResult {
        match normalize(raw) {
            Ok(step) => self.execute(&step, step_num, ctx).await,
            Err(err) => {
                let action = raw_action_name(raw);
                error!("Step {} ({}) is malformed: {}", step_num, action, err);
                let mut result = StepResult {
                    step_num,
                    description: format!("Step {}: {}", step_num, action),
                    action,
                    selector: None,
                    value: Value::Null,
                    expected: Value::Null,
                    success: true,
                    error_message: String::new(),
                    error_kind: None,
                    duration_ms: 0.0,
                };
                result.fail_with(&err);
                result
            }
        }
    }

    pub async fn execute(&self, step: &NormalizedStep, step_num: usize, ctx: &mut RunContext) -> StepResult {
        let start = self.clock.now();
        let mut result = StepResult {
            step_num,
            action: step.action.clone(),
            selector: None,
            value: step.value.clone(),
            expected: step.expected.clone(),
            description: step
                .description
                .clone()
                .unwrap_or_else(|| format!("Step {}: {}", step_num, step.action)),
            success: true,
            error_message: String::new(),
            error_kind: None,
            duration_ms: 0.0,
        };

        let outcome = self.run_step(step, step_num, ctx, &mut result).await;
        result.duration_ms = as_millis_f64(self.clock.elapsed_since(start));

        match outcome {
            Ok(()) => info!("Step {} passed ({:.0}ms)", step_num, result.duration_ms),
            Err(err) => {
                error!("Step {} failed: {}", step_num, err);
                result.fail_with(&err);
            }
        }
        result
    }

    async fn run_step(
        &self,
        step: &NormalizedStep,
        step_num: usize,
        ctx: &mut RunContext,
        result: &mut StepResult,
    ) -> Result<(), StepError> {
        let command = Command::lookup(&step.action)?;

        let selector = match step.selector.as_deref() {
            Some(expression) => Some(self.catalog.resolve(expression)?),
            None => None,
        }
        .filter(|s| !s.is_empty());
        result.selector = selector.clone();

        if step.description.is_none() {
            result.description = describe_step(command, selector.as_deref(), &step.value, &step.expected, step_num);
        }
        info!("{}", result.description);

        if command.requires_selector() && selector.is_none() {
            return Err(StepError::format(format!(
                "action '{}' requires a selector",
                command
            )));
        }

        let timeout = step.timeout.unwrap_or(if command.is_assertion() {
            self.config.assertion_timeout
        } else {
            self.config.action_timeout
        });
        let args = HandlerArgs {
            step_num,
            selector: selector.as_deref(),
            value: &step.value,
            expected: &step.expected,
            timeout,
        };

        self.before_dispatch(command, &args).await;
        self.dispatch(command, &args, ctx).await?;
        self.after_dispatch(command, &args).await;
        Ok(())
    }

    async fn before_dispatch(&self, command: Command, args: &HandlerArgs<'_>) {
        if command != Command::Action(ActionKind::Assert) {
            return;
        }
        let (Some(selector), Some(token)) = (args.selector, args.expected.as_str().and_then(ExpectToken::from_token)) else {
            return;
        };
        if !token.compares_text() {
            return;
        }
        let expected = match token {
            ExpectToken::Contains => non_empty_text(args.value),
            _ => None,
        };
        self.config
            .settle
            .stabilize_before_assert(self.browser(), self.clock(), selector, expected.as_deref())
            .await;
    }

    async fn after_dispatch(&self, command: Command, args: &HandlerArgs<'_>) {
        match command {
            Command::Action(ActionKind::Input) => {
                self.config.settle.after_input_settle(self.clock()).await;
            }
            Command::Action(ActionKind::PressEnter) => {
                self.config.settle.after_submit_settle(self.browser(), self.clock()).await;
            }
            Command::Action(ActionKind::PressKey) if press_key_name(args).eq_ignore_ascii_case("enter") => {
                self.config.settle.after_submit_settle(self.browser(), self.clock()).await;
            }
            _ => {}
        }
    }
}

fn raw_action_name(raw: &Value) -> String {
    let Some(record) = raw.as_mapping() else {
        return String::new();
    };
    if let Some(action) = record.get("action").and_then(Value::as_str) {
        return action.to_string();
    }
    record
        .keys()
        .next()
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Human-readable description of a step for logs and reports
pub fn describe_step(
    command: Command,
    selector: Option<&str>,
    value: &Value,
    expected: &Value,
    step_num: usize,
) -> String {
    let sel = selector.unwrap_or("");
    let val = value_text(value);
    let body = match command {
        Command::Action(action) => match action {
            ActionKind::Navigate => format!("navigate to {}", selector.unwrap_or("page")),
            ActionKind::Click => format!("click {}", sel),
            ActionKind::Hover => format!("hover over {}", sel),
            ActionKind::Input => format!("input '{}' into {}", val, sel),
            ActionKind::ClearAndInput => format!("clear {} and input '{}'", sel, val),
            ActionKind::Select => format!("select option '{}' in {}", val, sel),
            ActionKind::SelectOptionByLabel => format!("select option labelled '{}' in {}", val, sel),
            ActionKind::Check => format!("check {}", sel),
            ActionKind::Uncheck => format!("uncheck {}", sel),
            ActionKind::Upload => format!("upload '{}' to {}", val, sel),
            ActionKind::DoubleClick => format!("double-click {}", sel),
            ActionKind::RightClick => format!("right-click {}", sel),
            ActionKind::Wait => format!("wait {}ms", if val.is_empty() { "1000".to_string() } else { val }),
            ActionKind::WaitForElement => format!("wait for {} to appear", sel),
            ActionKind::WaitForElementHidden => format!("wait for {} to disappear", sel),
            ActionKind::WaitForLoadState => format!(
                "wait for load state '{}'",
                if val.is_empty() { "networkidle".to_string() } else { val }
            ),
            ActionKind::WaitForNetworkIdle => "wait for network idle".to_string(),
            ActionKind::ScrollToElement => format!("scroll to {}", sel),
            ActionKind::ScrollToBottom => "scroll to bottom".to_string(),
            ActionKind::ScrollToTop => "scroll to top".to_string(),
            ActionKind::PressKey => format!("press {}", if val.is_empty() { "Enter".to_string() } else { val }),
            ActionKind::PressEnter => "press Enter".to_string(),
            ActionKind::PressTab => "press Tab".to_string(),
            ActionKind::PressEscape => "press Escape".to_string(),
            ActionKind::TypeText => format!("type '{}'", val),
            ActionKind::RefreshPage => "refresh page".to_string(),
            ActionKind::GoBack => "go back".to_string(),
            ActionKind::GoForward => "go forward".to_string(),
            ActionKind::TakeScreenshot => format!(
                "take screenshot {}",
                if val.is_empty() { sel.to_string() } else { val }
            ),
            ActionKind::ExecuteScript => format!("execute script on {}", sel),
            ActionKind::AcceptDialog => "accept dialogs".to_string(),
            ActionKind::DismissDialog => "dismiss dialogs".to_string(),
            ActionKind::GetDialogText => "read dialog text".to_string(),
            ActionKind::GetText => format!("read text of {}", sel),
            ActionKind::GetAttribute => format!("read attribute '{}' of {}", val, sel),
            ActionKind::GetValue => format!("read value of {}", sel),
            ActionKind::IsVisible => format!("check {} is visible", sel),
            ActionKind::IsEnabled => format!("check {} is enabled", sel),
            ActionKind::GetPageTitle => "read page title".to_string(),
            ActionKind::GetCurrentUrl => "read current URL".to_string(),
            ActionKind::Assert => format!("assert {} {} {}", sel, value_text(expected), val)
                .trim_end()
                .to_string(),
        },
        Command::Assertion(assertion) => match selector {
            Some(sel) => format!("{} on {}", assertion, sel),
            None => assertion.to_string(),
        },
    };
    format!("Step {}: {}", step_num, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_steps() {
        let click = describe_step(
            Command::Action(ActionKind::Click),
            Some("#login"),
            &Value::Null,
            &Value::Null,
            3,
        );
        assert_eq!(click, "Step 3: click #login");

        let wait = describe_step(Command::Action(ActionKind::Wait), None, &Value::Null, &Value::Null, 1);
        assert_eq!(wait, "Step 1: wait 1000ms");

        let assert = describe_step(
            Command::Action(ActionKind::Assert),
            Some("#msg"),
            &Value::from("Saved"),
            &Value::from("contains"),
            7,
        );
        assert_eq!(assert, "Step 7: assert #msg contains Saved");
    }

    #[test]
    fn test_raw_action_name() {
        let raw: Value = serde_yaml::from_str("click: ''").unwrap();
        assert_eq!(raw_action_name(&raw), "click");
        let raw: Value = serde_yaml::from_str("action: hover").unwrap();
        assert_eq!(raw_action_name(&raw), "hover");
        assert_eq!(raw_action_name(&Value::from("oops")), "");
    }

    #[test]
    fn test_default_config() {
        let config = ExecutorConfig::default();
        assert_eq!(config.action_timeout, Duration::from_secs(30));
        assert_eq!(config.assertion_timeout, Duration::from_secs(5));
        assert_eq!(config.artifacts_dir, PathBuf::from("test-results"));
    }
}
