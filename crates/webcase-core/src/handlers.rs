//! Action and assertion handlers
//!
//! One exhaustive match per vocabulary. Adding a step name means adding a
//! variant in `action.rs`, which the compiler then forces to be handled here.

use std::cmp::Ordering;
use std::path::Path;
use std::time::Duration;

use serde_yaml::Value;
use tracing::{debug, info};

use crate::action::{ActionKind, AssertionKind, Command, ExpectToken};
use crate::browser::{DialogResponse, ElementState, LoadState, MouseButton, SelectBy};
use crate::clock::poll_until;
use crate::error::StepError;
use crate::executor::{RunContext, StepExecutor};
use crate::screenshot::normalize_screenshot_path;
use crate::value::{as_millis, as_number, is_absent, non_empty_text, truthy, value_text};

const DEFAULT_WAIT_MS: u64 = 1000;
const DEFAULT_KEY: &str = "Enter";
const DEFAULT_ATTRIBUTE: &str = "class";
const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";
const SCROLL_TO_TOP: &str = "window.scrollTo(0, 0);";

/// Uniform handler input
pub(crate) struct HandlerArgs<'a> {
    pub step_num: usize,
    pub selector: Option<&'a str>,
    pub value: &'a Value,
    pub expected: &'a Value,
    pub timeout: Duration,
}

impl<'a> HandlerArgs<'a> {
    fn selector(&self, what: &str) -> Result<&'a str, StepError> {
        self.selector
            .ok_or_else(|| StepError::format(format!("'{}' requires a selector", what)))
    }

    fn value_text(&self) -> String {
        value_text(self.value)
    }

    /// An `expected` the step author wrote out; reads only check this
    fn explicit_expected(&self) -> Option<&'a Value> {
        (!is_absent(self.expected)).then_some(self.expected)
    }

    /// The value an assertion compares against: `expected`, else `value`
    fn comparison(&self) -> Option<&'a Value> {
        if !is_absent(self.expected) {
            Some(self.expected)
        } else if !is_absent(self.value) {
            Some(self.value)
        } else {
            None
        }
    }
}

/// Key pressed by a `press_key` step
pub(crate) fn press_key_name(args: &HandlerArgs<'_>) -> String {
    non_empty_text(args.value)
        .or_else(|| args.selector.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_KEY.to_string())
}

/// Element states the polling assertions wait for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expectation {
    Visible,
    Hidden,
    Enabled,
    Disabled,
    Checked,
    Unchecked,
}

impl Expectation {
    fn describe(&self) -> &'static str {
        match self {
            Expectation::Visible => "visible",
            Expectation::Hidden => "hidden",
            Expectation::Enabled => "enabled",
            Expectation::Disabled => "disabled",
            Expectation::Checked => "checked",
            Expectation::Unchecked => "unchecked",
        }
    }
}

impl StepExecutor {
    pub(crate) async fn dispatch(
        &self,
        command: Command,
        args: &HandlerArgs<'_>,
        ctx: &mut RunContext,
    ) -> Result<(), StepError> {
        match command {
            Command::Action(action) => self.run_action(action, args, ctx).await,
            Command::Assertion(assertion) => self.run_assertion(assertion, args).await,
        }
    }

    // ------------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------------

    async fn run_action(
        &self,
        action: ActionKind,
        args: &HandlerArgs<'_>,
        ctx: &mut RunContext,
    ) -> Result<(), StepError> {
        let browser = self.browser();
        let timeout = args.timeout;
        let name = action.as_str();

        match action {
            ActionKind::Navigate => {
                let target = args
                    .selector
                    .map(str::to_string)
                    .or_else(|| non_empty_text(args.value))
                    .ok_or_else(|| StepError::format("'navigate' requires a page name or URL"))?;
                let url = self.config().pages.get(&target).cloned().unwrap_or(target);
                info!("Navigating to {}", url);
                browser.navigate(&url, timeout).await?;
            }
            ActionKind::Click => browser.click(args.selector(name)?, MouseButton::Left, timeout).await?,
            ActionKind::RightClick => browser.click(args.selector(name)?, MouseButton::Right, timeout).await?,
            ActionKind::DoubleClick => browser.double_click(args.selector(name)?, timeout).await?,
            ActionKind::Hover => browser.hover(args.selector(name)?, timeout).await?,
            ActionKind::Input => browser.fill(args.selector(name)?, &args.value_text(), timeout).await?,
            ActionKind::ClearAndInput => {
                let selector = args.selector(name)?;
                browser.clear(selector, timeout).await?;
                browser.fill(selector, &args.value_text(), timeout).await?;
            }
            ActionKind::Select => {
                let option = args.value_text();
                browser
                    .select_option(args.selector(name)?, SelectBy::Value(&option), timeout)
                    .await?;
            }
            ActionKind::SelectOptionByLabel => {
                let label = args.value_text();
                browser
                    .select_option(args.selector(name)?, SelectBy::Label(&label), timeout)
                    .await?;
            }
            ActionKind::Check => browser.set_checked(args.selector(name)?, true, timeout).await?,
            ActionKind::Uncheck => browser.set_checked(args.selector(name)?, false, timeout).await?,
            ActionKind::Upload => {
                let file = non_empty_text(args.value)
                    .ok_or_else(|| StepError::format("'upload' requires a file path in 'value'"))?;
                browser
                    .set_input_files(args.selector(name)?, Path::new(&file), timeout)
                    .await?;
            }
            ActionKind::Wait => {
                let millis = wait_millis(args)?;
                debug!("Waiting {}ms", millis);
                self.clock().sleep(Duration::from_millis(millis)).await;
            }
            ActionKind::WaitForElement => {
                browser
                    .wait_for_selector(args.selector(name)?, ElementState::Visible, timeout)
                    .await?
            }
            ActionKind::WaitForElementHidden => {
                browser
                    .wait_for_selector(args.selector(name)?, ElementState::Hidden, timeout)
                    .await?
            }
            ActionKind::WaitForLoadState => {
                let state = non_empty_text(args.value).unwrap_or_else(|| "networkidle".to_string());
                let state: LoadState = state.parse().map_err(StepError::Format)?;
                browser.wait_for_load_state(state, timeout).await?;
            }
            ActionKind::WaitForNetworkIdle => browser.wait_for_load_state(LoadState::NetworkIdle, timeout).await?,
            ActionKind::ScrollToElement => browser.scroll_into_view(args.selector(name)?, timeout).await?,
            ActionKind::ScrollToBottom => {
                browser.evaluate(SCROLL_TO_BOTTOM, None, timeout).await?;
            }
            ActionKind::ScrollToTop => {
                browser.evaluate(SCROLL_TO_TOP, None, timeout).await?;
            }
            ActionKind::PressKey => browser.press_key(&press_key_name(args)).await?,
            ActionKind::PressEnter => browser.press_key("Enter").await?,
            ActionKind::PressTab => browser.press_key("Tab").await?,
            ActionKind::PressEscape => browser.press_key("Escape").await?,
            ActionKind::TypeText => browser.type_text(&args.value_text()).await?,
            ActionKind::RefreshPage => browser.reload().await?,
            ActionKind::GoBack => browser.go_back().await?,
            ActionKind::GoForward => browser.go_forward().await?,
            ActionKind::TakeScreenshot => self.take_screenshot(args, ctx).await?,
            ActionKind::ExecuteScript => {
                let script = non_empty_text(args.value)
                    .ok_or_else(|| StepError::format("'execute_script' requires a script in 'value'"))?;
                let outcome = browser.evaluate(&script, Some(args.selector(name)?), timeout).await?;
                debug!("Script returned {}", outcome);
            }
            ActionKind::AcceptDialog => browser.handle_dialogs(DialogResponse::Accept).await?,
            ActionKind::DismissDialog => browser.handle_dialogs(DialogResponse::Dismiss).await?,
            ActionKind::GetDialogText => {
                let text = browser.dialog_message().await?.unwrap_or_default();
                info!("Dialog text: {}", text);
                expect_read("dialog text", &text, args.explicit_expected())?;
            }
            ActionKind::GetText => {
                let selector = args.selector(name)?;
                let text = browser.text_content(selector, timeout).await?.unwrap_or_default();
                info!("Text of {}: {}", selector, text);
                expect_read(&format!("text of {}", selector), &text, args.explicit_expected())?;
            }
            ActionKind::GetAttribute => {
                let selector = args.selector(name)?;
                let attribute = non_empty_text(args.value)
                    .ok_or_else(|| StepError::format("'get_attribute' requires an attribute name in 'value'"))?;
                let actual = browser
                    .get_attribute(selector, &attribute, timeout)
                    .await?
                    .unwrap_or_default();
                info!("Attribute {} of {}: {}", attribute, selector, actual);
                expect_read(
                    &format!("attribute '{}' of {}", attribute, selector),
                    &actual,
                    args.explicit_expected(),
                )?;
            }
            ActionKind::GetValue => {
                let selector = args.selector(name)?;
                let actual = browser.input_value(selector, timeout).await?;
                info!("Value of {}: {}", selector, actual);
                expect_read(&format!("value of {}", selector), &actual, args.explicit_expected())?;
            }
            ActionKind::IsVisible => {
                let selector = args.selector(name)?;
                let visible = browser.is_visible(selector).await?;
                info!("{} visible: {}", selector, visible);
            }
            ActionKind::IsEnabled => {
                let selector = args.selector(name)?;
                let enabled = browser.is_enabled(selector).await?;
                info!("{} enabled: {}", selector, enabled);
            }
            ActionKind::GetPageTitle => {
                let title = browser.title().await?;
                info!("Page title: {}", title);
                expect_read("page title", &title, args.explicit_expected())?;
            }
            ActionKind::GetCurrentUrl => {
                let url = browser.url().await?;
                info!("Current URL: {}", url);
                expect_read("current URL", &url, args.explicit_expected())?;
            }
            ActionKind::Assert => self.run_expect(args).await?,
        }
        Ok(())
    }

    async fn take_screenshot(&self, args: &HandlerArgs<'_>, ctx: &mut RunContext) -> Result<(), StepError> {
        let requested = non_empty_text(args.value)
            .or_else(|| args.selector.map(str::to_string))
            .ok_or_else(|| StepError::format("'take_screenshot' requires a file name"))?;
        let path = normalize_screenshot_path(&self.config().artifacts_dir, &requested, &ctx.current_input);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StepError::Execution(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        info!("Saving screenshot to {}", path.display());
        self.browser().screenshot(&path).await?;
        let file_name = path.to_string_lossy().into_owned();
        ctx.screenshots.record(args.step_num, &file_name, path);
        Ok(())
    }

    /// `assert` steps: the expected-token picks the check
    async fn run_expect(&self, args: &HandlerArgs<'_>) -> Result<(), StepError> {
        let token_text = value_text(args.expected);
        let token = ExpectToken::from_token(&token_text).ok_or_else(|| StepError::Dispatch {
            kind: "expected token",
            name: token_text.clone(),
        })?;
        let selector = args.selector("assert")?;
        let browser = self.browser();

        match token {
            ExpectToken::Contains => {
                let needle = args.value_text();
                let actual = browser.text_content(selector, args.timeout).await?.unwrap_or_default();
                if !actual.contains(&needle) {
                    return Err(StepError::assertion(format!(
                        "text of {} does not contain '{}' (actual: '{}')",
                        selector, needle, actual
                    )));
                }
            }
            ExpectToken::Equals => {
                let wanted = args.value_text();
                let actual = browser.text_content(selector, args.timeout).await?.unwrap_or_default();
                if actual != wanted {
                    return Err(StepError::assertion(format!(
                        "text of {} is '{}', expected '{}'",
                        selector, actual, wanted
                    )));
                }
            }
            ExpectToken::Visible => self.expect_state(selector, Expectation::Visible, args.timeout).await?,
            ExpectToken::Hidden => self.expect_state(selector, Expectation::Hidden, args.timeout).await?,
            ExpectToken::Enabled => self.expect_state(selector, Expectation::Enabled, args.timeout).await?,
            ExpectToken::Disabled => self.expect_state(selector, Expectation::Disabled, args.timeout).await?,
            ExpectToken::Checked => self.expect_state(selector, Expectation::Checked, args.timeout).await?,
            ExpectToken::Unchecked => self.expect_state(selector, Expectation::Unchecked, args.timeout).await?,
            ExpectToken::AttributeContains => {
                self.expect_attribute(selector, DEFAULT_ATTRIBUTE, &args.value_text(), args.timeout)
                    .await?
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Assertions
    // ------------------------------------------------------------------------

    async fn run_assertion(&self, assertion: AssertionKind, args: &HandlerArgs<'_>) -> Result<(), StepError> {
        let name = assertion.as_str();
        let selector = if assertion.requires_element() {
            Some(args.selector(name)?)
        } else {
            args.selector
        };
        let timeout = args.timeout;
        let wanted = || value_text(args.comparison().unwrap_or(&Value::Null));

        match assertion {
            AssertionKind::ElementVisible => self.expect_state(require(selector)?, Expectation::Visible, timeout).await,
            AssertionKind::ElementHidden => self.expect_state(require(selector)?, Expectation::Hidden, timeout).await,
            AssertionKind::ElementEnabled => self.expect_state(require(selector)?, Expectation::Enabled, timeout).await,
            AssertionKind::ElementDisabled => self.expect_state(require(selector)?, Expectation::Disabled, timeout).await,
            AssertionKind::ElementChecked => self.expect_state(require(selector)?, Expectation::Checked, timeout).await,
            AssertionKind::ElementNotChecked => {
                self.expect_state(require(selector)?, Expectation::Unchecked, timeout).await
            }
            AssertionKind::TextContains => {
                let selector = require(selector)?;
                let needle = wanted();
                self.expect_text(selector, timeout, |text| text.contains(&needle), || {
                    format!("text of {} does not contain '{}'", selector, needle)
                })
                .await
            }
            AssertionKind::TextEquals => {
                let selector = require(selector)?;
                let target = wanted();
                self.expect_text(selector, timeout, |text| text.trim() == target.trim(), || {
                    format!("text of {} is not '{}'", selector, target)
                })
                .await
            }
            AssertionKind::ValueEquals => {
                let selector = require(selector)?;
                let target = wanted();
                let browser = self.browser();
                let ok = poll_until(self.clock(), timeout, self.config().poll_interval, || {
                    let target = target.clone();
                    async move {
                        browser
                            .input_value(selector, timeout)
                            .await
                            .map(|v| v == target)
                            .unwrap_or(false)
                    }
                })
                .await;
                ensure(ok, || format!("value of {} is not '{}'", selector, target))
            }
            AssertionKind::UrlContains => {
                let needle = wanted();
                let browser = self.browser();
                let ok = poll_until(self.clock(), timeout, self.config().poll_interval, || {
                    let needle = needle.clone();
                    async move { browser.url().await.map(|u| u.contains(&needle)).unwrap_or(false) }
                })
                .await;
                ensure(ok, || format!("URL does not contain '{}'", needle))
            }
            AssertionKind::TitleContains => {
                let needle = wanted();
                let browser = self.browser();
                let ok = poll_until(self.clock(), timeout, self.config().poll_interval, || {
                    let needle = needle.clone();
                    async move { browser.title().await.map(|t| t.contains(&needle)).unwrap_or(false) }
                })
                .await;
                ensure(ok, || format!("title does not contain '{}'", needle))
            }
            AssertionKind::Count => {
                let selector = require(selector)?;
                let wanted_count = args
                    .comparison()
                    .and_then(as_number)
                    .filter(|n| *n >= 0.0 && n.fract() == 0.0)
                    .map(|n| n as usize)
                    .ok_or_else(|| StepError::format("'assert_count' requires a whole number in 'expected'"))?;
                let browser = self.browser();
                let ok = poll_until(self.clock(), timeout, self.config().poll_interval, || async move {
                    browser.count(selector).await.map(|c| c == wanted_count).unwrap_or(false)
                })
                .await;
                ensure(ok, || format!("{} does not match {} elements", selector, wanted_count))
            }
            AssertionKind::AttributeInclude => {
                let (attribute, substring) = attribute_and_substring(args);
                self.expect_attribute(require(selector)?, &attribute, &substring, timeout).await
            }
            AssertionKind::Equal | AssertionKind::NotEqual => {
                let actual = self.actual_value(selector, args).await?;
                let equal = value_text(&actual) == value_text(args.expected);
                let want_equal = assertion == AssertionKind::Equal;
                ensure(equal == want_equal, || {
                    format!(
                        "'{}' {} '{}'",
                        value_text(&actual),
                        if want_equal { "!=" } else { "==" },
                        value_text(args.expected)
                    )
                })
            }
            AssertionKind::True | AssertionKind::False => {
                let actual = match selector {
                    Some(selector) => self.browser().is_visible(selector).await?,
                    None => truthy(args.value),
                };
                let want = assertion == AssertionKind::True;
                ensure(actual == want, || {
                    format!("expected {}, got {}", want, actual)
                })
            }
            AssertionKind::In | AssertionKind::NotIn => {
                let actual = self.actual_value(selector, args).await?;
                let member = contains_member(args.expected, &actual);
                let want_member = assertion == AssertionKind::In;
                ensure(member == want_member, || {
                    format!(
                        "'{}' is {}in '{}'",
                        value_text(&actual),
                        if want_member { "not " } else { "" },
                        value_text(args.expected)
                    )
                })
            }
            AssertionKind::IsNone | AssertionKind::IsNotNone => {
                let actual = self.actual_value(selector, args).await?;
                let none = matches!(actual, Value::Null);
                let want_none = assertion == AssertionKind::IsNone;
                ensure(none == want_none, || {
                    if want_none {
                        format!("expected nothing, got '{}'", value_text(&actual))
                    } else {
                        "expected a value, got nothing".to_string()
                    }
                })
            }
            AssertionKind::Greater | AssertionKind::Less => {
                let actual = self.actual_value(selector, args).await?;
                let ordering = compare_values(&actual, args.expected);
                let want = if assertion == AssertionKind::Greater {
                    Ordering::Greater
                } else {
                    Ordering::Less
                };
                ensure(ordering == Some(want), || {
                    format!(
                        "'{}' is not {} '{}'",
                        value_text(&actual),
                        if want == Ordering::Greater { "greater than" } else { "less than" },
                        value_text(args.expected)
                    )
                })
            }
        }
    }

    /// Value assertions read the element's text when a selector is given
    async fn actual_value(&self, selector: Option<&str>, args: &HandlerArgs<'_>) -> Result<Value, StepError> {
        match selector {
            Some(selector) => Ok(self
                .browser()
                .text_content(selector, args.timeout)
                .await?
                .map(Value::from)
                .unwrap_or(Value::Null)),
            None => Ok(args.value.clone()),
        }
    }

    async fn expect_state(&self, selector: &str, expectation: Expectation, timeout: Duration) -> Result<(), StepError> {
        let browser = self.browser();
        let ok = poll_until(self.clock(), timeout, self.config().poll_interval, || async move {
            let probe = match expectation {
                Expectation::Visible => browser.is_visible(selector).await,
                Expectation::Hidden => browser.is_visible(selector).await.map(|v| !v),
                Expectation::Enabled => browser.is_enabled(selector).await,
                Expectation::Disabled => browser.is_enabled(selector).await.map(|e| !e),
                Expectation::Checked => browser.is_checked(selector).await,
                Expectation::Unchecked => browser.is_checked(selector).await.map(|c| !c),
            };
            probe.unwrap_or(false)
        })
        .await;
        ensure(ok, || {
            format!(
                "{} is not {} after {}ms",
                selector,
                expectation.describe(),
                timeout.as_millis()
            )
        })
    }

    async fn expect_text<P, M>(&self, selector: &str, timeout: Duration, predicate: P, message: M) -> Result<(), StepError>
    where
        P: Fn(&str) -> bool,
        M: FnOnce() -> String,
    {
        let browser = self.browser();
        let predicate = &predicate;
        let ok = poll_until(self.clock(), timeout, self.config().poll_interval, || async move {
            match browser.text_content(selector, timeout).await {
                Ok(text) => predicate(text.as_deref().unwrap_or("")),
                Err(_) => false,
            }
        })
        .await;
        ensure(ok, message)
    }

    async fn expect_attribute(
        &self,
        selector: &str,
        attribute: &str,
        substring: &str,
        timeout: Duration,
    ) -> Result<(), StepError> {
        let browser = self.browser();
        let ok = poll_until(self.clock(), timeout, self.config().poll_interval, || async move {
            browser
                .get_attribute(selector, attribute, timeout)
                .await
                .ok()
                .flatten()
                .map(|actual| actual.contains(substring))
                .unwrap_or(false)
        })
        .await;
        ensure(ok, || {
            format!(
                "attribute '{}' of {} does not contain '{}'",
                attribute, selector, substring
            )
        })
    }
}

fn require(selector: Option<&str>) -> Result<&str, StepError> {
    selector.ok_or_else(|| StepError::format("assertion requires a selector"))
}

fn ensure(ok: bool, message: impl FnOnce() -> String) -> Result<(), StepError> {
    if ok {
        Ok(())
    } else {
        Err(StepError::Assertion(message()))
    }
}

fn expect_read(what: &str, actual: &str, expected: Option<&Value>) -> Result<(), StepError> {
    match expected {
        Some(expected) => {
            let expected = value_text(expected);
            ensure(actual == expected, || {
                format!("{} is '{}', expected '{}'", what, actual, expected)
            })
        }
        None => Ok(()),
    }
}

fn wait_millis(args: &HandlerArgs<'_>) -> Result<u64, StepError> {
    if !is_absent(args.value) {
        return as_millis(args.value).ok_or_else(|| {
            StepError::format(format!(
                "'wait' needs a duration in milliseconds, got '{}'",
                value_text(args.value)
            ))
        });
    }
    Ok(args
        .selector
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_WAIT_MS))
}

/// `attribute_include` accepts `expected` as the attribute name with the
/// substring in `value`; with only one of them given it checks `class`.
fn attribute_and_substring(args: &HandlerArgs<'_>) -> (String, String) {
    match (non_empty_text(args.expected), non_empty_text(args.value)) {
        (Some(attribute), Some(substring)) => (attribute, substring),
        (Some(substring), None) => (DEFAULT_ATTRIBUTE.to_string(), substring),
        (None, value) => (DEFAULT_ATTRIBUTE.to_string(), value.unwrap_or_default()),
    }
}

fn contains_member(container: &Value, member: &Value) -> bool {
    let member_text = value_text(member);
    match container {
        Value::Sequence(items) => items.iter().any(|item| value_text(item) == member_text),
        Value::Mapping(map) => map.keys().any(|key| value_text(key) == member_text),
        Value::Null => false,
        other => value_text(other).contains(&member_text),
    }
}

fn compare_values(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (as_number(actual), as_number(expected)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => {
            if matches!(actual, Value::Null) || matches!(expected, Value::Null) {
                None
            } else {
                Some(value_text(actual).cmp(&value_text(expected)))
            }
        }
    }
}
