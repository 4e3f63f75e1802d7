#![doc = "webcase Harness\n\nA scripted, in-memory [`Browser`] for exercising the interpreter: tests seed\nelements, inject failures and then inspect the calls the interpreter made."]

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;
use webcase_core::{
    Browser, BrowserError, BrowserResult, DialogResponse, ElementState, LoadState, MouseButton,
    SelectBy,
};

/// Bytes written for every fake screenshot (a PNG signature)
pub const FAKE_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

// ----------------------------------------------------------------------------
// Scripted Elements
// ----------------------------------------------------------------------------

/// One element as the fake page exposes it
#[derive(Debug, Clone, PartialEq)]
pub struct FakeElement {
    pub text: Option<String>,
    pub value: String,
    pub visible: bool,
    pub enabled: bool,
    pub checked: bool,
    pub attributes: HashMap<String, String>,
    /// Number of matches reported by `count`
    pub count: usize,
    /// Texts returned by successive reads; the last one repeats
    pub text_sequence: VecDeque<String>,
}

impl Default for FakeElement {
    fn default() -> Self {
        Self {
            text: None,
            value: String::new(),
            visible: true,
            enabled: true,
            checked: false,
            attributes: HashMap::new(),
            count: 1,
            text_sequence: VecDeque::new(),
        }
    }
}

impl FakeElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Text changes on every read until the sequence is exhausted
    pub fn with_text_sequence<I, S>(mut self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text_sequence = texts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn checked(mut self) -> Self {
        self.checked = true;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    fn read_text(&mut self) -> Option<String> {
        match self.text_sequence.len() {
            0 => self.text.clone(),
            1 => self.text_sequence.front().cloned(),
            _ => self.text_sequence.pop_front(),
        }
    }
}

// ----------------------------------------------------------------------------
// Call Log
// ----------------------------------------------------------------------------

/// A browser operation as the interpreter issued it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserCall {
    pub operation: &'static str,
    /// Selector, URL, key or script the operation targeted
    pub target: String,
}

impl fmt::Display for BrowserCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.target.is_empty() {
            f.write_str(self.operation)
        } else {
            write!(f, "{} {}", self.operation, self.target)
        }
    }
}

#[derive(Debug, Default)]
struct PageState {
    elements: HashMap<String, FakeElement>,
    calls: Vec<BrowserCall>,
    failures: HashMap<&'static str, String>,
    panic_on: Option<&'static str>,
    title: String,
    url: String,
    back: Vec<String>,
    forward: Vec<String>,
    network_idle_fails: bool,
    dialog_message: Option<String>,
    dialog_response: Option<DialogResponse>,
    uploads: Vec<(String, PathBuf)>,
}

// ----------------------------------------------------------------------------
// Fake Browser
// ----------------------------------------------------------------------------

/// In-memory [`Browser`] driven entirely by what the test seeds
#[derive(Debug, Default)]
pub struct FakeBrowser {
    state: Mutex<PageState>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add or replace an element
    pub fn with_element(self, selector: impl Into<String>, element: FakeElement) -> Self {
        self.set_element(selector, element);
        self
    }

    pub fn set_element(&self, selector: impl Into<String>, element: FakeElement) {
        self.lock().elements.insert(selector.into(), element);
    }

    pub fn remove_element(&self, selector: &str) {
        self.lock().elements.remove(selector);
    }

    pub fn element(&self, selector: &str) -> Option<FakeElement> {
        self.lock().elements.get(selector).cloned()
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        self.lock().title = title.into();
        self
    }

    pub fn with_url(self, url: impl Into<String>) -> Self {
        self.lock().url = url.into();
        self
    }

    pub fn with_dialog(self, message: impl Into<String>) -> Self {
        self.lock().dialog_message = Some(message.into());
        self
    }

    /// Every call to `operation` fails with `reason`
    pub fn fail_on(&self, operation: &'static str, reason: impl Into<String>) {
        self.lock().failures.insert(operation, reason.into());
    }

    /// Every call to `operation` panics
    pub fn panic_on(&self, operation: &'static str) {
        self.lock().panic_on = Some(operation);
    }

    pub fn set_network_idle_fails(&self, fails: bool) {
        self.lock().network_idle_fails = fails;
    }

    pub fn calls(&self) -> Vec<BrowserCall> {
        self.lock().calls.clone()
    }

    /// Operation names in call order
    pub fn operations(&self) -> Vec<&'static str> {
        self.lock().calls.iter().map(|call| call.operation).collect()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    pub fn has_call(&self, operation: &str, target: &str) -> bool {
        self.lock()
            .calls
            .iter()
            .any(|call| call.operation == operation && call.target == target)
    }

    /// Element-touching calls only (everything except waits and reads of page state)
    pub fn element_calls(&self) -> Vec<BrowserCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| !matches!(call.operation, "wait_for_load_state" | "title" | "url"))
            .cloned()
            .collect()
    }

    pub fn dialog_response(&self) -> Option<DialogResponse> {
        self.lock().dialog_response
    }

    pub fn uploads(&self) -> Vec<(String, PathBuf)> {
        self.lock().uploads.clone()
    }

    pub fn current_url(&self) -> String {
        self.lock().url.clone()
    }

    /// Log the call, then apply injected panics and failures
    fn begin(&self, operation: &'static str, target: impl Into<String>) -> BrowserResult<MutexGuard<'_, PageState>> {
        let target = target.into();
        trace!("fake browser: {} {}", operation, target);
        let mut state = self.lock();
        state.calls.push(BrowserCall { operation, target });
        if state.panic_on == Some(operation) {
            drop(state);
            panic!("fake browser asked to panic on {}", operation);
        }
        if let Some(reason) = state.failures.get(operation) {
            return Err(BrowserError::command(operation, reason));
        }
        Ok(state)
    }
}

fn element_mut<'a>(state: &'a mut PageState, selector: &str) -> BrowserResult<&'a mut FakeElement> {
    state
        .elements
        .get_mut(selector)
        .ok_or_else(|| BrowserError::NotFound(selector.to_string()))
}

/// Interactions need an element that is attached and visible
fn interactable<'a>(
    state: &'a mut PageState,
    selector: &str,
    timeout: Duration,
) -> BrowserResult<&'a mut FakeElement> {
    let element = element_mut(state, selector)?;
    if element.visible {
        Ok(element)
    } else {
        Err(BrowserError::timeout(format!("{} to be visible", selector), timeout))
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn navigate(&self, url: &str, _timeout: Duration) -> BrowserResult<()> {
        let mut state = self.begin("navigate", url)?;
        let previous = std::mem::replace(&mut state.url, url.to_string());
        if !previous.is_empty() {
            state.back.push(previous);
        }
        state.forward.clear();
        Ok(())
    }

    async fn click(&self, selector: &str, button: MouseButton, timeout: Duration) -> BrowserResult<()> {
        let operation = match button {
            MouseButton::Left => "click",
            MouseButton::Right => "right_click",
        };
        let mut state = self.begin(operation, selector)?;
        interactable(&mut state, selector, timeout).map(|_| ())
    }

    async fn double_click(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        let mut state = self.begin("double_click", selector)?;
        interactable(&mut state, selector, timeout).map(|_| ())
    }

    async fn hover(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        let mut state = self.begin("hover", selector)?;
        interactable(&mut state, selector, timeout).map(|_| ())
    }

    async fn fill(&self, selector: &str, text: &str, timeout: Duration) -> BrowserResult<()> {
        let mut state = self.begin("fill", selector)?;
        interactable(&mut state, selector, timeout)?.value = text.to_string();
        Ok(())
    }

    async fn clear(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        let mut state = self.begin("clear", selector)?;
        interactable(&mut state, selector, timeout)?.value.clear();
        Ok(())
    }

    async fn select_option(&self, selector: &str, option: SelectBy<'_>, timeout: Duration) -> BrowserResult<()> {
        let mut state = self.begin("select_option", selector)?;
        let element = interactable(&mut state, selector, timeout)?;
        element.value = match option {
            SelectBy::Value(value) | SelectBy::Label(value) => value.to_string(),
        };
        Ok(())
    }

    async fn set_checked(&self, selector: &str, checked: bool, timeout: Duration) -> BrowserResult<()> {
        let mut state = self.begin("set_checked", selector)?;
        interactable(&mut state, selector, timeout)?.checked = checked;
        Ok(())
    }

    async fn set_input_files(&self, selector: &str, file: &Path, _timeout: Duration) -> BrowserResult<()> {
        let mut state = self.begin("set_input_files", selector)?;
        element_mut(&mut state, selector)?;
        state.uploads.push((selector.to_string(), file.to_path_buf()));
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, element_state: ElementState, timeout: Duration) -> BrowserResult<()> {
        let state = self.begin("wait_for_selector", selector)?;
        let element = state.elements.get(selector);
        let satisfied = match element_state {
            ElementState::Attached => element.is_some(),
            ElementState::Detached => element.is_none(),
            ElementState::Visible => element.map(|e| e.visible).unwrap_or(false),
            ElementState::Hidden => element.map(|e| !e.visible).unwrap_or(true),
        };
        if satisfied {
            Ok(())
        } else {
            Err(BrowserError::timeout(format!("{} to be {:?}", selector, element_state), timeout))
        }
    }

    async fn wait_for_load_state(&self, load_state: LoadState, timeout: Duration) -> BrowserResult<()> {
        let state = self.begin("wait_for_load_state", format!("{:?}", load_state))?;
        if load_state == LoadState::NetworkIdle && state.network_idle_fails {
            return Err(BrowserError::timeout("network idle", timeout));
        }
        Ok(())
    }

    async fn press_key(&self, key: &str) -> BrowserResult<()> {
        self.begin("press_key", key).map(|_| ())
    }

    async fn type_text(&self, text: &str) -> BrowserResult<()> {
        self.begin("type_text", text).map(|_| ())
    }

    async fn evaluate(&self, script: &str, selector: Option<&str>, _timeout: Duration) -> BrowserResult<serde_json::Value> {
        let mut state = self.begin("evaluate", script)?;
        if let Some(selector) = selector {
            element_mut(&mut state, selector)?;
        }
        Ok(serde_json::Value::Null)
    }

    async fn scroll_into_view(&self, selector: &str, _timeout: Duration) -> BrowserResult<()> {
        let mut state = self.begin("scroll_into_view", selector)?;
        element_mut(&mut state, selector).map(|_| ())
    }

    async fn text_content(&self, selector: &str, _timeout: Duration) -> BrowserResult<Option<String>> {
        let mut state = self.begin("text_content", selector)?;
        Ok(element_mut(&mut state, selector)?.read_text())
    }

    async fn get_attribute(&self, selector: &str, name: &str, _timeout: Duration) -> BrowserResult<Option<String>> {
        let mut state = self.begin("get_attribute", selector)?;
        Ok(element_mut(&mut state, selector)?.attributes.get(name).cloned())
    }

    async fn input_value(&self, selector: &str, _timeout: Duration) -> BrowserResult<String> {
        let mut state = self.begin("input_value", selector)?;
        Ok(element_mut(&mut state, selector)?.value.clone())
    }

    async fn is_visible(&self, selector: &str) -> BrowserResult<bool> {
        let state = self.begin("is_visible", selector)?;
        Ok(state.elements.get(selector).map(|e| e.visible).unwrap_or(false))
    }

    async fn is_enabled(&self, selector: &str) -> BrowserResult<bool> {
        let mut state = self.begin("is_enabled", selector)?;
        Ok(element_mut(&mut state, selector)?.enabled)
    }

    async fn is_checked(&self, selector: &str) -> BrowserResult<bool> {
        let mut state = self.begin("is_checked", selector)?;
        Ok(element_mut(&mut state, selector)?.checked)
    }

    async fn count(&self, selector: &str) -> BrowserResult<usize> {
        let state = self.begin("count", selector)?;
        Ok(state.elements.get(selector).map(|e| e.count).unwrap_or(0))
    }

    async fn screenshot(&self, path: &Path) -> BrowserResult<()> {
        drop(self.begin("screenshot", path.display().to_string())?);
        std::fs::write(path, FAKE_PNG)?;
        Ok(())
    }

    async fn go_back(&self) -> BrowserResult<()> {
        let mut state = self.begin("go_back", "")?;
        if let Some(previous) = state.back.pop() {
            let current = std::mem::replace(&mut state.url, previous);
            state.forward.push(current);
        }
        Ok(())
    }

    async fn go_forward(&self) -> BrowserResult<()> {
        let mut state = self.begin("go_forward", "")?;
        if let Some(next) = state.forward.pop() {
            let current = std::mem::replace(&mut state.url, next);
            state.back.push(current);
        }
        Ok(())
    }

    async fn reload(&self) -> BrowserResult<()> {
        self.begin("reload", "").map(|_| ())
    }

    async fn title(&self) -> BrowserResult<String> {
        Ok(self.begin("title", "")?.title.clone())
    }

    async fn url(&self) -> BrowserResult<String> {
        Ok(self.begin("url", "")?.url.clone())
    }

    async fn handle_dialogs(&self, response: DialogResponse) -> BrowserResult<()> {
        let mut state = self.begin("handle_dialogs", format!("{:?}", response))?;
        state.dialog_response = Some(response);
        Ok(())
    }

    async fn dialog_message(&self) -> BrowserResult<Option<String>> {
        Ok(self.begin("dialog_message", "")?.dialog_message.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn test_fill_and_read_back() {
        let browser = FakeBrowser::new().with_element("#name", FakeElement::new());
        browser.fill("#name", "alice", T).await.unwrap();
        assert_eq!(browser.input_value("#name", T).await.unwrap(), "alice");
        browser.clear("#name", T).await.unwrap();
        assert_eq!(browser.input_value("#name", T).await.unwrap(), "");
        assert_eq!(browser.operations(), vec!["fill", "input_value", "clear", "input_value"]);
    }

    #[tokio::test]
    async fn test_missing_and_hidden_elements() {
        let browser = FakeBrowser::new().with_element("#ghost", FakeElement::new().hidden());
        assert!(matches!(
            browser.click("#nope", MouseButton::Left, T).await,
            Err(BrowserError::NotFound(_))
        ));
        assert!(matches!(
            browser.click("#ghost", MouseButton::Left, T).await,
            Err(BrowserError::Timeout { .. })
        ));
        assert!(!browser.is_visible("#nope").await.unwrap());
        assert_eq!(browser.count("#nope").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_text_sequence_repeats_last() {
        let browser = FakeBrowser::new()
            .with_element("#msg", FakeElement::new().with_text_sequence(["a", "b"]));
        let mut reads = Vec::new();
        for _ in 0..3 {
            reads.push(browser.text_content("#msg", T).await.unwrap().unwrap());
        }
        assert_eq!(reads, vec!["a", "b", "b"]);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let browser = FakeBrowser::new();
        browser.fail_on("reload", "connection reset");
        let err = browser.reload().await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(browser.call_count("reload"), 1);

        browser.set_network_idle_fails(true);
        assert!(browser.wait_for_load_state(LoadState::NetworkIdle, T).await.is_err());
        assert!(browser.wait_for_load_state(LoadState::Load, T).await.is_ok());
    }

    #[test]
    fn test_history_navigation() {
        tokio_test::block_on(async {
            let browser = FakeBrowser::new();
            browser.navigate("https://a.test/", T).await.unwrap();
            browser.navigate("https://b.test/", T).await.unwrap();
            browser.go_back().await.unwrap();
            assert_eq!(browser.current_url(), "https://a.test/");
            browser.go_forward().await.unwrap();
            assert_eq!(browser.current_url(), "https://b.test/");
        });
    }

    #[tokio::test]
    async fn test_screenshot_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        let browser = FakeBrowser::new();
        browser.screenshot(&path).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), FAKE_PNG);
        assert!(browser.has_call("screenshot", &path.display().to_string()));
    }
}
