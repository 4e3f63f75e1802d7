//! WebDriver session client implementing [`Browser`]

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;
use webcase_core::{
    Browser, BrowserError, BrowserResult, DialogResponse, ElementState, LoadState, MouseButton,
    SelectBy,
};

use crate::capabilities::SessionOptions;
use crate::keys::{chord, chord_actions, ENTER};
use crate::locator::Locator;
use crate::protocol::{element_id, element_ref, to_browser_error, CommandFailure};

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const NETWORK_QUIET_WINDOW: Duration = Duration::from_millis(500);
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

const SELECT_OPTION_SCRIPT: &str = r##"
const [select, mode, wanted] = arguments;
const option = Array.from(select.options || []).find(o =>
    mode === 'value' ? o.value === wanted : (o.label === wanted || o.text.trim() === wanted));
if (!option) { return false; }
select.value = option.value;
option.selected = true;
select.dispatchEvent(new Event('input', { bubbles: true }));
select.dispatchEvent(new Event('change', { bubbles: true }));
return true;
"##;
const RESOURCE_COUNT_SCRIPT: &str = "return performance.getEntriesByType('resource').length;";
const READY_STATE_SCRIPT: &str = "return document.readyState;";
const SCROLL_INTO_VIEW_SCRIPT: &str = "arguments[0].scrollIntoView({block: 'center', inline: 'nearest'});";

/// Live WebDriver session
pub struct WebDriverBrowser {
    client: Client,
    session_url: String,
    session_id: String,
    options: SessionOptions,
    dialog_policy: Mutex<Option<DialogResponse>>,
    last_dialog: Mutex<Option<String>>,
}

impl WebDriverBrowser {
    /// Start a new session on the WebDriver server at `server_url`
    pub async fn connect(server_url: &str, options: SessionOptions) -> Result<Self> {
        let base = Url::parse(server_url).with_context(|| format!("invalid WebDriver URL '{}'", server_url))?;
        let base = base.as_str().trim_end_matches('/').to_string();
        info!("Starting {} session on {}", options.browser, base);

        let client = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let response = client
            .post(format!("{}/session", base))
            .json(&options.to_capabilities())
            .send()
            .await
            .with_context(|| format!("cannot reach WebDriver server at {}", base))?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let failure = CommandFailure::from_body(status.as_u16(), &body);
            return Err(anyhow!("failed to start {} session: {}", options.browser, failure));
        }

        let session: Value = serde_json::from_str(&body)?;
        let session_id = session["value"]["sessionId"]
            .as_str()
            .or_else(|| session["sessionId"].as_str())
            .ok_or_else(|| anyhow!("no session ID in response"))?
            .to_string();
        info!("Started WebDriver session: {}", session_id);

        Ok(Self {
            client,
            session_url: format!("{}/session/{}", base, session_id),
            session_id,
            options,
            dialog_policy: Mutex::new(None),
            last_dialog: Mutex::new(None),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// End the session and close the browser
    pub async fn quit(&self) -> Result<()> {
        info!("Ending WebDriver session: {}", self.session_id);
        let response = self.client.delete(&self.session_url).send().await?;
        if !response.status().is_success() {
            warn!("Failed to end WebDriver session cleanly");
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.session_url, path);
        debug!("WebDriver {} {}", method, path);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.with_context(|| format!("request to {} failed", url))?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(CommandFailure::from_body(status.as_u16(), &text).into());
        }
        let parsed: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };
        Ok(parsed.get("value").cloned().unwrap_or(Value::Null))
    }

    /// Send a command, handling one blocking alert per the dialog policy
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let value = match self.send(method.clone(), path, body.clone()).await {
            Err(e) if is_unexpected_alert(&e) => {
                let Some(policy) = self.policy() else {
                    return Err(e);
                };
                self.settle_alert(policy).await?;
                self.send(method, path, body).await?
            }
            other => other?,
        };
        if self.options.slow_mo_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.options.slow_mo_ms)).await;
        }
        Ok(value)
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.command(Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        self.command(Method::POST, path, Some(body)).await
    }

    // ------------------------------------------------------------------------
    // Elements
    // ------------------------------------------------------------------------

    async fn find_once(&self, selector: &str) -> Result<Option<String>> {
        let locator = Locator::parse(selector);
        let found = self
            .send(
                Method::POST,
                "/elements",
                Some(json!({"using": locator.using, "value": locator.value})),
            )
            .await?;
        Ok(found.as_array().and_then(|all| all.first()).and_then(element_id))
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<String>> {
        let locator = Locator::parse(selector);
        let found = self
            .post("/elements", json!({"using": locator.using, "value": locator.value}))
            .await?;
        Ok(found
            .as_array()
            .map(|all| all.iter().filter_map(element_id).collect())
            .unwrap_or_default())
    }

    /// Poll until an element matches or `timeout` elapses
    async fn find(&self, selector: &str, timeout: Duration) -> Result<String> {
        let start = Instant::now();
        loop {
            match self.find_once(selector).await {
                Ok(Some(id)) => return Ok(id),
                Ok(None) => {}
                Err(e) if is_unexpected_alert(&e) => return Err(e),
                Err(e) => debug!("Lookup of {} failed: {:#}", selector, e),
            }
            if start.elapsed() >= timeout {
                return Err(BrowserError::NotFound(selector.to_string()).into());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Find an element that is displayed, for pointer and keyboard input
    async fn find_interactable(&self, selector: &str, timeout: Duration) -> Result<String> {
        let start = Instant::now();
        let id = self.find(selector, timeout).await?;
        loop {
            if self.displayed(&id).await? {
                return Ok(id);
            }
            if start.elapsed() >= timeout {
                return Err(BrowserError::timeout(format!("{} to be visible", selector), timeout).into());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn displayed(&self, id: &str) -> Result<bool> {
        let value = self.get(&format!("/element/{}/displayed", id)).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn property(&self, id: &str, name: &str) -> Result<Value> {
        self.get(&format!("/element/{}/property/{}", id, name)).await
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.post("/execute/sync", json!({"script": script, "args": args})).await
    }

    async fn perform(&self, actions: Value) -> Result<()> {
        self.post("/actions", json!({ "actions": [actions] })).await?;
        self.command(Method::DELETE, "/actions", None).await?;
        Ok(())
    }

    async fn pointer(&self, id: &str, clicks: u32, button: u32) -> Result<()> {
        let mut steps = vec![json!({
            "type": "pointerMove",
            "duration": 0,
            "origin": element_ref(id),
            "x": 0,
            "y": 0
        })];
        for _ in 0..clicks {
            steps.push(json!({"type": "pointerDown", "button": button}));
            steps.push(json!({"type": "pointerUp", "button": button}));
        }
        self.perform(json!({
            "type": "pointer",
            "id": "mouse",
            "parameters": {"pointerType": "mouse"},
            "actions": steps
        }))
        .await
    }

    async fn keys(&self, actions: Vec<Value>) -> Result<()> {
        self.perform(json!({"type": "key", "id": "keyboard", "actions": actions}))
            .await
    }

    async fn ready_state(&self) -> Result<String> {
        let state = self.execute(READY_STATE_SCRIPT, Vec::new()).await?;
        Ok(state.as_str().unwrap_or_default().to_string())
    }

    async fn resource_count(&self) -> Result<u64> {
        let count = self.execute(RESOURCE_COUNT_SCRIPT, Vec::new()).await?;
        Ok(count.as_u64().unwrap_or(0))
    }

    async fn wait_for_ready_state(&self, accept: fn(&str) -> bool, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        loop {
            let state = self.ready_state().await?;
            if accept(&state) {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(BrowserError::timeout(format!("document.readyState (last '{}')", state), timeout).into());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Ready state complete, then no new resource entries across a quiet window
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        self.wait_for_ready_state(|s| s == "complete", timeout).await?;
        let mut previous = self.resource_count().await?;
        loop {
            tokio::time::sleep(NETWORK_QUIET_WINDOW).await;
            let current = self.resource_count().await?;
            if current == previous {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(BrowserError::timeout("network idle", timeout).into());
            }
            previous = current;
        }
    }

    // ------------------------------------------------------------------------
    // Dialogs
    // ------------------------------------------------------------------------

    fn policy(&self) -> Option<DialogResponse> {
        *self
            .dialog_policy
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remember_dialog(&self, text: String) {
        *self
            .last_dialog
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(text);
    }

    fn cached_dialog(&self) -> Option<String> {
        self.last_dialog
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Read, cache and answer the open alert; no alert is not an error
    async fn settle_alert(&self, response: DialogResponse) -> Result<()> {
        match self.send(Method::GET, "/alert/text", None).await {
            Ok(text) => {
                let text = text.as_str().unwrap_or_default().to_string();
                info!("Dialog: {}", text);
                self.remember_dialog(text);
            }
            Err(e) if is_no_such_alert(&e) => return Ok(()),
            Err(e) => return Err(e),
        }
        let endpoint = match response {
            DialogResponse::Accept => "/alert/accept",
            DialogResponse::Dismiss => "/alert/dismiss",
        };
        match self.send(Method::POST, endpoint, Some(json!({}))).await {
            Err(e) if is_no_such_alert(&e) => Ok(()),
            other => other.map(|_| ()),
        }
    }
}

fn failure(error: &anyhow::Error) -> Option<&CommandFailure> {
    error.downcast_ref::<CommandFailure>()
}

fn is_unexpected_alert(error: &anyhow::Error) -> bool {
    failure(error).map(CommandFailure::is_unexpected_alert).unwrap_or(false)
}

fn is_no_such_alert(error: &anyhow::Error) -> bool {
    failure(error).map(CommandFailure::is_no_such_alert).unwrap_or(false)
}

/// Run an internal operation and map its error at the trait boundary
macro_rules! boundary {
    ($command:expr, $target:expr, $body:expr) => {{
        let result: Result<_> = $body.await;
        result.map_err(|e| to_browser_error($command, $target, e))
    }};
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn navigate(&self, url: &str, timeout: Duration) -> BrowserResult<()> {
        boundary!("navigate", url, async {
            self.post("/timeouts", json!({"pageLoad": timeout.as_millis() as u64})).await?;
            self.post("/url", json!({"url": url})).await.map(|_| ())
        })
    }

    async fn click(&self, selector: &str, button: MouseButton, timeout: Duration) -> BrowserResult<()> {
        boundary!("click", selector, async {
            let id = self.find_interactable(selector, timeout).await?;
            match button {
                MouseButton::Left => self.post(&format!("/element/{}/click", id), json!({})).await.map(|_| ()),
                MouseButton::Right => self.pointer(&id, 1, 2).await,
            }
        })
    }

    async fn double_click(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        boundary!("double_click", selector, async {
            let id = self.find_interactable(selector, timeout).await?;
            self.pointer(&id, 2, 0).await
        })
    }

    async fn hover(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        boundary!("hover", selector, async {
            let id = self.find_interactable(selector, timeout).await?;
            self.pointer(&id, 0, 0).await
        })
    }

    async fn fill(&self, selector: &str, text: &str, timeout: Duration) -> BrowserResult<()> {
        boundary!("fill", selector, async {
            let id = self.find_interactable(selector, timeout).await?;
            self.post(&format!("/element/{}/clear", id), json!({})).await?;
            self.post(&format!("/element/{}/value", id), json!({"text": text})).await.map(|_| ())
        })
    }

    async fn clear(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        boundary!("clear", selector, async {
            let id = self.find_interactable(selector, timeout).await?;
            self.post(&format!("/element/{}/clear", id), json!({})).await.map(|_| ())
        })
    }

    async fn select_option(&self, selector: &str, option: SelectBy<'_>, timeout: Duration) -> BrowserResult<()> {
        let (mode, wanted) = match option {
            SelectBy::Value(value) => ("value", value),
            SelectBy::Label(label) => ("label", label),
        };
        boundary!("select_option", selector, async {
            let id = self.find(selector, timeout).await?;
            let selected = self
                .execute(SELECT_OPTION_SCRIPT, vec![element_ref(&id), json!(mode), json!(wanted)])
                .await?;
            if selected.as_bool().unwrap_or(false) {
                Ok(())
            } else {
                Err(anyhow!("no option with {} '{}'", mode, wanted))
            }
        })
    }

    async fn set_checked(&self, selector: &str, checked: bool, timeout: Duration) -> BrowserResult<()> {
        boundary!("set_checked", selector, async {
            let id = self.find_interactable(selector, timeout).await?;
            let current = self.get(&format!("/element/{}/selected", id)).await?;
            if current.as_bool().unwrap_or(false) != checked {
                self.post(&format!("/element/{}/click", id), json!({})).await?;
            }
            Ok(())
        })
    }

    async fn set_input_files(&self, selector: &str, file: &Path, timeout: Duration) -> BrowserResult<()> {
        let absolute = std::fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
        boundary!("set_input_files", selector, async {
            let id = self.find(selector, timeout).await?;
            let text = absolute.to_string_lossy().into_owned();
            self.post(&format!("/element/{}/value", id), json!({"text": text})).await.map(|_| ())
        })
    }

    async fn wait_for_selector(&self, selector: &str, state: ElementState, timeout: Duration) -> BrowserResult<()> {
        boundary!("wait_for_selector", selector, async {
            let start = Instant::now();
            loop {
                let ids = self.find_all(selector).await?;
                let satisfied = match state {
                    ElementState::Attached => !ids.is_empty(),
                    ElementState::Detached => ids.is_empty(),
                    ElementState::Visible => match ids.first() {
                        Some(id) => self.displayed(id).await.unwrap_or(false),
                        None => false,
                    },
                    ElementState::Hidden => match ids.first() {
                        Some(id) => !self.displayed(id).await.unwrap_or(false),
                        None => true,
                    },
                };
                if satisfied {
                    return Ok(());
                }
                if start.elapsed() >= timeout {
                    return Err(BrowserError::timeout(format!("{} to be {:?}", selector, state), timeout).into());
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        })
    }

    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> BrowserResult<()> {
        boundary!("wait_for_load_state", "", async {
            match state {
                LoadState::Load => self.wait_for_ready_state(|s| s == "complete", timeout).await,
                LoadState::DomContentLoaded => {
                    self.wait_for_ready_state(|s| s == "interactive" || s == "complete", timeout)
                        .await
                }
                LoadState::NetworkIdle => self.wait_for_network_idle(timeout).await,
            }
        })
    }

    async fn press_key(&self, key: &str) -> BrowserResult<()> {
        boundary!("press_key", key, async {
            let codes = chord(key).map_err(|e| anyhow!(e))?;
            self.keys(chord_actions(&codes)).await
        })
    }

    async fn type_text(&self, text: &str) -> BrowserResult<()> {
        boundary!("type_text", "", async {
            let actions: Vec<Value> = text
                .chars()
                .flat_map(|c| {
                    let c = (if c == '\n' { ENTER } else { c }).to_string();
                    [
                        json!({"type": "keyDown", "value": c}),
                        json!({"type": "keyUp", "value": c}),
                    ]
                })
                .collect();
            self.keys(actions).await
        })
    }

    async fn evaluate(&self, script: &str, selector: Option<&str>, timeout: Duration) -> BrowserResult<Value> {
        boundary!("evaluate", selector.unwrap_or(""), async {
            let args = match selector {
                Some(selector) => vec![element_ref(&self.find(selector, timeout).await?)],
                None => Vec::new(),
            };
            self.execute(script, args).await
        })
    }

    async fn scroll_into_view(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        boundary!("scroll_into_view", selector, async {
            let id = self.find(selector, timeout).await?;
            self.execute(SCROLL_INTO_VIEW_SCRIPT, vec![element_ref(&id)]).await.map(|_| ())
        })
    }

    async fn text_content(&self, selector: &str, timeout: Duration) -> BrowserResult<Option<String>> {
        boundary!("text_content", selector, async {
            let id = self.find(selector, timeout).await?;
            let text = self.property(&id, "textContent").await?;
            Ok(text.as_str().map(str::to_string))
        })
    }

    async fn get_attribute(&self, selector: &str, name: &str, timeout: Duration) -> BrowserResult<Option<String>> {
        boundary!("get_attribute", selector, async {
            let id = self.find(selector, timeout).await?;
            let value = self.get(&format!("/element/{}/attribute/{}", id, name)).await?;
            Ok(value.as_str().map(str::to_string))
        })
    }

    async fn input_value(&self, selector: &str, timeout: Duration) -> BrowserResult<String> {
        boundary!("input_value", selector, async {
            let id = self.find(selector, timeout).await?;
            let value = self.property(&id, "value").await?;
            Ok(value.as_str().unwrap_or_default().to_string())
        })
    }

    async fn is_visible(&self, selector: &str) -> BrowserResult<bool> {
        boundary!("is_visible", selector, async {
            match self.find_all(selector).await?.first() {
                Some(id) => self.displayed(id).await,
                None => Ok(false),
            }
        })
    }

    async fn is_enabled(&self, selector: &str) -> BrowserResult<bool> {
        boundary!("is_enabled", selector, async {
            let id = self.find(selector, Duration::ZERO).await?;
            let enabled = self.get(&format!("/element/{}/enabled", id)).await?;
            Ok(enabled.as_bool().unwrap_or(false))
        })
    }

    async fn is_checked(&self, selector: &str) -> BrowserResult<bool> {
        boundary!("is_checked", selector, async {
            let id = self.find(selector, Duration::ZERO).await?;
            let selected = self.get(&format!("/element/{}/selected", id)).await?;
            Ok(selected.as_bool().unwrap_or(false))
        })
    }

    async fn count(&self, selector: &str) -> BrowserResult<usize> {
        boundary!("count", selector, async { Ok(self.find_all(selector).await?.len()) })
    }

    async fn screenshot(&self, path: &Path) -> BrowserResult<()> {
        let target = path.display().to_string();
        boundary!("screenshot", &target, async {
            let encoded = self.get("/screenshot").await?;
            let encoded = encoded.as_str().ok_or_else(|| anyhow!("no screenshot data in response"))?;
            let bytes = base64::engine::general_purpose::STANDARD.decode(encoded)?;
            tokio::fs::write(path, bytes).await?;
            Ok(())
        })
    }

    async fn go_back(&self) -> BrowserResult<()> {
        boundary!("go_back", "", async { self.post("/back", json!({})).await.map(|_| ()) })
    }

    async fn go_forward(&self) -> BrowserResult<()> {
        boundary!("go_forward", "", async { self.post("/forward", json!({})).await.map(|_| ()) })
    }

    async fn reload(&self) -> BrowserResult<()> {
        boundary!("reload", "", async { self.post("/refresh", json!({})).await.map(|_| ()) })
    }

    async fn title(&self) -> BrowserResult<String> {
        boundary!("title", "", async {
            Ok(self.get("/title").await?.as_str().unwrap_or_default().to_string())
        })
    }

    async fn url(&self) -> BrowserResult<String> {
        boundary!("url", "", async {
            Ok(self.get("/url").await?.as_str().unwrap_or_default().to_string())
        })
    }

    async fn handle_dialogs(&self, response: DialogResponse) -> BrowserResult<()> {
        *self
            .dialog_policy
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(response);
        boundary!("handle_dialogs", "", self.settle_alert(response))
    }

    async fn dialog_message(&self) -> BrowserResult<Option<String>> {
        boundary!("dialog_message", "", async {
            match self.send(Method::GET, "/alert/text", None).await {
                Ok(text) => {
                    let text = text.as_str().unwrap_or_default().to_string();
                    self.remember_dialog(text.clone());
                    Ok(Some(text))
                }
                Err(e) if is_no_such_alert(&e) => Ok(self.cached_dialog()),
                Err(e) => Err(e),
            }
        })
    }
}
