//! W3C WebDriver wire details: error bodies and element references

use serde_json::{json, Value};
use thiserror::Error;
use webcase_core::BrowserError;

/// Key under which W3C servers return element references
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
/// Pre-W3C key some drivers still send
const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// A command the server answered with an error body
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error} (HTTP {status}): {message}")]
pub struct CommandFailure {
    pub status: u16,
    /// W3C error code such as `no such element`
    pub error: String,
    pub message: String,
}

impl CommandFailure {
    /// Parse `{"value": {"error": ..., "message": ...}}`, tolerating
    /// servers that answer with plain text.
    pub fn from_body(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let value = parsed.as_ref().map(|v| &v["value"]);
        let error = value
            .and_then(|v| v["error"].as_str())
            .unwrap_or("unknown error")
            .to_string();
        let message = value
            .and_then(|v| v["message"].as_str())
            .map(str::to_string)
            .unwrap_or_else(|| body.trim().to_string());
        Self {
            status,
            error,
            message,
        }
    }

    pub fn is_no_such_element(&self) -> bool {
        matches!(self.error.as_str(), "no such element" | "stale element reference")
    }

    pub fn is_no_such_alert(&self) -> bool {
        self.error == "no such alert"
    }

    pub fn is_unexpected_alert(&self) -> bool {
        self.error == "unexpected alert open"
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.error.as_str(), "timeout" | "script timeout")
    }
}

/// Extract the element id from a find-element response value
pub fn element_id(value: &Value) -> Option<String> {
    value[ELEMENT_KEY]
        .as_str()
        .or_else(|| value[LEGACY_ELEMENT_KEY].as_str())
        .map(str::to_string)
}

/// JSON reference passed to scripts and actions
pub fn element_ref(id: &str) -> Value {
    json!({ ELEMENT_KEY: id, LEGACY_ELEMENT_KEY: id })
}

/// Map an internal failure onto the collaborator error taxonomy
pub fn to_browser_error(command: &str, target: &str, error: anyhow::Error) -> BrowserError {
    if let Some(failure) = error.downcast_ref::<CommandFailure>() {
        if failure.is_no_such_element() {
            return BrowserError::NotFound(target.to_string());
        }
        if failure.is_timeout() {
            return BrowserError::Timeout {
                operation: format!("{} {}", command, target).trim_end().to_string(),
                timeout_ms: 0,
            };
        }
    }
    match error.downcast::<BrowserError>() {
        Ok(browser_error) => browser_error,
        Err(other) => BrowserError::command(command, format!("{:#}", other)),
    }
}
