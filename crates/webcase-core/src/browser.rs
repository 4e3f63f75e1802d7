//! Browser automation collaborator interface
//!
//! The interpreter never talks to a browser directly. Every page operation a
//! handler needs goes through [`Browser`], which is implemented by the
//! WebDriver client for real runs and by the scripted fake browser in tests.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

// ----------------------------------------------------------------------------
// Collaborator Errors
// ----------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("timed out after {timeout_ms}ms waiting for {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("element not found: {0}")]
    NotFound(String),

    #[error("browser command '{command}' failed: {reason}")]
    Command { command: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BrowserError {
    pub fn command(command: impl Into<String>, reason: impl ToString) -> Self {
        BrowserError::Command {
            command: command.into(),
            reason: reason.to_string(),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        BrowserError::Timeout {
            operation: operation.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }
}

pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

// ----------------------------------------------------------------------------
// Primitive Options
// ----------------------------------------------------------------------------

/// Element states accepted by [`Browser::wait_for_selector`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    Attached,
    Detached,
    Visible,
    Hidden,
}

/// Page load milestones accepted by [`Browser::wait_for_load_state`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Load,
    DomContentLoaded,
    NetworkIdle,
}

impl FromStr for LoadState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "load" => Ok(LoadState::Load),
            "domcontentloaded" => Ok(LoadState::DomContentLoaded),
            "networkidle" => Ok(LoadState::NetworkIdle),
            other => Err(format!("unknown load state '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}

/// How an `<option>` is picked from a `<select>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectBy<'a> {
    Value(&'a str),
    Label(&'a str),
}

/// What to do with JavaScript dialogs from now on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogResponse {
    Accept,
    Dismiss,
}

// ----------------------------------------------------------------------------
// Collaborator Trait
// ----------------------------------------------------------------------------

#[async_trait]
pub trait Browser: Send + Sync {
    async fn navigate(&self, url: &str, timeout: Duration) -> BrowserResult<()>;

    async fn click(&self, selector: &str, button: MouseButton, timeout: Duration) -> BrowserResult<()>;

    async fn double_click(&self, selector: &str, timeout: Duration) -> BrowserResult<()>;

    async fn hover(&self, selector: &str, timeout: Duration) -> BrowserResult<()>;

    /// Replace the element's value with `text`
    async fn fill(&self, selector: &str, text: &str, timeout: Duration) -> BrowserResult<()>;

    async fn clear(&self, selector: &str, timeout: Duration) -> BrowserResult<()>;

    async fn select_option(&self, selector: &str, option: SelectBy<'_>, timeout: Duration) -> BrowserResult<()>;

    async fn set_checked(&self, selector: &str, checked: bool, timeout: Duration) -> BrowserResult<()>;

    async fn set_input_files(&self, selector: &str, file: &Path, timeout: Duration) -> BrowserResult<()>;

    async fn wait_for_selector(&self, selector: &str, state: ElementState, timeout: Duration) -> BrowserResult<()>;

    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> BrowserResult<()>;

    /// Press a named key (`Enter`, `Tab`, `Escape`, ...) on the focused element
    async fn press_key(&self, key: &str) -> BrowserResult<()>;

    /// Type text into the focused element
    async fn type_text(&self, text: &str) -> BrowserResult<()>;

    /// Evaluate a script; when `selector` is given the element is passed as
    /// the script's first argument.
    async fn evaluate(&self, script: &str, selector: Option<&str>, timeout: Duration) -> BrowserResult<serde_json::Value>;

    async fn scroll_into_view(&self, selector: &str, timeout: Duration) -> BrowserResult<()>;

    async fn text_content(&self, selector: &str, timeout: Duration) -> BrowserResult<Option<String>>;

    async fn get_attribute(&self, selector: &str, name: &str, timeout: Duration) -> BrowserResult<Option<String>>;

    async fn input_value(&self, selector: &str, timeout: Duration) -> BrowserResult<String>;

    /// Missing elements are not visible; this never waits
    async fn is_visible(&self, selector: &str) -> BrowserResult<bool>;

    async fn is_enabled(&self, selector: &str) -> BrowserResult<bool>;

    async fn is_checked(&self, selector: &str) -> BrowserResult<bool>;

    async fn count(&self, selector: &str) -> BrowserResult<usize>;

    async fn screenshot(&self, path: &Path) -> BrowserResult<()>;

    async fn go_back(&self) -> BrowserResult<()>;

    async fn go_forward(&self) -> BrowserResult<()>;

    async fn reload(&self) -> BrowserResult<()>;

    async fn title(&self) -> BrowserResult<String>;

    async fn url(&self) -> BrowserResult<String>;

    /// Respond to the current and all future dialogs this way
    async fn handle_dialogs(&self, response: DialogResponse) -> BrowserResult<()>;

    /// Message of the most recent dialog, if any appeared
    async fn dialog_message(&self) -> BrowserResult<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_state_parsing() {
        assert_eq!("networkidle".parse::<LoadState>().unwrap(), LoadState::NetworkIdle);
        assert_eq!("DOMContentLoaded".parse::<LoadState>().unwrap(), LoadState::DomContentLoaded);
        assert_eq!("load".parse::<LoadState>().unwrap(), LoadState::Load);
        assert!("idle".parse::<LoadState>().is_err());
    }

    #[test]
    fn test_timeout_error_message() {
        let err = BrowserError::timeout("#spinner to be hidden", Duration::from_millis(1500));
        assert_eq!(err.to_string(), "timed out after 1500ms waiting for #spinner to be hidden");
    }
}
