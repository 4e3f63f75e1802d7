//! New-session capabilities per browser

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    Chrome,
    Firefox,
    Edge,
}

impl BrowserKind {
    /// `browserName` as WebDriver servers expect it
    pub fn browser_name(&self) -> &'static str {
        match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Edge => "MicrosoftEdge",
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserKind::Chrome => write!(f, "chrome"),
            BrowserKind::Firefox => write!(f, "firefox"),
            BrowserKind::Edge => write!(f, "edge"),
        }
    }
}

impl FromStr for BrowserKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chrome" | "chromium" => Ok(BrowserKind::Chrome),
            "firefox" => Ok(BrowserKind::Firefox),
            "edge" | "msedge" | "microsoftedge" => Ok(BrowserKind::Edge),
            other => Err(format!(
                "unsupported browser '{}' (expected chrome, firefox or edge)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOptions {
    pub browser: BrowserKind,
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub accept_insecure_certs: bool,
    /// Pause after every successful command, for watching headed runs
    #[serde(default)]
    pub slow_mo_ms: u64,
    /// Extra browser arguments (`--lang=en`, `-private`, ...)
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chrome,
            headless: true,
            window_width: 1920,
            window_height: 1080,
            accept_insecure_certs: true,
            slow_mo_ms: 0,
            args: Vec::new(),
        }
    }
}

impl SessionOptions {
    pub fn new(browser: BrowserKind) -> Self {
        Self {
            browser,
            ..Self::default()
        }
    }

    fn browser_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        match self.browser {
            BrowserKind::Chrome | BrowserKind::Edge => {
                if self.headless {
                    args.push("--headless=new".to_string());
                }
                args.push(format!("--window-size={},{}", self.window_width, self.window_height));
                args.push("--disable-gpu".to_string());
                args.push("--no-sandbox".to_string());
            }
            BrowserKind::Firefox => {
                if self.headless {
                    args.push("-headless".to_string());
                }
                args.push(format!("--width={}", self.window_width));
                args.push(format!("--height={}", self.window_height));
            }
        }
        args.extend(self.args.iter().cloned());
        args
    }

    /// Body of the `POST /session` request
    pub fn to_capabilities(&self) -> Value {
        let options_key = match self.browser {
            BrowserKind::Chrome => "goog:chromeOptions",
            BrowserKind::Firefox => "moz:firefoxOptions",
            BrowserKind::Edge => "ms:edgeOptions",
        };

        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": self.browser.browser_name(),
                    "acceptInsecureCerts": self.accept_insecure_certs,
                    "unhandledPromptBehavior": "ignore",
                    options_key: { "args": self.browser_args() }
                },
                "firstMatch": [{}]
            }
        })
    }
}
