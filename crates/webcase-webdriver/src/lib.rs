//! webcase WebDriver client
//!
//! Drives Chrome, Firefox or Edge through a W3C WebDriver endpoint
//! (chromedriver, geckodriver, msedgedriver or a Selenium grid) and exposes
//! it as a [`webcase_core::Browser`].

pub mod capabilities;
pub mod client;
pub mod keys;
pub mod locator;
pub mod protocol;

pub use capabilities::{BrowserKind, SessionOptions};
pub use client::WebDriverBrowser;
pub use locator::Locator;
pub use protocol::CommandFailure;
