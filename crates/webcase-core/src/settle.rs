//! Settle policies applied around step dispatch
//!
//! Three named, best-effort waits:
//!
//! - `after_input_settle`: a fixed delay after typing into a field
//! - `after_submit_settle`: network idle plus a fixed delay after Enter
//! - `stabilize_before_assert`: poll an element's text until it stops changing
//!   (or shows the expected substring) before a text assertion
//!
//! None of them can fail a step; problems are logged and waiting stops.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::browser::{Browser, LoadState};
use crate::clock::StepClock;

/// Content-stabilization settings for text assertions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilizeConfig {
    pub enabled: bool,
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for StabilizeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: Duration::from_millis(10_000),
            interval: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlePolicy {
    pub after_input: Duration,
    pub after_submit: Duration,
    pub network_idle_timeout: Duration,
    pub stabilize: StabilizeConfig,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            after_input: Duration::from_millis(200),
            after_submit: Duration::from_millis(300),
            network_idle_timeout: Duration::from_millis(30_000),
            stabilize: StabilizeConfig::default(),
        }
    }
}

/// How a stabilization wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stabilization {
    Disabled,
    ExpectedFound,
    Stable,
    TimedOut,
}

impl SettlePolicy {
    /// Policy with every delay removed
    pub fn immediate() -> Self {
        Self {
            after_input: Duration::ZERO,
            after_submit: Duration::ZERO,
            network_idle_timeout: Duration::from_millis(30_000),
            stabilize: StabilizeConfig {
                enabled: false,
                ..StabilizeConfig::default()
            },
        }
    }

    pub async fn after_input_settle(&self, clock: &dyn StepClock) {
        if self.after_input.is_zero() {
            return;
        }
        debug!("Settling {:?} after input", self.after_input);
        clock.sleep(self.after_input).await;
    }

    /// Wait for the request a submit usually triggers
    pub async fn after_submit_settle(&self, browser: &dyn Browser, clock: &dyn StepClock) {
        debug!("Waiting for network idle after submit");
        match browser
            .wait_for_load_state(LoadState::NetworkIdle, self.network_idle_timeout)
            .await
        {
            Ok(()) => {
                if !self.after_submit.is_zero() {
                    clock.sleep(self.after_submit).await;
                }
            }
            Err(e) => warn!("Page did not settle after submit (continuing): {}", e),
        }
    }

    /// Best-effort wait for an element's text to settle.
    ///
    /// Waits for network idle, then polls the text content every
    /// `stabilize.interval` until the expected substring shows up, two
    /// consecutive polls return identical content, or `stabilize.timeout`
    /// elapses. Read errors count as a changed poll.
    pub async fn stabilize_before_assert(
        &self,
        browser: &dyn Browser,
        clock: &dyn StepClock,
        selector: &str,
        expected: Option<&str>,
    ) -> Stabilization {
        if !self.stabilize.enabled {
            debug!("Content stabilization disabled");
            return Stabilization::Disabled;
        }

        if let Err(e) = browser
            .wait_for_load_state(LoadState::NetworkIdle, self.network_idle_timeout)
            .await
        {
            warn!("Network did not go idle before assertion (continuing): {}", e);
        }

        let start = clock.now();
        let mut last: Option<String> = None;
        let expected = expected.filter(|e| !e.is_empty());

        while clock.elapsed_since(start) < self.stabilize.timeout {
            match browser.text_content(selector, self.stabilize.interval).await {
                Ok(content) => {
                    let content = content.unwrap_or_default();
                    if let Some(expected) = expected {
                        if content.contains(expected) {
                            debug!("Content of {} contains '{}'", selector, expected);
                            return Stabilization::ExpectedFound;
                        }
                    }
                    if last.as_deref() == Some(content.as_str()) {
                        debug!("Content of {} is stable", selector);
                        return Stabilization::Stable;
                    }
                    last = Some(content);
                }
                Err(e) => {
                    warn!("Reading {} while waiting for stable content: {}", selector, e);
                    last = None;
                }
            }
            clock.sleep(self.stabilize.interval).await;
        }

        warn!(
            "Content of {} did not stabilize within {:?}",
            selector, self.stabilize.timeout
        );
        Stabilization::TimedOut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_values() {
        let policy = SettlePolicy::default();
        assert_eq!(policy.after_input, Duration::from_millis(200));
        assert_eq!(policy.after_submit, Duration::from_millis(300));
        assert!(policy.stabilize.enabled);
        assert_eq!(policy.stabilize.timeout, Duration::from_millis(10_000));
        assert_eq!(policy.stabilize.interval, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_after_input_sleeps_once() {
        let clock = crate::clock::ManualClock::new();
        SettlePolicy::default().after_input_settle(&clock).await;
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(200)]);

        let clock = crate::clock::ManualClock::new();
        SettlePolicy::immediate().after_input_settle(&clock).await;
        assert!(clock.sleeps().is_empty());
    }
}
