//! Settle policies driven by the manual clock


use std::time::Duration;

use test_utils::*;
use webcase_core::{ManualClock, RunContext, SettlePolicy, Stabilization};
use webcase_harness::{FakeBrowser, FakeElement};

fn banner(texts: Vec<String>) -> FakeBrowser {
    FakeBrowser::new().with_element("#banner", FakeElement::new().with_text_sequence(texts))
}

fn counting(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("rows: {}", i)).collect()
}

#[tokio::test]
async fn test_settling_text_is_stable() {
    let browser = banner(vec!["Loading".into(), "Done".into()]);
    let clock = ManualClock::new();

    let outcome = SettlePolicy::default()
        .stabilize_before_assert(&browser, &clock, "#banner", None)
        .await;

    assert_eq!(outcome, Stabilization::Stable);
    // Loading, Done, Done
    assert_eq!(browser.call_count("text_content"), 3);
    assert_eq!(clock.total_slept(), Duration::from_millis(1000));
    assert_eq!(browser.operations()[0], "wait_for_load_state");
}

#[tokio::test]
async fn test_expected_text_ends_waiting_early() {
    let mut texts = vec!["Loading".to_string(), "Saved 3 rows".to_string()];
    texts.extend(counting(5));
    let browser = banner(texts);
    let clock = ManualClock::new();

    let outcome = SettlePolicy::default()
        .stabilize_before_assert(&browser, &clock, "#banner", Some("Saved"))
        .await;

    assert_eq!(outcome, Stabilization::ExpectedFound);
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(500)]);
}

#[tokio::test]
async fn test_changing_text_times_out() {
    let browser = banner(counting(40));
    let clock = ManualClock::new();

    let outcome = SettlePolicy::default()
        .stabilize_before_assert(&browser, &clock, "#banner", None)
        .await;

    assert_eq!(outcome, Stabilization::TimedOut);
    assert_eq!(clock.total_slept(), Duration::from_millis(10_000));
    assert_eq!(browser.call_count("text_content"), 20);
}

#[tokio::test]
async fn test_disabled_stabilization_reads_nothing() {
    let browser = banner(counting(3));
    let clock = ManualClock::new();
    let mut policy = SettlePolicy::default();
    policy.stabilize.enabled = false;

    let outcome = policy.stabilize_before_assert(&browser, &clock, "#banner", None).await;

    assert_eq!(outcome, Stabilization::Disabled);
    assert!(browser.calls().is_empty());
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_stabilization_timeout_does_not_fail_the_step() {
    let mut texts = counting(20);
    texts.push("Done".to_string());
    let browser = login_page().with_element("#banner", FakeElement::new().with_text_sequence(texts));
    let fx = fixture(browser);
    let mut ctx = RunContext::new();

    let result = fx
        .executor
        .execute_raw(&step("assert: \"#banner\"\nexpected: equals\nvalue: Done"), 1, &mut ctx)
        .await;

    assert!(result.success, "{}", result.error_message);
    assert_eq!(fx.clock.total_slept(), Duration::from_millis(10_000));
    // 20 stabilization polls plus the assertion's own read
    assert_eq!(fx.browser.call_count("text_content"), 21);
}
