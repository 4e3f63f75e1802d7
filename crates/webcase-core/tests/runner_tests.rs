//! Case expansion, fail-fast execution and run aggregation


use std::time::Duration;

use test_utils::*;
use webcase_core::{StepErrorKind, Value};
use webcase_harness::FakeElement;

const IMPORT_SUITE: &str = r##"
import_users:
  steps:
    - input: {selector: "Path(S.F)", value: ["a", "b"]}
  loop_steps:
    a:
      - click: {selector: "Path(S.Go)"}
"##;

#[tokio::test]
async fn test_data_driven_case_runs_each_instance() {
    let (mut runner, fx) = fixture(login_page()).into_runner();
    let run = runner.execute_test_case(&suite(IMPORT_SUITE), "import_users").await;

    assert!(run.success, "{}", run.error_message);
    assert_eq!(run.total(), 2);
    assert_eq!(run.total_success, 2);
    assert_eq!(run.total_failed, 0);

    let first = &run.test_cases[0];
    assert_eq!(first.case_name, "import_users_1");
    assert_eq!(first.input_value, Value::from("a"));
    assert_eq!(first.steps.len(), 2);
    assert_eq!(first.steps[1].action, "click");

    let second = &run.test_cases[1];
    assert_eq!(second.case_name, "import_users_2");
    assert_eq!(second.steps.len(), 1);

    assert_eq!(fx.browser.call_count("fill"), 2);
    assert_eq!(fx.browser.call_count("click"), 1);
    assert_eq!(fx.browser.element("#f").unwrap().value, "b");
}

#[tokio::test]
async fn test_failing_step_stops_the_case() {
    let cases = suite(
        r##"
login:
  steps:
    - input: {selector: Path(Login.User), value: alice}
    - click: "#missing"
    - click: Path(Login.Button)
"##,
    );
    let (mut runner, fx) = fixture(login_page()).into_runner();
    let run = runner.execute_test_case(&cases, "login").await;

    assert!(!run.success);
    let case = &run.test_cases[0];
    assert_eq!(case.steps.len(), 2);
    assert!(case.steps[0].success);
    assert!(!case.steps[1].success);
    assert_eq!(case.error_message, case.steps[1].error_message);
    assert_eq!(case.failed_step().map(|s| s.step_num), Some(2));
    assert!(!fx.browser.has_call("click", "#login-btn"));
    assert_eq!(run.error_message, format!("login: {}", case.error_message));
}

#[tokio::test]
async fn test_failing_instance_does_not_stop_siblings() {
    let cases = suite(
        r##"
import_users:
  steps:
    - input: {selector: "Path(S.F)", value: ["a", "b", "c"]}
  loop_steps:
    b:
      - click: "#missing"
"##,
    );
    let (mut runner, _fx) = fixture(login_page()).into_runner();
    let run = runner.execute_test_case(&cases, "import_users").await;

    assert!(!run.success);
    assert_eq!(run.total(), 3);
    assert_eq!(run.total_success, 2);
    assert_eq!(run.total_failed, 1);
    assert!(run.error_message.starts_with("import_users_2: "));
    assert!(!run.error_message.contains(';'));
}

#[tokio::test]
async fn test_execute_all_keeps_file_order() {
    let cases = suite(
        r##"
broken:
  steps:
    - fly: somewhere
fine:
  steps:
    - click: Path(Login.Button)
also_broken:
  steps:
    - click: Path(Nowhere.Button)
"##,
    );
    let (mut runner, _fx) = fixture(login_page()).into_runner();
    let results = runner.execute_all(&cases).await;

    let names: Vec<&str> = results.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["broken", "fine", "also_broken"]);
    assert!(!results["broken"].success);
    assert!(results["fine"].success);
    assert_eq!(
        results["also_broken"].test_cases[0].steps[0].error_kind,
        Some(StepErrorKind::Resolution)
    );
}

#[tokio::test]
async fn test_unknown_case_is_a_failed_run() {
    let (mut runner, fx) = fixture(login_page()).into_runner();
    let run = runner.execute_test_case(&suite(IMPORT_SUITE), "nope").await;

    assert!(!run.success);
    assert_eq!(run.total_failed, 1);
    assert_eq!(run.total_success, 0);
    assert!(run.test_cases[0].steps.is_empty());
    assert!(run.error_message.contains("nope"));
    assert!(fx.browser.calls().is_empty());
}

#[tokio::test]
async fn test_two_data_driven_inputs_are_rejected() {
    let cases = suite(
        r##"
ambiguous:
  steps:
    - input: {selector: "#f", value: [a, b]}
    - input: {selector: "#go", value: [c, d]}
"##,
    );
    let (mut runner, fx) = fixture(login_page()).into_runner();
    let run = runner.execute_test_case(&cases, "ambiguous").await;

    assert!(!run.success);
    assert_eq!(run.total(), 1);
    assert!(run.error_message.contains("format error"));
    assert!(fx.browser.calls().is_empty());
}

#[tokio::test]
async fn test_panic_becomes_failed_case() {
    let cases = suite(
        r##"
explodes:
  steps:
    - click: "#go"
    - hover: "#go"
after:
  steps:
    - click: "#go"
"##,
    );
    let (mut runner, fx) = fixture(login_page()).into_runner();
    fx.browser.panic_on("hover");
    let results = runner.execute_all(&cases).await;

    let exploded = &results["explodes"].test_cases[0];
    assert!(!exploded.success);
    assert!(exploded.error_message.starts_with("runner panicked:"));
    assert_eq!(exploded.error_kind, Some(StepErrorKind::Panic));
    assert_eq!(exploded.steps.len(), 1);
    assert!(results["after"].success);
}

#[tokio::test]
async fn test_case_duration_is_wall_clock() {
    let cases = suite(
        r##"
slow:
  steps:
    - wait: 100
    - input: {selector: "#f", value: x}
"##,
    );
    let (mut runner, fx) = fixture(login_page()).into_runner();
    let run = runner.execute_test_case(&cases, "slow").await;

    let case = &run.test_cases[0];
    assert!(case.success, "{}", case.error_message);
    // input settle is included in the case duration
    assert_eq!(case.duration_ms, 300.0);
    assert_eq!(fx.clock.total_slept(), Duration::from_millis(300));
}

#[tokio::test]
async fn test_screenshots_follow_current_input() {
    let dir = tempfile::tempdir().unwrap();
    let fx = fixture_with_config(
        login_page().with_element("#result", FakeElement::new().with_text("ok")),
        config_in(dir.path()),
    );
    let (mut runner, _fx) = fx.into_runner();
    let cases = suite(
        r##"
search:
  steps:
    - input: {selector: "#f", value: [x, y]}
    - take_screenshot: result_{input}.png
"##,
    );
    let run = runner.execute_test_case(&cases, "search").await;

    assert!(run.success, "{}", run.error_message);
    assert!(runner.screenshots().exists("result_x"));
    assert!(runner.screenshots().exists("result_y"));
    assert_eq!(
        runner.screenshots().latest(),
        Some(dir.path().join("screenshot").join("result_y.png").as_path())
    );
}
