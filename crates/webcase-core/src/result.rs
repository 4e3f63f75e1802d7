//! Structured execution records handed to reporting

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{StepError, StepErrorKind};

/// Outcome of one executed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// 1-based position within the case instance
    pub step_num: usize,
    pub action: String,
    /// Resolved selector, when the step had one
    pub selector: Option<String>,
    pub value: Value,
    pub expected: Value,
    pub description: String,
    pub success: bool,
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<StepErrorKind>,
    pub duration_ms: f64,
}

impl StepResult {
    pub fn fail_with(&mut self, error: &StepError) {
        self.success = false;
        self.error_message = error.to_string();
        self.error_kind = Some(error.kind());
    }
}

/// Outcome of one case instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub case_name: String,
    pub input_value: Value,
    pub success: bool,
    /// Executed steps only; execution stops at the first failure
    pub steps: Vec<StepResult>,
    pub error_message: String,
    /// Kind of the failure, when one was classified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<StepErrorKind>,
    pub duration_ms: f64,
}

impl CaseResult {
    pub fn new(case_name: impl Into<String>, input_value: Value) -> Self {
        Self {
            case_name: case_name.into(),
            input_value,
            success: true,
            steps: Vec::new(),
            error_message: String::new(),
            error_kind: None,
            duration_ms: 0.0,
        }
    }

    /// Append a step result, adopting its failure
    pub fn push_step(&mut self, step: StepResult) {
        if !step.success {
            self.success = false;
            self.error_message = step.error_message.clone();
            self.error_kind = step.error_kind;
        }
        self.steps.push(step);
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.success = false;
        self.error_message = message.into();
    }

    pub fn failed_step(&self) -> Option<&StepResult> {
        self.steps.iter().find(|step| !step.success)
    }

    pub fn summary(&self) -> String {
        if self.success {
            format!(
                "PASS {} ({} steps, {:.2}s)",
                self.case_name,
                self.steps.len(),
                self.duration_ms / 1000.0
            )
        } else {
            format!(
                "FAIL {} at step {} ({:.2}s): {}",
                self.case_name,
                self.steps.len(),
                self.duration_ms / 1000.0,
                self.error_message
            )
        }
    }
}

/// Outcome of a group of case instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub success: bool,
    pub test_cases: Vec<CaseResult>,
    pub total_success: usize,
    pub total_failed: usize,
    pub error_message: String,
    pub duration_ms: f64,
}

impl RunResult {
    /// Aggregate case results; totals and the joined error message are
    /// always derived from `test_cases`.
    pub fn from_cases(test_cases: Vec<CaseResult>, duration_ms: f64) -> Self {
        let total_success = test_cases.iter().filter(|case| case.success).count();
        let total_failed = test_cases.len() - total_success;
        let error_message = test_cases
            .iter()
            .filter(|case| !case.success)
            .map(|case| format!("{}: {}", case.case_name, case.error_message))
            .collect::<Vec<_>>()
            .join("; ");

        Self {
            success: total_failed == 0,
            test_cases,
            total_success,
            total_failed,
            error_message,
            duration_ms,
        }
    }

    /// A run that could not start (unknown case, bad expansion).
    ///
    /// Carries one failed, step-less case so the totals stay consistent.
    pub fn failed(case_name: impl Into<String>, error_message: impl Into<String>) -> Self {
        let mut case = CaseResult::new(case_name, Value::from(""));
        case.fail(error_message);
        Self::from_cases(vec![case], 0.0)
    }

    pub fn total(&self) -> usize {
        self.test_cases.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} {}/{} passed ({:.2}s)",
            if self.success { "PASS" } else { "FAIL" },
            self.total_success,
            self.total(),
            self.duration_ms / 1000.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(num: usize, success: bool) -> StepResult {
        StepResult {
            step_num: num,
            action: "click".to_string(),
            selector: Some("#b".to_string()),
            value: Value::Null,
            expected: Value::Null,
            description: format!("Step {}: click #b", num),
            success,
            error_message: if success { String::new() } else { "boom".to_string() },
            error_kind: (!success).then_some(StepErrorKind::Execution),
            duration_ms: 1.0,
        }
    }

    fn case(name: &str, success: bool) -> CaseResult {
        let mut case = CaseResult::new(name, Value::from(""));
        case.push_step(step(1, true));
        if !success {
            case.push_step(step(2, false));
        }
        case
    }

    #[test]
    fn test_case_adopts_step_failure() {
        let failed = case("c", false);
        assert!(!failed.success);
        assert_eq!(failed.error_message, "boom");
        assert_eq!(failed.error_kind, Some(StepErrorKind::Execution));
        assert_eq!(failed.failed_step().map(|s| s.step_num), Some(2));
        assert!(case("ok", true).success);
    }

    #[test]
    fn test_run_totals() {
        let run = RunResult::from_cases(
            vec![case("a_1", true), case("a_2", false), case("a_3", false)],
            10.0,
        );
        assert_eq!(run.total_success + run.total_failed, run.total());
        assert_eq!(run.total_failed, 2);
        assert!(!run.success);
        assert_eq!(run.error_message, "a_2: boom; a_3: boom");

        let run = RunResult::from_cases(vec![case("b", true)], 1.0);
        assert!(run.success);
        assert!(run.error_message.is_empty());
    }

    #[test]
    fn test_failed_run_keeps_invariants() {
        let run = RunResult::failed("missing", "test case 'missing' not found");
        assert!(!run.success);
        assert_eq!(run.total_failed, 1);
        assert_eq!(run.total_success + run.total_failed, run.total());
        assert!(run.test_cases[0].steps.is_empty());
        assert!(run.error_message.contains("not found"));
    }

    #[test]
    fn test_empty_run_succeeds() {
        let run = RunResult::from_cases(Vec::new(), 0.0);
        assert!(run.success);
        assert_eq!(run.total(), 0);
    }

    #[test]
    fn test_results_serialize_to_json() {
        let run = RunResult::from_cases(vec![case("a", false)], 5.0);
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["total_failed"], 1);
        assert_eq!(json["test_cases"][0]["steps"][1]["error_kind"], "execution");
    }
}
