//! Static checks of suites against the locator catalog

use std::fmt;

use webcase_core::{expand, normalize, Command, LocatorCatalog, StepError, TestSuite};

/// A problem found without running anything
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub suite: String,
    pub case: String,
    /// 1-based step number within the expanded case
    pub step: Option<usize>,
    pub error: StepError,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step {
            Some(step) => write!(f, "{}::{} step {}: {}", self.suite, self.case, step, self.error),
            None => write!(f, "{}::{}: {}", self.suite, self.case, self.error),
        }
    }
}

/// Check one step: shape, action name and catalog paths
pub fn check_step(raw: &webcase_core::Value, catalog: &LocatorCatalog) -> Result<(), StepError> {
    let step = normalize(raw)?;
    let command = Command::lookup(&step.action)?;
    let selector = match step.selector.as_deref() {
        Some(expression) => catalog.resolve(expression)?,
        None => String::new(),
    };
    if command.requires_selector() && selector.is_empty() {
        return Err(StepError::format(format!("action '{}' requires a selector", command)));
    }
    Ok(())
}

/// Check every expanded case of a suite
pub fn validate_suite(name: &str, suite: &TestSuite, catalog: &LocatorCatalog) -> Vec<Issue> {
    let mut issues = Vec::new();
    for (key, definition) in suite.iter() {
        let instances = match expand(key, definition) {
            Ok(instances) => instances,
            Err(error) => {
                issues.push(Issue {
                    suite: name.to_string(),
                    case: key.to_string(),
                    step: None,
                    error,
                });
                continue;
            }
        };
        for instance in instances {
            for (index, raw) in instance.steps.iter().enumerate() {
                if let Err(error) = check_step(raw, catalog) {
                    issues.push(Issue {
                        suite: name.to_string(),
                        case: instance.case_name.clone(),
                        step: Some(index + 1),
                        error,
                    });
                }
            }
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use webcase_core::StepErrorKind;

    const CATALOG: &str = "Login:\n  User: '#user'\n  Button: '#login'\n";

    fn issues(source: &str) -> Vec<Issue> {
        let catalog = LocatorCatalog::from_yaml_str(CATALOG).unwrap();
        let suite = TestSuite::from_yaml_str(source).unwrap();
        validate_suite("login", &suite, &catalog)
    }

    #[test]
    fn test_clean_suite_has_no_issues() {
        let found = issues(
            r##"
login_ok:
  steps:
    - navigate: home
    - input: {selector: "Path(Login.User)", value: ["alice", "bob"]}
    - click: "Path(Login.Button)"
    - assert: {selector: "#banner", expected: visible}
"##,
        );
        assert!(found.is_empty(), "{:?}", found);
    }

    #[test]
    fn test_reports_each_error_kind() {
        let found = issues(
            r##"
broken:
  steps:
    - click: "Path(Login.Missing)"
    - teleport: "#x"
    - "not a step"
    - hover: ""
"##,
        );
        let kinds: Vec<_> = found.iter().map(|i| (i.step, i.error.kind())).collect();
        assert_eq!(
            kinds,
            vec![
                (Some(1), StepErrorKind::Resolution),
                (Some(2), StepErrorKind::Dispatch),
                (Some(3), StepErrorKind::Format),
                (Some(4), StepErrorKind::Format),
            ]
        );
        assert!(found[0].to_string().starts_with("login::broken step 1:"));
    }

    #[test]
    fn test_expansion_errors_are_reported_per_case() {
        let found = issues(
            r##"
two_anchors:
  steps:
    - input: {selector: "#a", value: [1, 2]}
    - input: {selector: "#b", value: [3, 4]}
"##,
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].step, None);
        assert_eq!(found[0].case, "two_anchors");
    }
}
