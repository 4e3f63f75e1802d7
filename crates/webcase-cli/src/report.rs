//! Run reports: console summaries and the JSON report file

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use webcase_core::RunResult;

use crate::error::Result;

/// Results of one suite file in one browser
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub suite: String,
    pub path: PathBuf,
    pub browser: String,
    /// Keyed by authored case name, in file order
    pub cases: IndexMap<String, RunResult>,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.cases.values().map(|r| r.total_success).sum()
    }

    pub fn failed(&self) -> usize {
        self.cases.values().map(|r| r.total_failed).sum()
    }

    pub fn success(&self) -> bool {
        self.cases.values().all(|r| r.success)
    }

    /// Print one PASS/FAIL line per executed case instance
    pub fn print(&self) {
        println!("{} [{}]", self.path.display(), self.browser);
        for run in self.cases.values() {
            for case in &run.test_cases {
                println!("  {}", case.summary());
            }
        }
    }
}

/// Everything one invocation of `webcase run` produced
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub success: bool,
    pub total_success: usize,
    pub total_failed: usize,
    pub suites: Vec<SuiteReport>,
}

impl Report {
    pub fn new(suites: Vec<SuiteReport>) -> Self {
        let total_success = suites.iter().map(SuiteReport::passed).sum();
        let total_failed = suites.iter().map(SuiteReport::failed).sum();
        Self {
            success: suites.iter().all(SuiteReport::success),
            total_success,
            total_failed,
            suites,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} passed, {} failed, {} suite run(s)",
            self.total_success,
            self.total_failed,
            self.suites.len()
        )
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webcase_core::{CaseResult, Value};

    fn suite_report(outcomes: &[(&str, bool)]) -> SuiteReport {
        let mut cases = IndexMap::new();
        for (name, success) in outcomes {
            let mut case = CaseResult::new(*name, Value::from(""));
            if !success {
                case.fail("boom");
            }
            cases.insert(name.to_string(), RunResult::from_cases(vec![case], 1.0));
        }
        SuiteReport {
            suite: "login".to_string(),
            path: PathBuf::from("test_data/login.yaml"),
            browser: "chrome".to_string(),
            cases,
        }
    }

    #[test]
    fn test_report_totals() {
        let report = Report::new(vec![
            suite_report(&[("a", true), ("b", false)]),
            suite_report(&[("c", true)]),
        ]);
        assert!(!report.success);
        assert_eq!(report.total_success, 2);
        assert_eq!(report.total_failed, 1);
        assert_eq!(report.summary(), "2 passed, 1 failed, 2 suite run(s)");
    }

    #[test]
    fn test_write_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.json");
        Report::new(vec![suite_report(&[("a", true)])]).write_json(&path).unwrap();

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["suites"][0]["browser"], "chrome");
        assert_eq!(json["suites"][0]["cases"]["a"]["test_cases"][0]["case_name"], "a");
    }
}
