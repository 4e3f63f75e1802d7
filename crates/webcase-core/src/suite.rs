//! YAML test suites

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::SuiteError;

/// One authored, possibly data-driven, test case
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseDefinition {
    /// Display name; defaults to the suite key
    #[serde(default)]
    pub case_name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Raw step records, normalized lazily at execution time
    #[serde(default)]
    pub steps: Vec<Value>,

    /// Follow-up steps keyed by data-driven input value
    #[serde(default)]
    pub loop_steps: Mapping,
}

impl CaseDefinition {
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.case_name.as_deref().filter(|n| !n.is_empty()).unwrap_or(key)
    }
}

/// Case definitions keyed by unique case name, in file order
#[derive(Debug, Clone, Default)]
pub struct TestSuite {
    cases: IndexMap<String, CaseDefinition>,
    source: Option<PathBuf>,
}

impl TestSuite {
    pub fn new(cases: IndexMap<String, CaseDefinition>) -> Self {
        Self { cases, source: None }
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, SuiteError> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        let cases: IndexMap<String, CaseDefinition> = serde_yaml::from_str(source)?;
        Ok(Self::new(cases))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SuiteError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| SuiteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut suite = Self::from_yaml_str(&source)?;
        suite.source = Some(path.to_path_buf());
        Ok(suite)
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn get(&self, name: &str) -> Result<&CaseDefinition, SuiteError> {
        self.cases
            .get(name)
            .ok_or_else(|| SuiteError::CaseNotFound(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cases.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CaseDefinition)> {
        self.cases.iter().map(|(name, case)| (name.as_str(), case))
    }

    /// Keep only the cases whose name satisfies `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.cases.retain(|name, _| keep(name));
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SUITE: &str = r##"
search_01:
  case_name: fuzzy search
  steps:
    - navigate: home
    - input:
        selector: Path(Search.Field)
        value: [alice, bob]
  loop_steps:
    alice:
      - assert:
          selector: Path(Search.Result)
          expected: contains
          value: alice
import_02:
  steps:
    - click: "#import"
"##;

    #[test]
    fn test_parse_preserves_order() {
        let suite = TestSuite::from_yaml_str(SUITE).unwrap();
        assert_eq!(suite.names().collect::<Vec<_>>(), vec!["search_01", "import_02"]);

        let case = suite.get("search_01").unwrap();
        assert_eq!(case.display_name("search_01"), "fuzzy search");
        assert_eq!(case.steps.len(), 2);
        assert_eq!(case.loop_steps.len(), 1);

        let case = suite.get("import_02").unwrap();
        assert_eq!(case.display_name("import_02"), "import_02");
        assert!(case.loop_steps.is_empty());
    }

    #[test]
    fn test_missing_case() {
        let suite = TestSuite::from_yaml_str(SUITE).unwrap();
        let err = suite.get("nope").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SUITE.as_bytes()).unwrap();

        let suite = TestSuite::load(file.path()).unwrap();
        assert_eq!(suite.len(), 2);
        assert_eq!(suite.source(), Some(file.path()));
    }

    #[test]
    fn test_empty_and_invalid_sources() {
        assert!(TestSuite::from_yaml_str("").unwrap().is_empty());
        assert!(TestSuite::from_yaml_str("- just\n- a list\n").is_err());
        assert!(matches!(
            TestSuite::load("/definitely/not/here.yaml"),
            Err(SuiteError::Io { .. })
        ));
    }

    #[test]
    fn test_retain() {
        let mut suite = TestSuite::from_yaml_str(SUITE).unwrap();
        suite.retain(|name| name.contains("import"));
        assert_eq!(suite.names().collect::<Vec<_>>(), vec!["import_02"]);
    }
}
