//! Locator catalog and `Path(...)` selector expressions
//!
//! The catalog is a nested YAML mapping (page -> module -> element) whose
//! leaves are concrete selectors. Steps refer to leaves symbolically:
//!
//! ```text
//! Path(Login.Button)            -> "#login-btn"
//! Path(Search.Row).f(Alice)     -> "tr:has-text('Alice')"   (leaf "tr:has-text('{0}')")
//! ```

use std::path::Path;

use serde_yaml::Value;

use crate::error::{Result, StepError, SuiteError};

const PATH_PREFIX: &str = "Path(";
const TEMPLATE_SUFFIX: &str = ".f(";

// ----------------------------------------------------------------------------
// Path Expressions
// ----------------------------------------------------------------------------

/// A parsed `Path(<dotted.path>)` expression with its optional `.f(<arg>)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathExpression<'a> {
    pub path: &'a str,
    pub argument: Option<&'a str>,
}

impl<'a> PathExpression<'a> {
    /// Whether a selector string is written as a path expression
    pub fn is_path_expression(expression: &str) -> bool {
        expression.trim_start().starts_with(PATH_PREFIX)
    }

    /// Parse a path expression; returns `Ok(None)` for plain selectors.
    pub fn parse(expression: &'a str) -> Result<Option<Self>> {
        let trimmed = expression.trim();
        let Some(rest) = trimmed.strip_prefix(PATH_PREFIX) else {
            return Ok(None);
        };

        let close = rest
            .find(')')
            .ok_or_else(|| StepError::format(format!("unterminated path expression '{}'", trimmed)))?;
        let path = rest[..close].trim();
        let tail = &rest[close + 1..];

        if path.is_empty() || path.split('.').any(|segment| segment.trim().is_empty()) {
            return Err(StepError::format(format!(
                "path expression '{}' has an empty segment",
                trimmed
            )));
        }

        let argument = if tail.is_empty() {
            None
        } else {
            let inner = tail
                .strip_prefix(TEMPLATE_SUFFIX)
                .and_then(|t| t.strip_suffix(')'))
                .ok_or_else(|| {
                    StepError::format(format!(
                        "unexpected trailing text '{}' in path expression '{}'",
                        tail, trimmed
                    ))
                })?;
            Some(inner)
        };

        Ok(Some(Self { path, argument }))
    }

    pub fn segments(&self) -> impl Iterator<Item = &'a str> {
        self.path.split('.').map(str::trim)
    }
}

// ----------------------------------------------------------------------------
// Locator Catalog
// ----------------------------------------------------------------------------

/// Nested mapping of symbolic element names to selectors
#[derive(Debug, Clone, Default)]
pub struct LocatorCatalog {
    root: Value,
}

impl LocatorCatalog {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    pub fn from_yaml_str(source: &str) -> std::result::Result<Self, SuiteError> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        let root: Value = serde_yaml::from_str(source)?;
        match root {
            Value::Mapping(_) | Value::Null => Ok(Self { root }),
            _ => Err(SuiteError::Format(
                "locator catalog must be a mapping at the top level".to_string(),
            )),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, SuiteError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| SuiteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&source)
    }

    /// Resolve a selector expression to a concrete selector.
    ///
    /// Plain selectors (anything not written as `Path(...)`) pass through
    /// unchanged. Resolution is side-effect free, so the same expression
    /// against the same catalog always yields the same selector.
    pub fn resolve(&self, expression: &str) -> Result<String> {
        match PathExpression::parse(expression)? {
            Some(parsed) => self.resolve_path(&parsed),
            None => Ok(expression.to_string()),
        }
    }

    pub fn resolve_path(&self, expression: &PathExpression<'_>) -> Result<String> {
        let leaf = self.lookup(expression)?;
        match expression.argument {
            Some(argument) => apply_template(expression.path, &leaf, argument),
            None => Ok(leaf),
        }
    }

    fn lookup(&self, expression: &PathExpression<'_>) -> Result<String> {
        let mut node = &self.root;
        for segment in expression.segments() {
            let Value::Mapping(map) = node else {
                return Err(StepError::Resolution {
                    path: expression.path.to_string(),
                    reason: format!("'{}' is below a selector leaf", segment),
                });
            };
            node = map
                .get(segment)
                .or_else(|| {
                    segment
                        .parse::<i64>()
                        .ok()
                        .and_then(|n| map.get(Value::from(n)))
                })
                .ok_or_else(|| StepError::Resolution {
                    path: expression.path.to_string(),
                    reason: format!("missing key '{}'", segment),
                })?;
        }

        match node {
            Value::String(selector) => Ok(selector.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err(StepError::Resolution {
                path: expression.path.to_string(),
                reason: "does not name a selector leaf".to_string(),
            }),
        }
    }
}

/// Substitute `argument` into the single placeholder of `template`.
///
/// `{0}` may repeat (every occurrence receives the same argument); `{}` may
/// appear once. The argument is inserted verbatim.
fn apply_template(path: &str, template: &str, argument: &str) -> Result<String> {
    let positional = template.matches("{}").count();
    let indexed = template.matches("{0}").count();

    match (positional, indexed) {
        (0, 0) => Err(StepError::format(format!(
            "'{}' resolves to '{}', which is not a format template",
            path, template
        ))),
        (1, 0) => Ok(template.replacen("{}", argument, 1)),
        (0, _) => Ok(template.replace("{0}", argument)),
        _ => Err(StepError::format(format!(
            "template '{}' at '{}' has more than one placeholder",
            template, path
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StepErrorKind;

    fn catalog() -> LocatorCatalog {
        LocatorCatalog::from_yaml_str(
            r##"
Login:
  Button: "#login-btn"
  Form:
    User: "input[name=user]"
Search:
  Field: "#field-{0}"
  Row: "tr:nth-child({})"
  Twice: "{} {}"
"##,
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_simple_path() {
        assert_eq!(catalog().resolve("Path(Login.Button)").unwrap(), "#login-btn");
        assert_eq!(
            catalog().resolve("Path(Login.Form.User)").unwrap(),
            "input[name=user]"
        );
    }

    #[test]
    fn test_resolve_template() {
        let catalog = catalog();
        assert_eq!(catalog.resolve("Path(Search.Field).f(abc)").unwrap(), "#field-abc");
        assert_eq!(catalog.resolve("Path(Search.Row).f(3)").unwrap(), "tr:nth-child(3)");
    }

    #[test]
    fn test_plain_selector_passes_through() {
        assert_eq!(catalog().resolve("#raw > .css").unwrap(), "#raw > .css");
    }

    #[test]
    fn test_missing_segment_is_resolution_error() {
        let err = catalog().resolve("Path(Login.Nope)").unwrap_err();
        assert_eq!(err.kind(), StepErrorKind::Resolution);
        assert!(err.to_string().contains("Nope"));

        let err = catalog().resolve("Path(Missing.Button)").unwrap_err();
        assert_eq!(err.kind(), StepErrorKind::Resolution);
    }

    #[test]
    fn test_section_is_not_a_leaf() {
        let err = catalog().resolve("Path(Login.Form)").unwrap_err();
        assert_eq!(err.kind(), StepErrorKind::Resolution);
    }

    #[test]
    fn test_template_on_plain_leaf_is_format_error() {
        let err = catalog().resolve("Path(Login.Button).f(x)").unwrap_err();
        assert_eq!(err.kind(), StepErrorKind::Format);
    }

    #[test]
    fn test_multi_placeholder_is_format_error() {
        let err = catalog().resolve("Path(Search.Twice).f(x)").unwrap_err();
        assert_eq!(err.kind(), StepErrorKind::Format);
    }

    #[test]
    fn test_malformed_expressions() {
        for expr in ["Path(Login.Button", "Path()", "Path(Login..Button)", "Path(Login.Button).g(x)"] {
            let err = catalog().resolve(expr).unwrap_err();
            assert_eq!(err.kind(), StepErrorKind::Format, "{}", expr);
        }
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let catalog = catalog();
        let first = catalog.resolve("Path(Search.Field).f(q)").unwrap();
        let second = catalog.resolve("Path(Search.Field).f(q)").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_argument_verbatim() {
        let parsed = PathExpression::parse("Path(A.B).f(x (y))").unwrap().unwrap();
        assert_eq!(parsed.path, "A.B");
        assert_eq!(parsed.argument, Some("x (y)"));
        assert!(PathExpression::parse("#id").unwrap().is_none());
    }
}
