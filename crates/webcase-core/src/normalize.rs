//! Step normalization
//!
//! Case files write steps in several shapes:
//!
//! ```yaml
//! - wait: 1000                                  # single key, scalar payload
//! - click: Path(Login.Button)
//! - input: {selector: Path(Login.User), value: alice}   # single key, mapping payload
//! - assert: Path(Home.Banner)                   # multiple keys, first names the action
//!   expected: contains
//!   value: Welcome
//! - action: click                               # canonical record
//!   target: "#submit"
//! ```
//!
//! All of them reduce to one [`NormalizedStep`].

use std::time::Duration;

use serde_yaml::{Mapping, Value};

use crate::action::{Command, PrimaryParam};
use crate::error::StepError;
use crate::value::{as_millis, non_empty_text};

const ACTION_KEY: &str = "action";
const SELECTOR_KEY: &str = "selector";
const ALIAS_KEYS: [&str; 3] = ["element", "target", "locator"];

/// A step reduced to its action and named parameters
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedStep {
    pub action: String,
    /// `None` for names outside the vocabulary; the executor reports those
    pub command: Option<Command>,
    /// Selector expression, not yet resolved against the catalog
    pub selector: Option<String>,
    pub value: Value,
    pub expected: Value,
    pub timeout: Option<Duration>,
    pub description: Option<String>,
}

impl NormalizedStep {
    pub fn new(action: impl Into<String>) -> Self {
        let action = action.into();
        Self {
            command: Command::from_wire(&action),
            action,
            selector: None,
            value: Value::Null,
            expected: Value::Null,
            timeout: None,
            description: None,
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_expected(mut self, expected: impl Into<Value>) -> Self {
        self.expected = expected.into();
        self
    }
}

/// Reduce one raw step record to a [`NormalizedStep`].
pub fn normalize(raw: &Value) -> Result<NormalizedStep, StepError> {
    let record = match raw {
        Value::Mapping(map) if !map.is_empty() => map,
        Value::Mapping(_) => return Err(StepError::format("step is an empty mapping")),
        other => {
            return Err(StepError::format(format!(
                "step must be a mapping, got {}",
                describe_kind(other)
            )))
        }
    };

    let step = if let Some(action) = record.get(ACTION_KEY) {
        normalize_canonical(record, action)?
    } else {
        normalize_keyed(record)?
    };

    if let Some(command) = step.command {
        if command.requires_selector() && step.selector.is_none() {
            return Err(StepError::format(format!(
                "action '{}' requires a selector",
                step.action
            )));
        }
    }

    Ok(step)
}

fn normalize_canonical(record: &Mapping, action: &Value) -> Result<NormalizedStep, StepError> {
    let action = action
        .as_str()
        .filter(|a| !a.is_empty())
        .ok_or_else(|| StepError::format("'action' must be a non-empty string"))?;

    let mut step = NormalizedStep::new(action);
    step.selector = first_text(record, &[SELECTOR_KEY, "target", "element", "locator"]);
    apply_named_params(&mut step, record);
    Ok(step)
}

fn normalize_keyed(record: &Mapping) -> Result<NormalizedStep, StepError> {
    let (key, payload) = record
        .iter()
        .next()
        .ok_or_else(|| StepError::format("step is an empty mapping"))?;
    let action = key
        .as_str()
        .filter(|a| !a.is_empty())
        .ok_or_else(|| StepError::format(format!("action key must be a string, got {}", describe_kind(key))))?;

    let mut step = NormalizedStep::new(action);

    if record.len() == 1 {
        match payload {
            Value::Mapping(params) => {
                step.selector = select_selector(&step, params, params.get(action));
                apply_named_params(&mut step, params);
            }
            Value::Sequence(_) => {
                return Err(StepError::format(format!(
                    "payload of '{}' must be a scalar or a mapping",
                    action
                )))
            }
            scalar => route_primary(&mut step, scalar),
        }
        return Ok(step);
    }

    // Multiple keys: the first names the action, the rest are parameters.
    for other in record.keys().skip(1) {
        if let Some(name) = other.as_str() {
            if Command::from_wire(name).is_some() {
                return Err(StepError::format(format!(
                    "ambiguous step: both '{}' and '{}' name actions",
                    action, name
                )));
            }
        }
    }
    match payload {
        Value::Mapping(_) | Value::Sequence(_) => {
            return Err(StepError::format(format!(
                "ambiguous step: '{}' carries a nested payload alongside named parameters",
                action
            )))
        }
        _ => {}
    }

    match primary_param(&step) {
        PrimaryParam::Selector => step.selector = select_selector(&step, record, Some(payload)),
        PrimaryParam::Value => step.value = payload.clone(),
        PrimaryParam::Expected => step.expected = payload.clone(),
    }
    if primary_param(&step) != PrimaryParam::Selector {
        step.selector = first_text(record, &[SELECTOR_KEY, "element", "target", "locator"]);
    }
    apply_named_params(&mut step, record);
    Ok(step)
}

/// Selector precedence: `input`/`assert` prefer the `selector` field over
/// their own key, every other action prefers its own key.
fn select_selector(step: &NormalizedStep, params: &Mapping, own: Option<&Value>) -> Option<String> {
    let own = own.and_then(non_empty_text);
    let fields = || first_text(params, &[SELECTOR_KEY, ALIAS_KEYS[0], ALIAS_KEYS[1], ALIAS_KEYS[2]]);

    let prefers_field = step.command.map(|c| c.prefers_selector_field()).unwrap_or(false);
    if prefers_field {
        fields().or(own)
    } else {
        own.or_else(fields)
    }
}

fn route_primary(step: &mut NormalizedStep, payload: &Value) {
    if matches!(payload, Value::Null) {
        return;
    }
    match primary_param(step) {
        PrimaryParam::Selector => step.selector = non_empty_text(payload),
        PrimaryParam::Value => step.value = payload.clone(),
        PrimaryParam::Expected => step.expected = payload.clone(),
    }
}

/// Named `value`/`expected`/`timeout`/`description` win over shorthand
fn apply_named_params(step: &mut NormalizedStep, params: &Mapping) {
    if let Some(value) = params.get("value") {
        if !matches!(value, Value::Null) {
            step.value = value.clone();
        }
    }
    if let Some(expected) = params.get("expected") {
        if !matches!(expected, Value::Null) {
            step.expected = expected.clone();
        }
    }
    if let Some(timeout) = params.get("timeout").and_then(as_millis) {
        step.timeout = Some(Duration::from_millis(timeout));
    }
    if let Some(description) = params.get("description").and_then(non_empty_text) {
        step.description = Some(description);
    }
}

fn primary_param(step: &NormalizedStep) -> PrimaryParam {
    step.command
        .map(|c| c.primary_param())
        .unwrap_or(PrimaryParam::Selector)
}

fn first_text(params: &Mapping, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| params.get(*key))
        .find_map(non_empty_text)
}

fn describe_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
