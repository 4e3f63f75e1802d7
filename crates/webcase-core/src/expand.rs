//! Data-driven case expansion
//!
//! An `input` step whose `value` is a list turns one case definition into one
//! instance per list element. Each instance runs the shared steps with that
//! element injected, plus the follow-up steps registered for it under
//! `loop_steps`:
//!
//! ```yaml
//! search:
//!   steps:
//!     - navigate: home
//!     - input: {selector: Path(Search.Field), value: [alice, bob]}
//!     - take_screenshot: search_{input}.png
//!   loop_steps:
//!     alice:
//!       - assert: {selector: Path(Search.Result), expected: contains, value: alice}
//! ```
//!
//! yields `search_1` (navigate, input alice, assert, screenshot) and
//! `search_2` (navigate, input bob, screenshot).

use serde_yaml::Value;
use tracing::warn;

use crate::error::StepError;
use crate::suite::CaseDefinition;

const INPUT_ACTION: &str = "input";

/// One materialized case, ready to run
#[derive(Debug, Clone, PartialEq)]
pub struct CaseInstance {
    pub case_name: String,
    /// The injected element, or an empty string for plain cases
    pub input_value: Value,
    pub steps: Vec<Value>,
}

/// Where a data-driven input step keeps its `value`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueSlot {
    /// `{input: ..., value: [...]}` or `{action: input, value: [...]}`
    Record,
    /// `{input: {value: [...]}}`
    Payload,
}

/// Expand a case definition into its instances; never returns an empty list.
///
/// More than one list-valued input step is rejected rather than guessing
/// which one drives the expansion.
pub fn expand(key: &str, definition: &CaseDefinition) -> Result<Vec<CaseInstance>, StepError> {
    let name = definition.display_name(key);

    let anchors: Vec<(usize, ValueSlot, &Vec<Value>)> = definition
        .steps
        .iter()
        .enumerate()
        .filter_map(|(index, step)| data_driven_values(step).map(|(slot, values)| (index, slot, values)))
        .collect();

    let (anchor_index, slot, values) = match anchors.as_slice() {
        [] => {
            return Ok(vec![CaseInstance {
                case_name: name.to_string(),
                input_value: Value::from(""),
                steps: definition.steps.clone(),
            }])
        }
        [single] => *single,
        many => {
            let positions: Vec<String> = many.iter().map(|(i, _, _)| (i + 1).to_string()).collect();
            return Err(StepError::format(format!(
                "case '{}' has data-driven input steps at positions {}; only one is supported",
                name,
                positions.join(", ")
            )));
        }
    };

    if values.is_empty() {
        return Err(StepError::format(format!(
            "case '{}' has a data-driven input step with an empty value list",
            name
        )));
    }

    let before = &definition.steps[..anchor_index];
    let anchor = &definition.steps[anchor_index];
    let after = &definition.steps[anchor_index + 1..];

    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            if matches!(value, Value::Sequence(_) | Value::Mapping(_)) {
                return Err(StepError::format(format!(
                    "case '{}' data-driven value #{} must be a scalar",
                    name,
                    i + 1
                )));
            }

            let follow_up = loop_steps_for(definition, name, value);
            let mut steps = Vec::with_capacity(before.len() + 1 + follow_up.len() + after.len());
            steps.extend_from_slice(before);
            steps.push(with_value(anchor, slot, value.clone()));
            steps.extend(follow_up);
            steps.extend_from_slice(after);

            Ok(CaseInstance {
                case_name: format!("{}_{}", name, i + 1),
                input_value: value.clone(),
                steps,
            })
        })
        .collect()
}

fn data_driven_values(step: &Value) -> Option<(ValueSlot, &Vec<Value>)> {
    let record = step.as_mapping()?;

    if let Some(action) = record.get("action") {
        if action.as_str() != Some(INPUT_ACTION) {
            return None;
        }
        return record.get("value")?.as_sequence().map(|v| (ValueSlot::Record, v));
    }

    let (key, payload) = record.iter().next()?;
    if key.as_str() != Some(INPUT_ACTION) {
        return None;
    }
    if record.len() == 1 {
        return payload
            .as_mapping()?
            .get("value")?
            .as_sequence()
            .map(|v| (ValueSlot::Payload, v));
    }
    record.get("value")?.as_sequence().map(|v| (ValueSlot::Record, v))
}

fn with_value(step: &Value, slot: ValueSlot, value: Value) -> Value {
    let mut step = step.clone();
    if let Value::Mapping(record) = &mut step {
        match slot {
            ValueSlot::Record => {
                record.insert(Value::from("value"), value);
            }
            ValueSlot::Payload => {
                if let Some(Value::Mapping(payload)) = record.get_mut(INPUT_ACTION) {
                    payload.insert(Value::from("value"), value);
                }
            }
        }
    }
    step
}

fn loop_steps_for(definition: &CaseDefinition, name: &str, value: &Value) -> Vec<Value> {
    match definition.loop_steps.iter().find(|(key, _)| *key == value) {
        Some((_, Value::Sequence(steps))) => steps.clone(),
        Some((_, Value::Null)) => Vec::new(),
        Some((_, other)) => {
            warn!(
                "loop_steps entry for {:?} in case '{}' is not a list ({:?}); ignoring it",
                value, name, other
            );
            Vec::new()
        }
        None => {
            if !definition.loop_steps.is_empty() {
                warn!("No loop_steps entry for {:?} in case '{}'", value, name);
            }
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StepErrorKind;

    fn definition(yaml: &str) -> CaseDefinition {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_plain_case_yields_one_instance() {
        let def = definition("steps:\n  - click: '#a'\n  - wait: 100\n");
        let instances = expand("plain", &def).unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].case_name, "plain");
        assert_eq!(instances[0].input_value, Value::from(""));
        assert_eq!(instances[0].steps, def.steps);
    }

    #[test]
    fn test_loop_steps_spliced_after_anchor() {
        let def = definition(
            r##"
steps:
  - input: {selector: "Path(S.F)", value: ["a", "b"]}
loop_steps:
  a:
    - click: {selector: "Path(S.Go)"}
"##,
        );
        let instances = expand("search", &def).unwrap();
        assert_eq!(instances.len(), 2);

        assert_eq!(instances[0].case_name, "search_1");
        assert_eq!(instances[0].input_value, Value::from("a"));
        assert_eq!(instances[0].steps.len(), 2);
        let anchor: Value = serde_yaml::from_str(r#"input: {selector: "Path(S.F)", value: "a"}"#).unwrap();
        assert_eq!(instances[0].steps[0], anchor);

        assert_eq!(instances[1].case_name, "search_2");
        assert_eq!(instances[1].input_value, Value::from("b"));
        assert_eq!(instances[1].steps.len(), 1);
    }

    #[test]
    fn test_instance_step_count() {
        let def = definition(
            r##"
case_name: import
steps:
  - navigate: home
  - click: "#open"
  - input: "#file"
    value: [1, 2, 3]
  - click: "#save"
loop_steps:
  2:
    - wait: 100
    - assert: {selector: "#msg", expected: visible}
  3: []
"##,
        );
        let instances = expand("import_05", &def).unwrap();
        let counts: Vec<usize> = instances.iter().map(|i| i.steps.len()).collect();
        assert_eq!(counts, vec![4, 6, 4]);
        assert_eq!(instances[2].case_name, "import_3");
        assert_eq!(instances[1].input_value, Value::from(2));

        let injected = instances[1].steps[2].as_mapping().unwrap().get("value").unwrap();
        assert_eq!(injected, &Value::from(2));
        assert_eq!(instances[1].steps[5], def.steps[3]);
    }

    #[test]
    fn test_canonical_anchor() {
        let def = definition("steps:\n  - action: input\n    target: '#q'\n    value: [x, y]\n");
        let instances = expand("c", &def).unwrap();
        assert_eq!(instances.len(), 2);
        assert_eq!(
            instances[1].steps[0].as_mapping().unwrap().get("value"),
            Some(&Value::from("y"))
        );
    }

    #[test]
    fn test_multiple_anchors_rejected() {
        let def = definition(
            "steps:\n  - input: {selector: '#a', value: [1, 2]}\n  - input: {selector: '#b', value: [3]}\n",
        );
        let err = expand("twice", &def).unwrap_err();
        assert_eq!(err.kind(), StepErrorKind::Format);
        assert!(err.to_string().contains("positions 1, 2"));
    }

    #[test]
    fn test_empty_list_rejected() {
        let def = definition("steps:\n  - input: {selector: '#a', value: []}\n");
        assert_eq!(expand("empty", &def).unwrap_err().kind(), StepErrorKind::Format);
    }

    #[test]
    fn test_non_scalar_element_rejected() {
        let def = definition("steps:\n  - input: {selector: '#a', value: [[1, 2]]}\n");
        assert_eq!(expand("nested", &def).unwrap_err().kind(), StepErrorKind::Format);
    }

    #[test]
    fn test_scalar_input_is_not_an_anchor() {
        let def = definition("steps:\n  - input: {selector: '#a', value: plain}\n");
        let instances = expand("one", &def).unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].case_name, "one");
    }
}
