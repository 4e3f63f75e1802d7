//! Case runner and result aggregation
//!
//! A [`CaseRunner`] owns the [`RunContext`] for the cases it runs: the
//! screenshot registry and the current input value are never shared between
//! runners.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use indexmap::IndexMap;
use tracing::{error, info, warn};

use crate::clock::as_millis_f64;
use crate::error::StepErrorKind;
use crate::executor::{RunContext, StepExecutor};
use crate::expand::{expand, CaseInstance};
use crate::result::{CaseResult, RunResult};
use crate::screenshot::ScreenshotRegistry;
use crate::suite::TestSuite;
use crate::value::value_text;

pub struct CaseRunner {
    executor: StepExecutor,
    context: RunContext,
}

impl CaseRunner {
    pub fn new(executor: StepExecutor) -> Self {
        Self {
            executor,
            context: RunContext::new(),
        }
    }

    pub fn executor(&self) -> &StepExecutor {
        &self.executor
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Screenshots taken by every case this runner has executed
    pub fn screenshots(&self) -> &ScreenshotRegistry {
        &self.context.screenshots
    }

    /// Run one case instance, stopping at the first failed step.
    ///
    /// Never panics: a panic while running is recorded as a failed case.
    pub async fn run_case(&mut self, instance: &CaseInstance) -> CaseResult {
        info!("Running case {}", instance.case_name);
        let start = self.executor.clock().now();
        let mut result = CaseResult::new(&instance.case_name, instance.input_value.clone());
        self.context.current_input = value_text(&instance.input_value);

        let outcome = AssertUnwindSafe(self.run_steps(instance, &mut result))
            .catch_unwind()
            .await;
        if let Err(payload) = outcome {
            let message = format!("runner panicked: {}", panic_message(payload.as_ref()));
            error!("Case {} aborted: {}", instance.case_name, message);
            result.fail(message);
            result.error_kind = Some(StepErrorKind::Panic);
        }

        result.duration_ms = as_millis_f64(self.executor.clock().elapsed_since(start));
        if result.success {
            info!("{}", result.summary());
        } else {
            warn!("{}", result.summary());
        }
        result
    }

    async fn run_steps(&mut self, instance: &CaseInstance, result: &mut CaseResult) {
        for (index, raw) in instance.steps.iter().enumerate() {
            let step = self.executor.execute_raw(raw, index + 1, &mut self.context).await;
            let failed = !step.success;
            result.push_step(step);
            if failed {
                break;
            }
        }
    }

    /// Run instances in order; a failing instance does not stop the rest
    pub async fn run_all(&mut self, instances: &[CaseInstance]) -> RunResult {
        let start = self.executor.clock().now();
        let mut cases = Vec::with_capacity(instances.len());
        for instance in instances {
            cases.push(self.run_case(instance).await);
        }
        RunResult::from_cases(cases, as_millis_f64(self.executor.clock().elapsed_since(start)))
    }

    /// Expand and run the case stored under `name`
    pub async fn execute_test_case(&mut self, suite: &TestSuite, name: &str) -> RunResult {
        let definition = match suite.get(name) {
            Ok(definition) => definition,
            Err(e) => {
                error!("{}", e);
                return RunResult::failed(name, e.to_string());
            }
        };
        match expand(name, definition) {
            Ok(instances) => self.run_all(&instances).await,
            Err(e) => {
                error!("Cannot expand case {}: {}", name, e);
                RunResult::failed(definition.display_name(name), e.to_string())
            }
        }
    }

    /// Run every case of the suite in file order
    pub async fn execute_all(&mut self, suite: &TestSuite) -> IndexMap<String, RunResult> {
        let mut results = IndexMap::with_capacity(suite.len());
        for name in suite.names() {
            let run = self.execute_test_case(suite, name).await;
            results.insert(name.to_string(), run);
        }
        results
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
