//! webcase interpreter core
//!
//! Turns declarative YAML test cases into sequences of browser operations and
//! records structured per-step results. The browser itself is a collaborator
//! behind the [`Browser`] trait; everything else (selector resolution, step
//! normalization, data-driven expansion, dispatch, settle policies and result
//! aggregation) lives here.

pub mod action;
pub mod browser;
pub mod catalog;
pub mod clock;
pub mod error;
pub mod executor;
pub mod expand;
mod handlers;
pub mod normalize;
pub mod result;
pub mod runner;
pub mod screenshot;
pub mod settle;
pub mod suite;
pub mod value;

pub use action::{ActionKind, AssertionKind, Command, ExpectToken, PrimaryParam};
pub use browser::{
    Browser, BrowserError, BrowserResult, DialogResponse, ElementState, LoadState, MouseButton,
    SelectBy,
};
pub use catalog::{LocatorCatalog, PathExpression};
pub use clock::{poll_until, ManualClock, StepClock, SystemClock};
pub use error::{StepError, StepErrorKind, SuiteError};
pub use executor::{ExecutorConfig, RunContext, StepExecutor};
pub use expand::{expand, CaseInstance};
pub use normalize::{normalize, NormalizedStep};
pub use result::{CaseResult, RunResult, StepResult};
pub use runner::CaseRunner;
pub use screenshot::ScreenshotRegistry;
pub use settle::{SettlePolicy, StabilizeConfig, Stabilization};
pub use suite::{CaseDefinition, TestSuite};

/// Loosely-typed step payloads as they appear in YAML case files
pub use serde_yaml::Value;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
