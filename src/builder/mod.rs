//! Target lifecycle execution.
//!
//! This module drives resolved targets through configure, build, package and
//! test, and defines the boundary contracts of the external steps.

pub mod cmake;
pub mod errors;
pub mod events;
pub mod executor;
pub mod lifecycle;
pub mod report;
pub mod steps;

pub use cmake::CMakeStep;
pub use errors::TargetError;
pub use events::{BuildEvent, EventSink, JsonLines};
pub use executor::{ExecutorOptions, FailurePolicy, LifecycleExecutor, TestScope};
pub use lifecycle::{LifecycleState, TargetRecord};
pub use report::{Abandoned, BuildReport, ExitKind};
pub use steps::{
    BuildRequest, CommandTestRunner, Fetch, NativeBuild, TestRequest, TestRunner,
};
