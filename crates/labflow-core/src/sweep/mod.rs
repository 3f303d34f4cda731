//! Parameter sweeps: run recipes once per value of one or more variables.

pub mod executor;
pub mod multi;
pub mod report;
pub mod spec;

/// Context variable holding the current loop assignments as an object.
pub const LOOP_CONTEXT_KEY: &str = "loop";

pub use executor::{
    FailurePolicy, LoopError, LoopExecutor, LoopObserver, LoopState, Silent, UnknownPolicy,
};
pub use multi::{MultiSweep, SweepAxis};
pub use report::{AbortReason, IterationReport, IterationStatus, LoopOutcome, LoopReport};
pub use spec::{LoopSpec, LoopSpecError, SweepLimits, SweepValues};
