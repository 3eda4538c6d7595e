//! Adaptive visual-acuity test.
//!
//! [`step`] is a pure state-transition function: it inspects a [`VisionTest`]
//! and returns the [`Directive`] the host must carry out next. [`TestDriver`]
//! is that host, wiring directives to the motor, display and subject input.

mod driver;
mod machine;
mod table;

pub use driver::{SessionOutcome, TestDriver, TestRig};
pub use machine::{Directive, Instruction, TestOutcome, TestState, VisionTest, step};
pub use table::{DEFAULT_DISTANCES, DistanceTable};
