//! Intake, admissions, and cohort enrollment workflows.
//!
//! The `workflows` tree carries the domain: the intake form engine over an editable
//! schema, the admissions review state machine, and the enrollment converter that turns
//! paid registrations into students of a capacity-bounded cycle.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
