//! Hiring pipeline core: stage model, transition validation, audit ledger, and the
//! hire-triggered vacancy cascade, plus the HTTP router that exposes them.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
