//! Rule-based loan approval: an expert system that evaluates applicants with
//! forward and backward chaining and explains every decision.

pub mod config;
pub mod dataset;
pub mod error;
pub mod inference;
pub mod telemetry;
