//! Loan rule engine: fact model, production rules, forward and backward
//! chaining, conflict resolution, and the reasoning trace.

pub mod aggregate;
pub mod backward;
mod batch;
pub mod config;
pub mod conflict;
pub mod domain;
pub mod engine;
pub mod forward;
pub mod memory;
pub mod outcome;
pub mod router;
pub mod rules;
pub mod service;
pub mod trace;
pub mod validation;

#[cfg(test)]
mod tests;

pub use aggregate::{reconcile, Reconciliation};
pub use backward::BackwardChainer;
pub use config::{ChainingMode, EngineConfig};
pub use conflict::{ConflictResolver, ConflictStrategy};
pub use domain::{Applicant, ApplicantId, DebtLevel, Decision, EmploymentStatus, FactKey, FactValue};
pub use engine::{EvaluationError, RuleEngine};
pub use forward::ForwardChainer;
pub use memory::WorkingMemory;
pub use outcome::{BatchEvaluation, ChainOutcome, EvaluationResult, Statistics};
pub use router::{evaluation_router, CUSTOM_APPLICANT_ID};
pub use rules::{
    Comparison, Conclusion, Condition, Goal, Rule, RuleBaseStatistics, RuleId, RuleLookupError,
    RuleRepository, RuleRepositoryError, RuleSummary,
};
pub use service::{ApplicantSource, ApplicantSourceError, LoanEvaluationService, LoanServiceError};
pub use trace::{ChainKind, Trace, TraceEntry, TraceEvent, TraceLevel, TraceRecorder};
pub use validation::{ApplicantSubmission, ValidationError};
