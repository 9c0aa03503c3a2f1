use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{Applicant, ApplicantId, Decision, FactValue};
use super::engine::EvaluationError;
use super::rules::RuleId;
use super::trace::{Trace, TraceEntry};

/// Result of one inference chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainOutcome {
    pub decision: Decision,
    pub decided_by: Option<RuleId>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub derived_facts: BTreeMap<String, FactValue>,
    pub trace: Trace,
}

/// Auditable outcome of evaluating one applicant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub applicant_id: ApplicantId,
    pub applicant_data: Applicant,
    pub final_decision: Decision,
    pub forward_chaining: Option<ChainOutcome>,
    pub backward_chaining: Option<ChainOutcome>,
    pub reasoning: String,
    pub reconciliation: Vec<TraceEntry>,
}

/// Decision counts across a batch. Every label is present, and the counts
/// always sum to `total_applicants`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total_applicants: usize,
    pub decisions: BTreeMap<Decision, usize>,
}

impl Default for Statistics {
    fn default() -> Self {
        Self {
            total_applicants: 0,
            decisions: Decision::ALL.into_iter().map(|label| (label, 0)).collect(),
        }
    }
}

impl Statistics {
    pub fn record(&mut self, decision: Decision) {
        self.total_applicants += 1;
        *self.decisions.entry(decision).or_insert(0) += 1;
    }

    pub fn count(&self, decision: Decision) -> usize {
        self.decisions.get(&decision).copied().unwrap_or(0)
    }

    pub fn from_decisions(decisions: impl IntoIterator<Item = Decision>) -> Self {
        let mut statistics = Self::default();
        for decision in decisions {
            statistics.record(decision);
        }
        statistics
    }
}

/// Per-applicant outcomes of a batch, in input order, plus statistics over
/// the successful evaluations.
#[derive(Debug)]
pub struct BatchEvaluation {
    pub results: Vec<Result<EvaluationResult, EvaluationError>>,
    pub statistics: Statistics,
}

impl BatchEvaluation {
    pub fn successes(&self) -> impl Iterator<Item = &EvaluationResult> {
        self.results.iter().filter_map(|result| result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &EvaluationError)> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(index, result)| result.as_ref().err().map(|error| (index, error)))
    }
}
