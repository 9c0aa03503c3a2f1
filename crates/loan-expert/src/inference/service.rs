use std::sync::Arc;

use super::engine::{EvaluationError, RuleEngine};
use super::outcome::{BatchEvaluation, EvaluationResult};
use super::rules::{RuleBaseStatistics, RuleLookupError, RuleSummary};
use super::validation::ApplicantSubmission;

/// Where the reference applicant list comes from.
pub trait ApplicantSource: Send + Sync {
    fn applicants(&self) -> Result<Vec<ApplicantSubmission>, ApplicantSourceError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApplicantSourceError {
    #[error("applicant dataset unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LoanServiceError {
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Lookup(#[from] RuleLookupError),
    #[error(transparent)]
    Source(#[from] ApplicantSourceError),
    #[error("evaluation worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Service composing the rule engine with the applicant dataset.
pub struct LoanEvaluationService<S> {
    engine: RuleEngine,
    source: Arc<S>,
}

impl<S> LoanEvaluationService<S>
where
    S: ApplicantSource + 'static,
{
    pub fn new(engine: RuleEngine, source: Arc<S>) -> Self {
        Self { engine, source }
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    pub fn evaluate(
        &self,
        submission: &ApplicantSubmission,
    ) -> Result<EvaluationResult, LoanServiceError> {
        Ok(self.engine.evaluate(submission)?)
    }

    pub fn evaluate_batch(&self, submissions: &[ApplicantSubmission]) -> BatchEvaluation {
        self.engine.evaluate_all(submissions)
    }

    pub fn applicants(&self) -> Result<Vec<ApplicantSubmission>, LoanServiceError> {
        Ok(self.source.applicants()?)
    }

    pub fn rules(&self) -> Vec<RuleSummary> {
        self.engine.list_rules()
    }

    pub fn rule(&self, rule_id: &str) -> Result<RuleSummary, LoanServiceError> {
        Ok(self.engine.get_rule(rule_id)?.summary())
    }

    pub fn rule_statistics(&self) -> RuleBaseStatistics {
        self.engine.rule_statistics()
    }
}
