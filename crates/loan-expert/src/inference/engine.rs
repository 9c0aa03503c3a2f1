use std::sync::Arc;

use tracing::debug;

use super::aggregate::reconcile;
use super::backward::BackwardChainer;
use super::config::EngineConfig;
use super::conflict::ConflictResolver;
use super::domain::{Applicant, ApplicantId};
use super::forward::ForwardChainer;
use super::outcome::EvaluationResult;
use super::rules::{Rule, RuleBaseStatistics, RuleLookupError, RuleRepository, RuleSummary};
use super::validation::{ApplicantSubmission, ValidationError};

/// Failure of a single evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("invalid applicant: {0}")]
    Validation(#[from] ValidationError),
    #[error("forward chaining for applicant {applicant_id} exceeded its cycle cap of {cap}")]
    CycleCapExceeded { applicant_id: ApplicantId, cap: usize },
}

impl EvaluationError {
    /// Faults of the engine itself, as opposed to bad input.
    pub fn is_engine_fault(&self) -> bool {
        matches!(self, EvaluationError::CycleCapExceeded { .. })
    }
}

/// Entry point for evaluations. Cheap to clone and safe to share across
/// threads; every evaluation owns its own working memory and traces.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    repository: Arc<RuleRepository>,
    config: EngineConfig,
    resolver: ConflictResolver,
    cycle_cap: Option<usize>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::standard()
    }
}

impl RuleEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_repository(RuleRepository::shared(), config)
    }

    pub fn standard() -> Self {
        Self::new(EngineConfig::default())
    }

    pub fn with_repository(repository: Arc<RuleRepository>, config: EngineConfig) -> Self {
        Self {
            repository,
            resolver: ConflictResolver::new(config.conflict_strategy),
            config,
            cycle_cap: None,
        }
    }

    /// Override the forward-chaining cycle cap, which otherwise equals the
    /// number of rules.
    pub fn with_cycle_cap(mut self, cycle_cap: usize) -> Self {
        self.cycle_cap = Some(cycle_cap);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn repository(&self) -> &RuleRepository {
        &self.repository
    }

    pub fn evaluate(
        &self,
        submission: &ApplicantSubmission,
    ) -> Result<EvaluationResult, EvaluationError> {
        let applicant = submission.validate()?;
        self.evaluate_applicant(&applicant)
    }

    pub fn evaluate_applicant(
        &self,
        applicant: &Applicant,
    ) -> Result<EvaluationResult, EvaluationError> {
        let mode = self.config.chaining_mode;

        let forward = if mode.runs_forward() {
            let mut chainer = ForwardChainer::new(&self.repository, self.resolver)
                .with_trace_capacity(self.config.trace_capacity);
            if let Some(cap) = self.cycle_cap {
                chainer = chainer.with_cycle_cap(cap);
            }
            Some(chainer.run(applicant)?)
        } else {
            None
        };

        let backward = mode.runs_backward().then(|| {
            BackwardChainer::new(&self.repository, self.resolver)
                .with_trace_capacity(self.config.trace_capacity)
                .run(applicant)
        });

        let reconciliation = reconcile(
            forward.as_ref().map(|outcome| outcome.decision),
            backward.as_ref().map(|outcome| outcome.decision),
        );

        debug!(
            applicant = %applicant.applicant_id,
            decision = %reconciliation.decision,
            "applicant evaluated"
        );

        Ok(EvaluationResult {
            applicant_id: applicant.applicant_id.clone(),
            applicant_data: applicant.clone(),
            final_decision: reconciliation.decision,
            forward_chaining: forward,
            backward_chaining: backward,
            reasoning: reconciliation.reasoning,
            reconciliation: reconciliation.entries,
        })
    }

    pub fn list_rules(&self) -> Vec<RuleSummary> {
        self.repository.rules().iter().map(Rule::summary).collect()
    }

    pub fn get_rule(&self, rule_id: &str) -> Result<&Rule, RuleLookupError> {
        self.repository.get(rule_id)
    }

    pub fn rule_statistics(&self) -> RuleBaseStatistics {
        self.repository.statistics()
    }
}
