use rayon::prelude::*;
use tracing::{debug, error};

use super::engine::{EvaluationError, RuleEngine};
use super::outcome::{BatchEvaluation, EvaluationResult, Statistics};
use super::validation::ApplicantSubmission;

impl RuleEngine {
    /// Evaluate every submission independently. One failing applicant never
    /// aborts the others; results keep input order.
    pub fn evaluate_all(&self, submissions: &[ApplicantSubmission]) -> BatchEvaluation {
        let results: Vec<Result<EvaluationResult, EvaluationError>> =
            if self.config().parallel_batch {
                submissions
                    .par_iter()
                    .map(|submission| self.evaluate(submission))
                    .collect()
            } else {
                submissions
                    .iter()
                    .map(|submission| self.evaluate(submission))
                    .collect()
            };

        for (index, result) in results.iter().enumerate() {
            if let Err(err) = result {
                if err.is_engine_fault() {
                    error!(index, error = %err, "batch evaluation fault");
                } else {
                    debug!(index, error = %err, "batch applicant rejected");
                }
            }
        }

        let statistics = Statistics::from_decisions(
            results
                .iter()
                .filter_map(|result| result.as_ref().ok())
                .map(|result| result.final_decision),
        );

        BatchEvaluation {
            results,
            statistics,
        }
    }
}
