use tracing::warn;

use super::domain::Decision;
use super::trace::{TraceEntry, TraceEvent};

/// Final label plus the audit entries explaining how it was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub decision: Decision,
    pub reasoning: String,
    pub entries: Vec<TraceEntry>,
}

/// Merge the chain outcomes. On disagreement the more severe label wins.
pub fn reconcile(forward: Option<Decision>, backward: Option<Decision>) -> Reconciliation {
    match (forward, backward) {
        (Some(forward), Some(backward)) if forward == backward => {
            let event = TraceEvent::ChainsAgree { decision: forward };
            Reconciliation {
                decision: forward,
                reasoning: event.to_string(),
                entries: vec![TraceEntry::new(event)],
            }
        }
        (Some(forward), Some(backward)) => {
            let resolved = more_conservative(forward, backward);
            warn!(%forward, %backward, %resolved, "inference chains disagree");
            let event = TraceEvent::ChainsDisagree {
                forward,
                backward,
                resolved,
            };
            Reconciliation {
                decision: resolved,
                reasoning: event.to_string(),
                entries: vec![TraceEntry::new(event)],
            }
        }
        (Some(decision), None) => Reconciliation {
            decision,
            reasoning: format!("Forward chaining only: {decision}"),
            entries: Vec::new(),
        },
        (None, Some(decision)) => Reconciliation {
            decision,
            reasoning: format!("Backward chaining only: {decision}"),
            entries: Vec::new(),
        },
        (None, None) => {
            let event = TraceEvent::DefaultDecision {
                decision: Decision::ManualReview,
            };
            Reconciliation {
                decision: Decision::ManualReview,
                reasoning: event.to_string(),
                entries: vec![TraceEntry::new(event)],
            }
        }
    }
}

pub fn more_conservative(lhs: Decision, rhs: Decision) -> Decision {
    if rhs.severity() > lhs.severity() {
        rhs
    } else {
        lhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::trace::TraceLevel;

    #[test]
    fn agreement_is_final_and_logged_as_info() {
        let outcome = reconcile(Some(Decision::Approve), Some(Decision::Approve));
        assert_eq!(outcome.decision, Decision::Approve);
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].level(), TraceLevel::Info);
        assert_eq!(
            outcome.reasoning,
            "Forward and backward chaining agree: Approve Loan"
        );
    }

    #[test]
    fn disagreement_resolves_to_the_more_severe_label() {
        let outcome = reconcile(Some(Decision::Approve), Some(Decision::Reject));
        assert_eq!(outcome.decision, Decision::Reject);
        assert_eq!(outcome.entries[0].level(), TraceLevel::Warning);
        assert!(outcome.reasoning.contains("Forward chaining: Approve Loan"));
        assert!(outcome.reasoning.contains("Backward chaining: Reject Loan"));

        let swapped = reconcile(
            Some(Decision::ManualReview),
            Some(Decision::ApproveWithConditions),
        );
        assert_eq!(swapped.decision, Decision::ManualReview);
    }

    #[test]
    fn single_chain_decides_alone() {
        assert_eq!(
            reconcile(Some(Decision::ApproveWithConditions), None).decision,
            Decision::ApproveWithConditions
        );
        assert_eq!(
            reconcile(None, Some(Decision::Reject)).decision,
            Decision::Reject
        );
        assert!(reconcile(None, Some(Decision::Reject)).entries.is_empty());
    }

    #[test]
    fn severity_order_is_reject_manual_conditions_approve() {
        let mut labels = Decision::ALL.to_vec();
        labels.sort_by_key(|decision| std::cmp::Reverse(decision.severity()));
        assert_eq!(
            labels,
            vec![
                Decision::Reject,
                Decision::ManualReview,
                Decision::ApproveWithConditions,
                Decision::Approve,
            ]
        );
    }
}
