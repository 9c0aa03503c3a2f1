use std::cmp::{Ordering, Reverse};

use serde::{Deserialize, Serialize};

use super::rules::Rule;

/// Ordering applied when several rules are eligible at once. Every strategy
/// ends with declaration order, so the result is always a total order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    /// Priority, then specificity, then declaration order.
    #[default]
    PrioritySpecificity,
    /// Specificity, then priority, then declaration order.
    SpecificityPriority,
}

impl ConflictStrategy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "priority" | "priority_specificity" => Some(Self::PrioritySpecificity),
            "specificity" | "specificity_priority" => Some(Self::SpecificityPriority),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ConflictStrategy::PrioritySpecificity => "priority_specificity",
            ConflictStrategy::SpecificityPriority => "specificity_priority",
        }
    }
}

/// Deterministic tie-break over a conflict set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConflictResolver {
    strategy: ConflictStrategy,
}

impl ConflictResolver {
    pub fn new(strategy: ConflictStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> ConflictStrategy {
        self.strategy
    }

    /// `Less` means `lhs` should fire before `rhs`.
    pub fn compare(&self, lhs: &Rule, rhs: &Rule) -> Ordering {
        let priority = lhs.priority.cmp(&rhs.priority);
        let specificity = Reverse(lhs.specificity()).cmp(&Reverse(rhs.specificity()));
        let declared = lhs.ordinal().cmp(&rhs.ordinal());

        match self.strategy {
            ConflictStrategy::PrioritySpecificity => priority.then(specificity),
            ConflictStrategy::SpecificityPriority => specificity.then(priority),
        }
        .then(declared)
    }

    /// Pick the winning rule. `None` only for an empty conflict set.
    pub fn select<'r>(&self, conflict_set: &[&'r Rule]) -> Option<&'r Rule> {
        conflict_set
            .iter()
            .copied()
            .min_by(|lhs, rhs| self.compare(lhs, rhs))
    }

    /// Sort candidates best-first.
    pub fn rank<'r>(&self, mut candidates: Vec<&'r Rule>) -> Vec<&'r Rule> {
        candidates.sort_by(|lhs, rhs| self.compare(lhs, rhs));
        candidates
    }
}
