use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use super::domain::{ApplicantId, Decision};
use super::rules::{Goal, RuleId};

/// Maximum entries kept per chain unless configured otherwise.
pub const DEFAULT_TRACE_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TraceLevel {
    Info,
    Rule,
    Decision,
    Warning,
}

impl TraceLevel {
    pub const fn label(self) -> &'static str {
        match self {
            TraceLevel::Info => "INFO",
            TraceLevel::Rule => "RULE",
            TraceLevel::Decision => "DECISION",
            TraceLevel::Warning => "WARNING",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChainKind {
    Forward,
    Backward,
}

impl ChainKind {
    pub const fn label(self) -> &'static str {
        match self {
            ChainKind::Forward => "Forward Chaining",
            ChainKind::Backward => "Backward Chaining",
        }
    }
}

/// Structured reasoning step. Human-readable text is produced only when the
/// trace is rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    ChainStarted {
        chain: ChainKind,
        applicant_id: ApplicantId,
    },
    FactsLoaded {
        facts: usize,
    },
    ConflictSet {
        cycle: usize,
        candidates: Vec<RuleId>,
        selected: RuleId,
    },
    RuleFired {
        cycle: usize,
        rule_id: RuleId,
        description: String,
        conclusion: String,
    },
    Fixpoint {
        cycles: usize,
    },
    DecisionReached {
        decision: Decision,
        rule_id: Option<RuleId>,
    },
    DefaultDecision {
        decision: Decision,
    },
    HypothesisStarted {
        goal: Goal,
    },
    SubGoal {
        goal: Goal,
        depth: usize,
    },
    RuleProved {
        goal: Goal,
        rule_id: RuleId,
        description: String,
    },
    RuleNotProved {
        goal: Goal,
        rule_id: RuleId,
        description: String,
    },
    NoRulesForGoal {
        goal: Goal,
    },
    GoalRemembered {
        goal: Goal,
        proven: bool,
    },
    CyclicGoal {
        goal: Goal,
    },
    ChainsAgree {
        decision: Decision,
    },
    ChainsDisagree {
        forward: Decision,
        backward: Decision,
        resolved: Decision,
    },
}

impl TraceEvent {
    pub fn level(&self) -> TraceLevel {
        match self {
            TraceEvent::RuleFired { .. } => TraceLevel::Rule,
            TraceEvent::DecisionReached { .. } | TraceEvent::DefaultDecision { .. } => {
                TraceLevel::Decision
            }
            TraceEvent::RuleNotProved { .. }
            | TraceEvent::NoRulesForGoal { .. }
            | TraceEvent::CyclicGoal { .. }
            | TraceEvent::ChainsDisagree { .. } => TraceLevel::Warning,
            _ => TraceLevel::Info,
        }
    }

    pub fn rule_id(&self) -> Option<&RuleId> {
        match self {
            TraceEvent::ConflictSet { selected, .. } => Some(selected),
            TraceEvent::RuleFired { rule_id, .. }
            | TraceEvent::RuleProved { rule_id, .. }
            | TraceEvent::RuleNotProved { rule_id, .. } => Some(rule_id),
            TraceEvent::DecisionReached { rule_id, .. } => rule_id.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::ChainStarted {
                chain,
                applicant_id,
            } => write!(f, "Starting {} for applicant {}", chain.label(), applicant_id),
            TraceEvent::FactsLoaded { facts } => {
                write!(f, "Working memory loaded with {facts} applicant facts")
            }
            TraceEvent::ConflictSet {
                cycle,
                candidates,
                selected,
            } => {
                let ids: Vec<&str> = candidates.iter().map(RuleId::as_str).collect();
                write!(
                    f,
                    "Cycle {cycle}: conflict between {} -> Winner: {selected}",
                    ids.join(", ")
                )
            }
            TraceEvent::RuleFired {
                cycle,
                rule_id,
                description,
                conclusion,
            } => write!(
                f,
                "Cycle {cycle}: {rule_id} fired ({description}) -> {conclusion}"
            ),
            TraceEvent::Fixpoint { cycles } => {
                write!(f, "Fixpoint reached after {cycles} cycle(s)")
            }
            TraceEvent::DecisionReached { decision, .. } => {
                write!(f, "Final Decision: {decision}")
            }
            TraceEvent::DefaultDecision { decision } => write!(
                f,
                "Final Decision: {decision} (no decision rule applied)"
            ),
            TraceEvent::HypothesisStarted { goal } => {
                write!(f, "Attempting to prove goal: {goal}")
            }
            TraceEvent::SubGoal { goal, depth } => {
                write!(f, "Proving sub-goal {goal} at depth {depth}")
            }
            TraceEvent::RuleProved {
                goal,
                rule_id,
                description,
            } => write!(f, "Goal {goal} proven by {rule_id}: {description}"),
            TraceEvent::RuleNotProved {
                goal,
                rule_id,
                description,
            } => write!(f, "{rule_id} cannot prove {goal}: {description}"),
            TraceEvent::NoRulesForGoal { goal } => {
                write!(f, "No rules conclude goal: {goal}")
            }
            TraceEvent::GoalRemembered { goal, proven } => {
                let outcome = if *proven { "proven" } else { "failed" };
                write!(f, "Goal already {outcome}: {goal}")
            }
            TraceEvent::CyclicGoal { goal } => write!(
                f,
                "Cyclic dependency on {goal}; treating it as not proven"
            ),
            TraceEvent::ChainsAgree { decision } => {
                write!(f, "Forward and backward chaining agree: {decision}")
            }
            TraceEvent::ChainsDisagree {
                forward,
                backward,
                resolved,
            } => write!(
                f,
                "Forward chaining: {forward}, Backward chaining: {backward}; resolved conservatively to {resolved}"
            ),
        }
    }
}

/// One step of the audit log.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry {
    level: TraceLevel,
    rule_id: Option<RuleId>,
    event: TraceEvent,
}

impl TraceEntry {
    pub fn new(event: TraceEvent) -> Self {
        Self {
            level: event.level(),
            rule_id: event.rule_id().cloned(),
            event,
        }
    }

    pub fn level(&self) -> TraceLevel {
        self.level
    }

    pub fn rule_id(&self) -> Option<&RuleId> {
        self.rule_id.as_ref()
    }

    pub fn event(&self) -> &TraceEvent {
        &self.event
    }

    pub fn message(&self) -> String {
        self.event.to_string()
    }
}

impl Serialize for TraceEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TraceEntry", 3)?;
        state.serialize_field("level", &self.level)?;
        state.serialize_field("message", &self.message())?;
        state.serialize_field("rule_id", &self.rule_id)?;
        state.end()
    }
}

/// Append-only log for one chain of one evaluation.
#[derive(Debug)]
pub struct TraceRecorder {
    capacity: usize,
    entries: Vec<TraceEntry>,
    rules_fired: usize,
    conflicts_resolved: usize,
    dropped: usize,
}

impl TraceRecorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::new(),
            rules_fired: 0,
            conflicts_resolved: 0,
            dropped: 0,
        }
    }

    /// Entries past capacity are counted and dropped; decision entries are
    /// always kept.
    pub fn record(&mut self, event: TraceEvent) {
        match event {
            TraceEvent::RuleFired { .. } | TraceEvent::RuleProved { .. } => self.rules_fired += 1,
            TraceEvent::ConflictSet { .. } => self.conflicts_resolved += 1,
            _ => {}
        }

        let entry = TraceEntry::new(event);
        if self.entries.len() < self.capacity || entry.level == TraceLevel::Decision {
            self.entries.push(entry);
        } else {
            self.dropped += 1;
        }
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn finish(self) -> Trace {
        Trace {
            total_entries: self.entries.len(),
            rules_fired: self.rules_fired,
            conflicts_resolved: self.conflicts_resolved,
            truncated_entries: self.dropped,
            trace: self.entries,
        }
    }
}

impl Default for TraceRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_TRACE_CAPACITY)
    }
}

/// Frozen trace of a finished chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    total_entries: usize,
    rules_fired: usize,
    conflicts_resolved: usize,
    truncated_entries: usize,
    trace: Vec<TraceEntry>,
}

impl Trace {
    pub fn entries(&self) -> &[TraceEntry] {
        &self.trace
    }

    pub fn total_entries(&self) -> usize {
        self.total_entries
    }

    pub fn rules_fired(&self) -> usize {
        self.rules_fired
    }

    pub fn conflicts_resolved(&self) -> usize {
        self.conflicts_resolved
    }

    pub fn truncated_entries(&self) -> usize {
        self.truncated_entries
    }

    pub fn messages(&self) -> Vec<String> {
        self.trace.iter().map(TraceEntry::message).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_serialize_as_level_message_and_rule_id() {
        let entry = TraceEntry::new(TraceEvent::RuleFired {
            cycle: 1,
            rule_id: RuleId::from("R4"),
            description: "Unemployed status".to_string(),
            conclusion: "Reject Loan".to_string(),
        });

        let value = serde_json::to_value(&entry).expect("serializes");
        assert_eq!(value["level"], "RULE");
        assert_eq!(value["rule_id"], "R4");
        assert_eq!(
            value["message"],
            "Cycle 1: R4 fired (Unemployed status) -> Reject Loan"
        );

        let info = serde_json::to_value(TraceEntry::new(TraceEvent::FactsLoaded { facts: 7 }))
            .expect("serializes");
        assert_eq!(info["level"], "INFO");
        assert!(info["rule_id"].is_null());
    }

    #[test]
    fn recorder_drops_overflow_but_keeps_decisions() {
        let mut recorder = TraceRecorder::new(2);
        for facts in 0..4 {
            recorder.record(TraceEvent::FactsLoaded { facts });
        }
        recorder.record(TraceEvent::DecisionReached {
            decision: Decision::Reject,
            rule_id: None,
        });

        let trace = recorder.finish();
        assert_eq!(trace.total_entries(), 3);
        assert_eq!(trace.truncated_entries(), 2);
        assert_eq!(
            trace.entries().last().map(TraceEntry::level),
            Some(TraceLevel::Decision)
        );
    }

    #[test]
    fn counters_track_firings_and_conflicts() {
        let mut recorder = TraceRecorder::default();
        recorder.record(TraceEvent::ConflictSet {
            cycle: 1,
            candidates: vec![RuleId::from("R4"), RuleId::from("R8")],
            selected: RuleId::from("R4"),
        });
        recorder.record(TraceEvent::RuleFired {
            cycle: 1,
            rule_id: RuleId::from("R4"),
            description: "Unemployed status".to_string(),
            conclusion: "Reject Loan".to_string(),
        });

        let trace = recorder.finish();
        assert_eq!(trace.rules_fired(), 1);
        assert_eq!(trace.conflicts_resolved(), 1);
        assert_eq!(
            trace.messages()[0],
            "Cycle 1: conflict between R4, R8 -> Winner: R4"
        );
    }
}
