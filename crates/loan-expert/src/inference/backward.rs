use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::conflict::ConflictResolver;
use super::domain::{Applicant, Decision, FactKey};
use super::memory::WorkingMemory;
use super::outcome::ChainOutcome;
use super::rules::{Condition, Conclusion, Goal, RuleId, RuleRepository};
use super::trace::{ChainKind, TraceEvent, TraceRecorder, DEFAULT_TRACE_CAPACITY};

/// Goal-driven chainer: tries each decision hypothesis in turn and reports
/// the first one it can prove.
pub struct BackwardChainer<'r> {
    repository: &'r RuleRepository,
    resolver: ConflictResolver,
    trace_capacity: usize,
}

impl<'r> BackwardChainer<'r> {
    pub fn new(repository: &'r RuleRepository, resolver: ConflictResolver) -> Self {
        Self {
            repository,
            resolver,
            trace_capacity: DEFAULT_TRACE_CAPACITY,
        }
    }

    pub fn with_trace_capacity(mut self, trace_capacity: usize) -> Self {
        self.trace_capacity = trace_capacity;
        self
    }

    pub fn run(&self, applicant: &Applicant) -> ChainOutcome {
        let mut proof = Proof {
            repository: self.repository,
            resolver: self.resolver,
            memory: WorkingMemory::new(applicant),
            recorder: TraceRecorder::new(self.trace_capacity),
            proven: BTreeMap::new(),
            failed: BTreeSet::new(),
            visiting: BTreeSet::new(),
            cut: BTreeSet::new(),
        };

        proof.recorder.record(TraceEvent::ChainStarted {
            chain: ChainKind::Backward,
            applicant_id: applicant.applicant_id.clone(),
        });

        let mut decided_by = None;
        let mut decision = None;
        for hypothesis in Decision::HYPOTHESIS_ORDER {
            let goal = Goal::Decision(hypothesis);
            proof
                .recorder
                .record(TraceEvent::HypothesisStarted { goal: goal.clone() });

            if let Some(rule_id) = proof.prove(&goal, 0) {
                proof.memory.assert_decision(hypothesis);
                proof.recorder.record(TraceEvent::DecisionReached {
                    decision: hypothesis,
                    rule_id: Some(rule_id.clone()),
                });
                decided_by = Some(rule_id);
                decision = Some(hypothesis);
                break;
            }
        }

        let decision = decision.unwrap_or_else(|| {
            proof.recorder.record(TraceEvent::DefaultDecision {
                decision: Decision::ManualReview,
            });
            Decision::ManualReview
        });

        debug!(
            applicant = %applicant.applicant_id,
            %decision,
            proven_goals = proof.proven.len(),
            failed_goals = proof.failed.len(),
            "backward chaining complete"
        );

        ChainOutcome {
            decision,
            decided_by,
            derived_facts: proof.memory.derived_facts().clone(),
            trace: proof.recorder.finish(),
        }
    }
}

/// State of one backward-chaining evaluation.
struct Proof<'a, 'r> {
    repository: &'r RuleRepository,
    resolver: ConflictResolver,
    memory: WorkingMemory<'a>,
    recorder: TraceRecorder,
    proven: BTreeMap<Goal, RuleId>,
    failed: BTreeSet<Goal>,
    /// Goals on the current proof path; revisiting one fails closed.
    visiting: BTreeSet<Goal>,
    /// Goals on the current path whose revisit was cut. While any remain, a
    /// failure below them is provisional and is not remembered.
    cut: BTreeSet<Goal>,
}

impl Proof<'_, '_> {
    /// Returns the rule that established `goal`, if any.
    fn prove(&mut self, goal: &Goal, depth: usize) -> Option<RuleId> {
        if let Some(rule_id) = self.proven.get(goal) {
            self.recorder.record(TraceEvent::GoalRemembered {
                goal: goal.clone(),
                proven: true,
            });
            return Some(rule_id.clone());
        }
        if self.failed.contains(goal) {
            self.recorder.record(TraceEvent::GoalRemembered {
                goal: goal.clone(),
                proven: false,
            });
            return None;
        }
        if !self.visiting.insert(goal.clone()) {
            self.recorder
                .record(TraceEvent::CyclicGoal { goal: goal.clone() });
            self.cut.insert(goal.clone());
            return None;
        }

        let repository = self.repository;
        let candidates = self.resolver.rank(repository.rules_concluding(goal));
        if candidates.is_empty() {
            self.recorder
                .record(TraceEvent::NoRulesForGoal { goal: goal.clone() });
        }

        let mut established = None;
        for rule in candidates {
            if self.satisfy(&rule.condition, depth) {
                if let Conclusion::Assert { fact, value } = &rule.conclusion {
                    self.memory.assert_fact(fact, value.clone());
                }
                self.recorder.record(TraceEvent::RuleProved {
                    goal: goal.clone(),
                    rule_id: rule.rule_id.clone(),
                    description: rule.description.clone(),
                });
                established = Some(rule.rule_id.clone());
                break;
            }
            self.recorder.record(TraceEvent::RuleNotProved {
                goal: goal.clone(),
                rule_id: rule.rule_id.clone(),
                description: rule.description.clone(),
            });
        }

        self.visiting.remove(goal);
        self.cut.remove(goal);
        match &established {
            Some(rule_id) => {
                self.proven.insert(goal.clone(), rule_id.clone());
            }
            None if self.cut.is_empty() => {
                self.failed.insert(goal.clone());
            }
            None => {}
        }
        established
    }

    /// AND within `All`, OR within `Any`; derived facts that are not yet known
    /// are proven as sub-goals first.
    fn satisfy(&mut self, condition: &Condition, depth: usize) -> bool {
        match condition {
            Condition::All(parts) => parts.iter().all(|part| self.satisfy(part, depth)),
            Condition::Any(parts) => parts.iter().any(|part| self.satisfy(part, depth)),
            atomic => {
                let Some(fact) = atomic.fact() else {
                    return false;
                };
                if let FactKey::Derived(name) = fact {
                    if !self.memory.contains(fact) {
                        let sub_goal = Goal::Fact(name.clone());
                        self.recorder.record(TraceEvent::SubGoal {
                            goal: sub_goal.clone(),
                            depth: depth + 1,
                        });
                        if self.prove(&sub_goal, depth + 1).is_none() {
                            return false;
                        }
                    }
                }
                self.memory
                    .get(fact)
                    .map(|value| atomic.matches_value(&value))
                    .unwrap_or(false)
            }
        }
    }
}
