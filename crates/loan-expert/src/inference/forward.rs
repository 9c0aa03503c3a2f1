use std::collections::BTreeSet;

use tracing::{debug, error};

use super::conflict::ConflictResolver;
use super::domain::{Applicant, Decision};
use super::engine::EvaluationError;
use super::memory::WorkingMemory;
use super::outcome::ChainOutcome;
use super::rules::{Conclusion, Rule, RuleRepository};
use super::trace::{ChainKind, TraceEvent, TraceRecorder, DEFAULT_TRACE_CAPACITY};

/// Data-driven chainer: fire one rule per cycle until fixpoint or a decision.
pub struct ForwardChainer<'r> {
    repository: &'r RuleRepository,
    resolver: ConflictResolver,
    cycle_cap: usize,
    trace_capacity: usize,
}

impl<'r> ForwardChainer<'r> {
    pub fn new(repository: &'r RuleRepository, resolver: ConflictResolver) -> Self {
        Self {
            repository,
            resolver,
            cycle_cap: repository.len(),
            trace_capacity: DEFAULT_TRACE_CAPACITY,
        }
    }

    /// Refractoriness already bounds a run by the rule count; this cap turns
    /// a violation of that bound into an engine fault.
    pub fn with_cycle_cap(mut self, cycle_cap: usize) -> Self {
        self.cycle_cap = cycle_cap;
        self
    }

    pub fn with_trace_capacity(mut self, trace_capacity: usize) -> Self {
        self.trace_capacity = trace_capacity;
        self
    }

    pub fn run(&self, applicant: &Applicant) -> Result<ChainOutcome, EvaluationError> {
        let mut recorder = TraceRecorder::new(self.trace_capacity);
        let mut memory = WorkingMemory::new(applicant);
        let mut fired: BTreeSet<usize> = BTreeSet::new();
        let mut decided_by = None;
        let mut cycle = 0;

        recorder.record(TraceEvent::ChainStarted {
            chain: ChainKind::Forward,
            applicant_id: applicant.applicant_id.clone(),
        });
        recorder.record(TraceEvent::FactsLoaded {
            facts: memory.fact_count(),
        });

        loop {
            let conflict_set = self.conflict_set(&memory, &fired);
            let Some(selected) = self.resolver.select(&conflict_set) else {
                recorder.record(TraceEvent::Fixpoint { cycles: cycle });
                break;
            };

            if cycle >= self.cycle_cap {
                error!(
                    applicant = %applicant.applicant_id,
                    cap = self.cycle_cap,
                    pending = conflict_set.len(),
                    "forward chaining exceeded its cycle cap"
                );
                return Err(EvaluationError::CycleCapExceeded {
                    applicant_id: applicant.applicant_id.clone(),
                    cap: self.cycle_cap,
                });
            }
            cycle += 1;

            if conflict_set.len() > 1 {
                recorder.record(TraceEvent::ConflictSet {
                    cycle,
                    candidates: conflict_set
                        .iter()
                        .map(|rule| rule.rule_id.clone())
                        .collect(),
                    selected: selected.rule_id.clone(),
                });
            }

            fired.insert(selected.ordinal());
            recorder.record(TraceEvent::RuleFired {
                cycle,
                rule_id: selected.rule_id.clone(),
                description: selected.description.clone(),
                conclusion: selected.conclusion.label(),
            });

            match &selected.conclusion {
                Conclusion::Assert { fact, value } => {
                    memory.assert_fact(fact, value.clone());
                }
                Conclusion::Decide(decision) => {
                    memory.assert_decision(*decision);
                    decided_by = Some(selected.rule_id.clone());
                    recorder.record(TraceEvent::DecisionReached {
                        decision: *decision,
                        rule_id: Some(selected.rule_id.clone()),
                    });
                    break;
                }
            }
        }

        let decision = match memory.decision() {
            Some(decision) => decision,
            None => {
                recorder.record(TraceEvent::DefaultDecision {
                    decision: Decision::ManualReview,
                });
                Decision::ManualReview
            }
        };

        debug!(
            applicant = %applicant.applicant_id,
            cycles = cycle,
            %decision,
            "forward chaining complete"
        );

        Ok(ChainOutcome {
            decision,
            decided_by,
            derived_facts: memory.derived_facts().clone(),
            trace: recorder.finish(),
        })
    }

    /// Satisfied rules that have not fired yet, in declaration order.
    fn conflict_set(&self, memory: &WorkingMemory<'_>, fired: &BTreeSet<usize>) -> Vec<&'r Rule> {
        self.repository
            .rules()
            .iter()
            .filter(|rule| !fired.contains(&rule.ordinal()))
            .filter(|rule| rule.condition.is_satisfied(memory))
            .collect()
    }
}
