use std::collections::BTreeMap;

use super::domain::{Applicant, Decision, FactKey, FactValue};

/// Facts visible to one evaluation: the applicant's attributes plus whatever
/// the rules derive. Grows monotonically; nothing is ever retracted.
#[derive(Debug, Clone)]
pub struct WorkingMemory<'a> {
    applicant: &'a Applicant,
    derived: BTreeMap<String, FactValue>,
    decision: Option<Decision>,
}

impl<'a> WorkingMemory<'a> {
    pub fn new(applicant: &'a Applicant) -> Self {
        Self {
            applicant,
            derived: BTreeMap::new(),
            decision: None,
        }
    }

    pub fn get(&self, key: &FactKey) -> Option<FactValue> {
        match key {
            FactKey::Derived(name) => self.derived.get(name).cloned(),
            other => self.applicant.fact(other),
        }
    }

    pub fn contains(&self, key: &FactKey) -> bool {
        match key {
            FactKey::Derived(name) => self.derived.contains_key(name),
            _ => true,
        }
    }

    /// Record a derived fact. Returns `false` when the fact was already known;
    /// the first value asserted wins.
    pub fn assert_fact(&mut self, name: &str, value: FactValue) -> bool {
        if self.derived.contains_key(name) {
            return false;
        }
        self.derived.insert(name.to_string(), value);
        true
    }

    /// Record the terminal decision. Only the first decision sticks.
    pub fn assert_decision(&mut self, decision: Decision) -> bool {
        if self.decision.is_some() {
            return false;
        }
        self.decision = Some(decision);
        true
    }

    pub fn decision(&self) -> Option<Decision> {
        self.decision
    }

    pub fn derived_facts(&self) -> &BTreeMap<String, FactValue> {
        &self.derived
    }

    /// Number of facts currently held, applicant attributes included.
    pub fn fact_count(&self) -> usize {
        APPLICANT_FACTS + self.derived.len() + usize::from(self.decision.is_some())
    }
}

const APPLICANT_FACTS: usize = 7;
