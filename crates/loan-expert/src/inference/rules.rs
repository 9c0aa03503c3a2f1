use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use super::domain::{Decision, FactKey, FactValue};
use super::memory::WorkingMemory;

/// Identifier wrapper for production rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub String);

impl RuleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RuleId {
    fn from(value: &str) -> Self {
        RuleId(value.to_string())
    }
}

/// Relational operator used by threshold conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl Comparison {
    pub const fn symbol(self) -> &'static str {
        match self {
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
        }
    }

    fn holds(self, actual: &FactValue, expected: &FactValue) -> bool {
        match self {
            Comparison::Eq => actual == expected,
            Comparison::Ne => actual != expected,
            ordered => match (actual.as_number(), expected.as_number()) {
                (Some(lhs), Some(rhs)) => match ordered {
                    Comparison::Gt => lhs > rhs,
                    Comparison::Ge => lhs >= rhs,
                    Comparison::Lt => lhs < rhs,
                    Comparison::Le => lhs <= rhs,
                    Comparison::Eq | Comparison::Ne => false,
                },
                _ => false,
            },
        }
    }
}

/// Closed condition language evaluated against working memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Compare {
        fact: FactKey,
        op: Comparison,
        value: FactValue,
    },
    /// Inclusive on both ends.
    Between { fact: FactKey, low: f64, high: f64 },
    OneOf {
        fact: FactKey,
        values: Vec<FactValue>,
    },
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl Condition {
    pub fn compare(fact: FactKey, op: Comparison, value: impl Into<FactValue>) -> Self {
        Condition::Compare {
            fact,
            op,
            value: value.into(),
        }
    }

    pub fn between(fact: FactKey, low: f64, high: f64) -> Self {
        Condition::Between { fact, low, high }
    }

    pub fn one_of<V: Into<FactValue>>(fact: FactKey, values: impl IntoIterator<Item = V>) -> Self {
        Condition::OneOf {
            fact,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_atomic(&self) -> bool {
        !matches!(self, Condition::All(_) | Condition::Any(_))
    }

    /// Fact tested by an atomic condition.
    pub fn fact(&self) -> Option<&FactKey> {
        match self {
            Condition::Compare { fact, .. }
            | Condition::Between { fact, .. }
            | Condition::OneOf { fact, .. } => Some(fact),
            Condition::All(_) | Condition::Any(_) => None,
        }
    }

    /// Number of atomic tests in the tree; this is the rule's specificity.
    pub fn atomic_count(&self) -> usize {
        match self {
            Condition::All(parts) | Condition::Any(parts) => {
                parts.iter().map(Condition::atomic_count).sum()
            }
            _ => 1,
        }
    }

    /// Test an atomic condition against a concrete value. Composite
    /// conditions never match a single value.
    pub fn matches_value(&self, actual: &FactValue) -> bool {
        match self {
            Condition::Compare { op, value, .. } => op.holds(actual, value),
            Condition::Between { low, high, .. } => actual
                .as_number()
                .map(|number| *low <= number && number <= *high)
                .unwrap_or(false),
            Condition::OneOf { values, .. } => values.iter().any(|candidate| candidate == actual),
            Condition::All(_) | Condition::Any(_) => false,
        }
    }

    /// Evaluate against the facts currently in memory. Missing facts fail
    /// the test.
    pub fn is_satisfied(&self, memory: &WorkingMemory<'_>) -> bool {
        match self {
            Condition::All(parts) => parts.iter().all(|part| part.is_satisfied(memory)),
            Condition::Any(parts) => parts.iter().any(|part| part.is_satisfied(memory)),
            atomic => atomic
                .fact()
                .and_then(|fact| memory.get(fact))
                .map(|value| atomic.matches_value(&value))
                .unwrap_or(false),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Compare { fact, op, value } => {
                write!(f, "{} {} {}", fact, op.symbol(), value)
            }
            Condition::Between { fact, low, high } => {
                write!(
                    f,
                    "{} <= {} <= {}",
                    FactValue::Number(*low),
                    fact,
                    FactValue::Number(*high)
                )
            }
            Condition::OneOf { fact, values } => {
                let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{} in [{}]", fact, rendered.join(", "))
            }
            Condition::All(parts) => write_joined(f, parts, " AND "),
            Condition::Any(parts) => write_joined(f, parts, " OR "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Condition], separator: &str) -> fmt::Result {
    for (index, part) in parts.iter().enumerate() {
        if index > 0 {
            f.write_str(separator)?;
        }
        if part.is_atomic() {
            write!(f, "{part}")?;
        } else {
            write!(f, "({part})")?;
        }
    }
    Ok(())
}

/// What a rule establishes when it fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    Assert { fact: String, value: FactValue },
    Decide(Decision),
}

impl Conclusion {
    pub fn concludes(&self, goal: &Goal) -> bool {
        match (self, goal) {
            (Conclusion::Decide(decision), Goal::Decision(target)) => decision == target,
            (Conclusion::Assert { fact, .. }, Goal::Fact(target)) => fact == target,
            _ => false,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Conclusion::Assert { fact, value } => format!("{fact} = {value}"),
            Conclusion::Decide(decision) => decision.label().to_string(),
        }
    }
}

/// Something backward chaining tries to establish.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Goal {
    Decision(Decision),
    Fact(String),
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Goal::Decision(decision) => f.write_str(decision.label()),
            Goal::Fact(name) => write!(f, "fact '{name}'"),
        }
    }
}

pub const HIGH_PRIORITY: u8 = 1;
pub const MEDIUM_PRIORITY: u8 = 2;
pub const LOW_PRIORITY: u8 = 3;

/// IF-THEN production rule. Lower `priority` wins conflicts.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub rule_id: RuleId,
    pub priority: u8,
    pub condition: Condition,
    pub conclusion: Conclusion,
    pub description: String,
    ordinal: usize,
}

impl Rule {
    pub fn new(
        rule_id: impl Into<RuleId>,
        priority: u8,
        condition: Condition,
        conclusion: Conclusion,
        description: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            priority,
            condition,
            conclusion,
            description: description.into(),
            ordinal: 0,
        }
    }

    pub fn specificity(&self) -> usize {
        self.condition.atomic_count()
    }

    /// Position in the repository's declaration order.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn priority_level(&self) -> &'static str {
        match self.priority {
            0..=HIGH_PRIORITY => "High",
            MEDIUM_PRIORITY => "Medium",
            _ => "Low",
        }
    }

    pub fn summary(&self) -> RuleSummary {
        RuleSummary {
            rule_id: self.rule_id.clone(),
            description: self.description.clone(),
            condition: self.condition.to_string(),
            consequent: self.conclusion.label(),
            priority: self.priority,
            priority_level: self.priority_level(),
            specificity: self.specificity(),
        }
    }
}

impl From<String> for RuleId {
    fn from(value: String) -> Self {
        RuleId(value)
    }
}

/// Read-only rule metadata exposed to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSummary {
    pub rule_id: RuleId,
    pub description: String,
    pub condition: String,
    pub consequent: String,
    pub priority: u8,
    pub priority_level: &'static str,
    pub specificity: usize,
}

/// Aggregate view of the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleBaseStatistics {
    pub total_rules: usize,
    pub high_priority_rules: usize,
    pub medium_priority_rules: usize,
    pub low_priority_rules: usize,
    pub average_specificity: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleLookupError {
    #[error("Rule {rule_id} not found")]
    NotFound { rule_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleRepositoryError {
    #[error("rule id {0} declared more than once")]
    DuplicateRule(RuleId),
    #[error("a rule repository needs at least one rule")]
    Empty,
}

/// Immutable registry of production rules, in declaration order.
#[derive(Debug, Clone)]
pub struct RuleRepository {
    rules: Vec<Rule>,
}

impl RuleRepository {
    /// The eight loan rules.
    pub fn standard() -> Self {
        Self::ordered(standard_rules())
    }

    /// Process-wide copy of [`RuleRepository::standard`], built on first use.
    pub fn shared() -> Arc<Self> {
        static STANDARD: OnceLock<Arc<RuleRepository>> = OnceLock::new();
        STANDARD.get_or_init(|| Arc::new(Self::standard())).clone()
    }

    pub fn from_rules(rules: Vec<Rule>) -> Result<Self, RuleRepositoryError> {
        if rules.is_empty() {
            return Err(RuleRepositoryError::Empty);
        }
        let mut seen = BTreeSet::new();
        for rule in &rules {
            if !seen.insert(rule.rule_id.clone()) {
                return Err(RuleRepositoryError::DuplicateRule(rule.rule_id.clone()));
            }
        }
        Ok(Self::ordered(rules))
    }

    fn ordered(mut rules: Vec<Rule>) -> Self {
        for (ordinal, rule) in rules.iter_mut().enumerate() {
            rule.ordinal = ordinal;
        }
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, rule_id: &str) -> Result<&Rule, RuleLookupError> {
        self.rules
            .iter()
            .find(|rule| rule.rule_id.as_str() == rule_id)
            .ok_or_else(|| RuleLookupError::NotFound {
                rule_id: rule_id.to_string(),
            })
    }

    pub fn rules_concluding(&self, goal: &Goal) -> Vec<&Rule> {
        self.rules
            .iter()
            .filter(|rule| rule.conclusion.concludes(goal))
            .collect()
    }

    pub fn statistics(&self) -> RuleBaseStatistics {
        let count_level = |level: &str| {
            self.rules
                .iter()
                .filter(|rule| rule.priority_level() == level)
                .count()
        };
        let total_specificity: usize = self.rules.iter().map(Rule::specificity).sum();
        let average_specificity = if self.rules.is_empty() {
            0.0
        } else {
            total_specificity as f64 / self.rules.len() as f64
        };

        RuleBaseStatistics {
            total_rules: self.rules.len(),
            high_priority_rules: count_level("High"),
            medium_priority_rules: count_level("Medium"),
            low_priority_rules: count_level("Low"),
            average_specificity,
        }
    }
}

fn standard_rules() -> Vec<Rule> {
    use Comparison::{Gt, Le, Lt};

    vec![
        Rule::new(
            "R1",
            HIGH_PRIORITY,
            Condition::All(vec![
                Condition::compare(FactKey::Income, Gt, 60_000.0),
                Condition::compare(FactKey::CreditScore, Gt, 750.0),
            ]),
            Conclusion::Decide(Decision::Approve),
            "High income (>60K) AND excellent credit (>750)",
        ),
        Rule::new(
            "R2",
            MEDIUM_PRIORITY,
            Condition::All(vec![
                Condition::between(FactKey::Income, 40_000.0, 60_000.0),
                Condition::compare(FactKey::CreditScore, Gt, 700.0),
                Condition::compare(FactKey::ExistingDebt, Comparison::Eq, "None"),
            ]),
            Conclusion::Decide(Decision::ApproveWithConditions),
            "Moderate income (40K-60K) AND good credit (>700) AND no debt",
        ),
        Rule::new(
            "R3",
            HIGH_PRIORITY,
            Condition::All(vec![
                Condition::compare(FactKey::CreditScore, Le, 650.0),
                Condition::compare(FactKey::ExistingDebt, Comparison::Eq, "High"),
            ]),
            Conclusion::Decide(Decision::Reject),
            "Poor credit (<=650) AND high existing debt",
        ),
        Rule::new(
            "R4",
            HIGH_PRIORITY,
            Condition::compare(FactKey::EmploymentStatus, Comparison::Eq, "Unemployed"),
            Conclusion::Decide(Decision::Reject),
            "Unemployed status",
        ),
        Rule::new(
            "R5",
            LOW_PRIORITY,
            Condition::All(vec![
                Condition::between(FactKey::Income, 30_000.0, 50_000.0),
                Condition::between(FactKey::CreditScore, 600.0, 700.0),
            ]),
            Conclusion::Decide(Decision::ManualReview),
            "Moderate income (30K-50K) AND fair credit (600-700)",
        ),
        Rule::new(
            "R6",
            HIGH_PRIORITY,
            Condition::compare(FactKey::Age, Lt, 21.0),
            Conclusion::Decide(Decision::Reject),
            "Applicant under 21 years old",
        ),
        Rule::new(
            "R7",
            LOW_PRIORITY,
            Condition::All(vec![
                Condition::compare(FactKey::Dependents, Gt, 3.0),
                Condition::compare(FactKey::Income, Lt, 45_000.0),
            ]),
            Conclusion::Decide(Decision::ManualReview),
            "Many dependents (>3) AND low income (<45K)",
        ),
        Rule::new(
            "R8",
            LOW_PRIORITY,
            Condition::All(vec![
                Condition::compare(FactKey::EmploymentDuration, Lt, 1.0),
                Condition::compare(FactKey::CreditScore, Lt, 700.0),
            ]),
            Conclusion::Decide(Decision::ManualReview),
            "Short employment (<1 year) AND below-good credit (<700)",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::tests::common::applicant;

    #[test]
    fn standard_repository_declares_eight_rules_in_order() {
        let repository = RuleRepository::standard();
        let ids: Vec<&str> = repository
            .rules()
            .iter()
            .map(|rule| rule.rule_id.as_str())
            .collect();
        assert_eq!(ids, ["R1", "R2", "R3", "R4", "R5", "R6", "R7", "R8"]);
        assert!(repository
            .rules()
            .iter()
            .enumerate()
            .all(|(index, rule)| rule.ordinal() == index));
    }

    #[test]
    fn specificity_counts_atomic_conditions() {
        let repository = RuleRepository::standard();
        let specificity = |id: &str| repository.get(id).expect("rule exists").specificity();
        assert_eq!(specificity("R1"), 2);
        assert_eq!(specificity("R2"), 3);
        assert_eq!(specificity("R4"), 1);
        assert_eq!(specificity("R6"), 1);
    }

    #[test]
    fn lookup_of_unknown_rule_is_not_found() {
        let repository = RuleRepository::standard();
        match repository.get("R42") {
            Err(RuleLookupError::NotFound { rule_id }) => assert_eq!(rule_id, "R42"),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[test]
    fn rules_concluding_filters_by_goal() {
        let repository = RuleRepository::standard();
        let reject: Vec<&str> = repository
            .rules_concluding(&Goal::Decision(Decision::Reject))
            .iter()
            .map(|rule| rule.rule_id.as_str())
            .collect();
        assert_eq!(reject, ["R3", "R4", "R6"]);
        assert!(repository
            .rules_concluding(&Goal::Fact("stable_income".to_string()))
            .is_empty());
    }

    #[test]
    fn duplicate_rule_ids_are_rejected() {
        let rule = Rule::new(
            "X1",
            HIGH_PRIORITY,
            Condition::compare(FactKey::Age, Comparison::Lt, 21.0),
            Conclusion::Decide(Decision::Reject),
            "young",
        );
        let error = RuleRepository::from_rules(vec![rule.clone(), rule]).unwrap_err();
        assert_eq!(error, RuleRepositoryError::DuplicateRule(RuleId::from("X1")));
        assert_eq!(
            RuleRepository::from_rules(Vec::new()).unwrap_err(),
            RuleRepositoryError::Empty
        );
    }

    #[test]
    fn between_is_inclusive_and_type_mismatches_fail() {
        let applicant = applicant("edge", 40_000, 700, "Employed", 2.0, 30, 0, "None");
        let memory = WorkingMemory::new(&applicant);

        assert!(Condition::between(FactKey::Income, 40_000.0, 60_000.0).is_satisfied(&memory));
        assert!(Condition::between(FactKey::CreditScore, 600.0, 700.0).is_satisfied(&memory));
        assert!(!Condition::compare(FactKey::ExistingDebt, Comparison::Gt, 1.0).is_satisfied(&memory));
        assert!(
            !Condition::compare(FactKey::derived("missing"), Comparison::Eq, true)
                .is_satisfied(&memory)
        );
        assert!(Condition::one_of(FactKey::EmploymentStatus, ["Employed", "Self-Employed"])
            .is_satisfied(&memory));
        assert!(Condition::Any(vec![
            Condition::compare(FactKey::Age, Comparison::Lt, 21.0),
            Condition::compare(FactKey::Dependents, Comparison::Eq, 0.0),
        ])
        .is_satisfied(&memory));
    }

    #[test]
    fn conditions_render_readably() {
        let repository = RuleRepository::standard();
        assert_eq!(
            repository.get("R2").expect("R2").condition.to_string(),
            "40000 <= income <= 60000 AND credit_score > 700 AND existing_debt == None"
        );
    }

    #[test]
    fn statistics_summarise_priority_levels() {
        let stats = RuleRepository::standard().statistics();
        assert_eq!(stats.total_rules, 8);
        assert_eq!(stats.high_priority_rules, 4);
        assert_eq!(stats.medium_priority_rules, 1);
        assert_eq!(stats.low_priority_rules, 3);
        assert!((stats.average_specificity - 15.0 / 8.0).abs() < f64::EPSILON);
    }
}
