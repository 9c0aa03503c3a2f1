use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::inference::config::{ChainingMode, EngineConfig};
use crate::inference::domain::{
    Applicant, ApplicantId, DebtLevel, Decision, EmploymentStatus, FactKey, FactValue,
};
use crate::inference::engine::RuleEngine;
use crate::inference::rules::{
    Comparison, Condition, Conclusion, Rule, RuleRepository, HIGH_PRIORITY, LOW_PRIORITY,
    MEDIUM_PRIORITY,
};
use crate::inference::service::{ApplicantSource, ApplicantSourceError, LoanEvaluationService};
use crate::inference::validation::ApplicantSubmission;

#[allow(clippy::too_many_arguments)]
pub(crate) fn applicant(
    id: &str,
    income: u64,
    credit_score: u16,
    status: &str,
    employment_duration: f64,
    age: u8,
    dependents: u32,
    debt: &str,
) -> Applicant {
    Applicant {
        applicant_id: ApplicantId(id.to_string()),
        income,
        credit_score,
        employment_status: EmploymentStatus::parse(status).expect("known status"),
        employment_duration,
        age,
        dependents,
        existing_debt: DebtLevel::parse(debt).expect("known debt level"),
    }
}

pub(crate) fn submission(applicant: &Applicant) -> ApplicantSubmission {
    ApplicantSubmission::from_applicant(applicant)
}

pub(crate) fn a1() -> Applicant {
    applicant("A1", 70_000, 760, "Employed", 5.0, 30, 2, "Low")
}

pub(crate) fn a2() -> Applicant {
    applicant("A2", 50_000, 720, "Employed", 2.0, 25, 1, "None")
}

pub(crate) fn a3() -> Applicant {
    applicant("A3", 35_000, 640, "Employed", 0.5, 23, 4, "Medium")
}

pub(crate) fn a4() -> Applicant {
    applicant("A4", 20_000, 580, "Employed", 3.0, 22, 2, "High")
}

pub(crate) fn a5() -> Applicant {
    applicant("A5", 55_000, 680, "Unemployed", 0.0, 28, 2, "Low")
}

/// Rich, young applicant: R1 and R6 both apply.
pub(crate) fn underage_high_earner() -> Applicant {
    applicant("TEST_AGE", 100_000, 800, "Employed", 5.0, 20, 0, "None")
}

pub(crate) fn reference_applicants() -> Vec<Applicant> {
    vec![a1(), a2(), a3(), a4(), a5()]
}

pub(crate) fn engine_config(chaining_mode: ChainingMode) -> EngineConfig {
    EngineConfig {
        chaining_mode,
        parallel_batch: false,
        ..EngineConfig::default()
    }
}

pub(crate) fn engine() -> RuleEngine {
    RuleEngine::new(engine_config(ChainingMode::Both))
}

/// `stable_income` is derived from income; approval depends on it.
pub(crate) fn derived_fact_repository(income_floor: f64) -> RuleRepository {
    RuleRepository::from_rules(vec![
        Rule::new(
            "D1",
            LOW_PRIORITY,
            Condition::compare(FactKey::Income, Comparison::Gt, income_floor),
            Conclusion::Assert {
                fact: "stable_income".to_string(),
                value: true.into(),
            },
            "Income above floor",
        ),
        Rule::new(
            "D2",
            HIGH_PRIORITY,
            Condition::All(vec![
                Condition::compare(FactKey::derived("stable_income"), Comparison::Eq, true),
                Condition::compare(FactKey::CreditScore, Comparison::Gt, 750.0),
            ]),
            Conclusion::Decide(Decision::Approve),
            "Stable income AND excellent credit",
        ),
        Rule::new(
            "D3",
            MEDIUM_PRIORITY,
            Condition::compare(FactKey::derived("stable_income"), Comparison::Eq, true),
            Conclusion::Decide(Decision::ApproveWithConditions),
            "Stable income",
        ),
    ])
    .expect("valid rule set")
}

/// `a` and `b` each require the other; nothing can ever be proven.
pub(crate) fn cyclic_repository() -> RuleRepository {
    RuleRepository::from_rules(vec![
        Rule::new(
            "C1",
            HIGH_PRIORITY,
            Condition::compare(FactKey::derived("a"), Comparison::Eq, true),
            Conclusion::Assert {
                fact: "b".to_string(),
                value: true.into(),
            },
            "a implies b",
        ),
        Rule::new(
            "C2",
            HIGH_PRIORITY,
            Condition::compare(FactKey::derived("b"), Comparison::Eq, true),
            Conclusion::Assert {
                fact: "a".to_string(),
                value: true.into(),
            },
            "b implies a",
        ),
        Rule::new(
            "C3",
            HIGH_PRIORITY,
            Condition::compare(FactKey::derived("a"), Comparison::Eq, true),
            Conclusion::Decide(Decision::Approve),
            "a approves",
        ),
    ])
    .expect("valid rule set")
}

/// `a` can come from `b` (tried first) or directly from income; `b` needs
/// `a`. Approval needs both, so the first route to `a` hits the cycle before
/// the second one succeeds.
pub(crate) fn recovering_cycle_repository() -> RuleRepository {
    RuleRepository::from_rules(vec![
        Rule::new(
            "P1",
            HIGH_PRIORITY,
            Condition::compare(FactKey::derived("b"), Comparison::Eq, true),
            Conclusion::Assert {
                fact: "a".to_string(),
                value: true.into(),
            },
            "b implies a",
        ),
        Rule::new(
            "P2",
            MEDIUM_PRIORITY,
            Condition::compare(FactKey::Income, Comparison::Gt, 0.0),
            Conclusion::Assert {
                fact: "a".to_string(),
                value: true.into(),
            },
            "Any income implies a",
        ),
        Rule::new(
            "Q1",
            HIGH_PRIORITY,
            Condition::compare(FactKey::derived("a"), Comparison::Eq, true),
            Conclusion::Assert {
                fact: "b".to_string(),
                value: true.into(),
            },
            "a implies b",
        ),
        Rule::new(
            "X1",
            MEDIUM_PRIORITY,
            Condition::All(vec![
                Condition::compare(FactKey::derived("a"), Comparison::Eq, true),
                Condition::compare(FactKey::derived("b"), Comparison::Eq, true),
            ]),
            Conclusion::Decide(Decision::Approve),
            "a and b approve",
        ),
    ])
    .expect("valid rule set")
}

/// `length` assertion rules where each one enables the next and none decides.
pub(crate) fn assertion_chain_repository(length: usize) -> RuleRepository {
    let rules = (1..=length)
        .map(|step| {
            let condition = if step == 1 {
                Condition::compare(FactKey::Income, Comparison::Gt, 0.0)
            } else {
                Condition::compare(
                    FactKey::derived(format!("step_{}", step - 1)),
                    Comparison::Eq,
                    true,
                )
            };
            Rule::new(
                format!("S{step}"),
                LOW_PRIORITY,
                condition,
                Conclusion::Assert {
                    fact: format!("step_{step}"),
                    value: true.into(),
                },
                format!("Step {step} of the chain"),
            )
        })
        .collect();
    RuleRepository::from_rules(rules).expect("valid rule set")
}

/// Two rules assert `tier` with different values on the same evidence.
pub(crate) fn competing_assertions_repository() -> RuleRepository {
    RuleRepository::from_rules(vec![
        Rule::new(
            "T1",
            HIGH_PRIORITY,
            Condition::compare(FactKey::Income, Comparison::Gt, 0.0),
            Conclusion::Assert {
                fact: "tier".to_string(),
                value: FactValue::text("gold"),
            },
            "Income earns gold tier",
        ),
        Rule::new(
            "T2",
            LOW_PRIORITY,
            Condition::compare(FactKey::Income, Comparison::Gt, 0.0),
            Conclusion::Assert {
                fact: "tier".to_string(),
                value: FactValue::text("silver"),
            },
            "Income earns silver tier",
        ),
    ])
    .expect("valid rule set")
}

#[derive(Default)]
pub(crate) struct MemorySource {
    applicants: Vec<ApplicantSubmission>,
}

impl MemorySource {
    pub(crate) fn with(applicants: Vec<ApplicantSubmission>) -> Self {
        Self { applicants }
    }
}

impl ApplicantSource for MemorySource {
    fn applicants(&self) -> Result<Vec<ApplicantSubmission>, ApplicantSourceError> {
        Ok(self.applicants.clone())
    }
}

pub(crate) struct UnavailableSource;

impl ApplicantSource for UnavailableSource {
    fn applicants(&self) -> Result<Vec<ApplicantSubmission>, ApplicantSourceError> {
        Err(ApplicantSourceError::Unavailable("dataset offline".to_string()))
    }
}

pub(crate) fn build_service() -> Arc<LoanEvaluationService<MemorySource>> {
    let submissions = reference_applicants().iter().map(submission).collect();
    Arc::new(LoanEvaluationService::new(
        engine(),
        Arc::new(MemorySource::with(submissions)),
    ))
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
