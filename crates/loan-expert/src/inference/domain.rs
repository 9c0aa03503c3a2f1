use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier wrapper for evaluated applicants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantId(pub String);

impl fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Employment situation declared by the applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmploymentStatus {
    Employed,
    #[serde(rename = "Self-Employed")]
    SelfEmployed,
    Unemployed,
    Retired,
}

impl EmploymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EmploymentStatus::Employed => "Employed",
            EmploymentStatus::SelfEmployed => "Self-Employed",
            EmploymentStatus::Unemployed => "Unemployed",
            EmploymentStatus::Retired => "Retired",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "employed" => Some(Self::Employed),
            "self-employed" | "selfemployed" => Some(Self::SelfEmployed),
            "unemployed" => Some(Self::Unemployed),
            "retired" => Some(Self::Retired),
            _ => None,
        }
    }
}

/// Categorical burden of debt already carried by the applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DebtLevel {
    None,
    Low,
    Medium,
    High,
}

impl DebtLevel {
    pub const fn label(self) -> &'static str {
        match self {
            DebtLevel::None => "None",
            DebtLevel::Low => "Low",
            DebtLevel::Medium => "Medium",
            DebtLevel::High => "High",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Some(Self::None),
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Validated applicant facts. Immutable for the duration of an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Applicant {
    pub applicant_id: ApplicantId,
    pub income: u64,
    pub credit_score: u16,
    pub employment_status: EmploymentStatus,
    pub employment_duration: f64,
    pub age: u8,
    pub dependents: u32,
    pub existing_debt: DebtLevel,
}

/// Terminal label produced by an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Decision {
    #[serde(rename = "Approve Loan")]
    Approve,
    #[serde(rename = "Approve with Conditions")]
    ApproveWithConditions,
    #[serde(rename = "Reject Loan")]
    Reject,
    #[serde(rename = "Manual Review")]
    ManualReview,
}

impl Decision {
    pub const ALL: [Decision; 4] = [
        Decision::Approve,
        Decision::ApproveWithConditions,
        Decision::Reject,
        Decision::ManualReview,
    ];

    /// Order in which backward chaining tries the hypotheses.
    pub const HYPOTHESIS_ORDER: [Decision; 4] = [
        Decision::Reject,
        Decision::Approve,
        Decision::ApproveWithConditions,
        Decision::ManualReview,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Decision::Approve => "Approve Loan",
            Decision::ApproveWithConditions => "Approve with Conditions",
            Decision::Reject => "Reject Loan",
            Decision::ManualReview => "Manual Review",
        }
    }

    /// Higher is more conservative; used when the two chains disagree.
    pub const fn severity(self) -> u8 {
        match self {
            Decision::Reject => 4,
            Decision::ManualReview => 3,
            Decision::ApproveWithConditions => 2,
            Decision::Approve => 1,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Name of a fact visible in working memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactKey {
    Income,
    CreditScore,
    EmploymentStatus,
    EmploymentDuration,
    Age,
    Dependents,
    ExistingDebt,
    Derived(String),
}

impl FactKey {
    pub fn derived(name: impl Into<String>) -> Self {
        FactKey::Derived(name.into())
    }

    pub fn is_derived(&self) -> bool {
        matches!(self, FactKey::Derived(_))
    }

    pub fn name(&self) -> &str {
        match self {
            FactKey::Income => "income",
            FactKey::CreditScore => "credit_score",
            FactKey::EmploymentStatus => "employment_status",
            FactKey::EmploymentDuration => "employment_duration",
            FactKey::Age => "age",
            FactKey::Dependents => "dependents",
            FactKey::ExistingDebt => "existing_debt",
            FactKey::Derived(name) => name,
        }
    }
}

impl fmt::Display for FactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value representation for a fact so conditions can consume structured data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl FactValue {
    pub fn text(value: impl Into<String>) -> Self {
        FactValue::Text(value.into())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FactValue::Number(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactValue::Number(value) if value.fract() == 0.0 => write!(f, "{value:.0}"),
            FactValue::Number(value) => write!(f, "{value}"),
            FactValue::Flag(value) => write!(f, "{value}"),
            FactValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<f64> for FactValue {
    fn from(value: f64) -> Self {
        FactValue::Number(value)
    }
}

impl From<bool> for FactValue {
    fn from(value: bool) -> Self {
        FactValue::Flag(value)
    }
}

impl From<&str> for FactValue {
    fn from(value: &str) -> Self {
        FactValue::Text(value.to_string())
    }
}

impl Applicant {
    /// Read one of the seven applicant attributes. Derived keys are never
    /// answered here.
    pub fn fact(&self, key: &FactKey) -> Option<FactValue> {
        let value = match key {
            FactKey::Income => FactValue::Number(self.income as f64),
            FactKey::CreditScore => FactValue::Number(f64::from(self.credit_score)),
            FactKey::EmploymentStatus => FactValue::text(self.employment_status.label()),
            FactKey::EmploymentDuration => FactValue::Number(self.employment_duration),
            FactKey::Age => FactValue::Number(f64::from(self.age)),
            FactKey::Dependents => FactValue::Number(f64::from(self.dependents)),
            FactKey::ExistingDebt => FactValue::text(self.existing_debt.label()),
            FactKey::Derived(_) => return None,
        };
        Some(value)
    }
}
