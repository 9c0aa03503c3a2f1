use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{Applicant, ApplicantId, DebtLevel, EmploymentStatus};

pub const MIN_CREDIT_SCORE: i64 = 300;
pub const MAX_CREDIT_SCORE: i64 = 850;
pub const MAX_AGE: i64 = 130;

/// Loosely-typed applicant record as it arrives from HTTP, JSON or CSV.
/// Numeric fields accept JSON numbers or numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicantSubmission {
    #[serde(default)]
    pub applicant_id: Option<String>,
    #[serde(default)]
    pub income: Option<Value>,
    #[serde(default)]
    pub credit_score: Option<Value>,
    #[serde(default)]
    pub employment_status: Option<Value>,
    #[serde(default)]
    pub employment_duration: Option<Value>,
    #[serde(default)]
    pub age: Option<Value>,
    #[serde(default)]
    pub dependents: Option<Value>,
    #[serde(default)]
    pub existing_debt: Option<Value>,
}

/// Rejections raised before any rule runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },
    #[error("field '{field}' must be numeric (found {found})")]
    NotNumeric { field: &'static str, found: String },
    #[error("field '{field}' must be a whole number (found {found})")]
    NotInteger { field: &'static str, found: String },
    #[error("field '{field}' is out of range: {value} is not within {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("field '{field}' has unknown value '{found}'")]
    UnknownCategory { field: &'static str, found: String },
    #[error("applicant_id must not be empty")]
    EmptyIdentifier,
}

impl ApplicantSubmission {
    /// Submission mirroring an already typed applicant.
    pub fn from_applicant(applicant: &Applicant) -> Self {
        Self {
            applicant_id: Some(applicant.applicant_id.0.clone()),
            income: Some(Value::from(applicant.income)),
            credit_score: Some(Value::from(applicant.credit_score)),
            employment_status: Some(Value::from(applicant.employment_status.label())),
            employment_duration: Some(Value::from(applicant.employment_duration)),
            age: Some(Value::from(applicant.age)),
            dependents: Some(Value::from(applicant.dependents)),
            existing_debt: Some(Value::from(applicant.existing_debt.label())),
        }
    }

    /// Convert into a typed applicant, checking presence and bounds of every
    /// field. A missing `existing_debt` is read as `None`.
    pub fn validate(&self) -> Result<Applicant, ValidationError> {
        let applicant_id = match self.applicant_id.as_deref().map(str::trim) {
            None => return Err(ValidationError::MissingField { field: "applicant_id" }),
            Some("") => return Err(ValidationError::EmptyIdentifier),
            Some(id) => ApplicantId(id.to_string()),
        };

        let income = integer("income", &self.income, 0, i64::MAX)?;
        let credit_score = integer(
            "credit_score",
            &self.credit_score,
            MIN_CREDIT_SCORE,
            MAX_CREDIT_SCORE,
        )?;

        let status_raw = text("employment_status", required("employment_status", &self.employment_status)?)?;
        let employment_status =
            EmploymentStatus::parse(status_raw).ok_or_else(|| ValidationError::UnknownCategory {
                field: "employment_status",
                found: status_raw.to_string(),
            })?;

        let employment_duration = number(
            "employment_duration",
            required("employment_duration", &self.employment_duration)?,
        )?;
        if !(employment_duration.is_finite() && employment_duration >= 0.0) {
            return Err(ValidationError::OutOfRange {
                field: "employment_duration",
                value: employment_duration,
                min: 0.0,
                max: f64::MAX,
            });
        }

        let age = integer("age", &self.age, 1, MAX_AGE)?;
        let dependents = integer("dependents", &self.dependents, 0, i64::from(u32::MAX))?;

        let existing_debt = match &self.existing_debt {
            None | Some(Value::Null) => DebtLevel::None,
            Some(value) => {
                let raw = text("existing_debt", value)?;
                DebtLevel::parse(raw).ok_or_else(|| ValidationError::UnknownCategory {
                    field: "existing_debt",
                    found: raw.to_string(),
                })?
            }
        };

        // Bounds above keep these conversions lossless.
        Ok(Applicant {
            applicant_id,
            income: income as u64,
            credit_score: credit_score as u16,
            employment_status,
            employment_duration,
            age: age as u8,
            dependents: dependents as u32,
            existing_debt,
        })
    }
}

fn required<'a>(field: &'static str, value: &'a Option<Value>) -> Result<&'a Value, ValidationError> {
    match value {
        None | Some(Value::Null) => Err(ValidationError::MissingField { field }),
        Some(value) => Ok(value),
    }
}

fn number(field: &'static str, value: &Value) -> Result<f64, ValidationError> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ValidationError::NotNumeric {
        field,
        found: value.to_string(),
    })
}

fn integer(
    field: &'static str,
    value: &Option<Value>,
    min: i64,
    max: i64,
) -> Result<i64, ValidationError> {
    let value = required(field, value)?;
    let parsed = number(field, value)?;
    if !parsed.is_finite() || parsed.fract() != 0.0 {
        return Err(ValidationError::NotInteger {
            field,
            found: value.to_string(),
        });
    }
    if parsed < min as f64 || parsed > max as f64 {
        return Err(ValidationError::OutOfRange {
            field,
            value: parsed,
            min: min as f64,
            max: max as f64,
        });
    }
    Ok(parsed as i64)
}

fn text<'a>(field: &'static str, value: &'a Value) -> Result<&'a str, ValidationError> {
    value
        .as_str()
        .ok_or_else(|| ValidationError::UnknownCategory {
            field,
            found: value.to_string(),
        })
}
