//! Applicant list import from JSON documents and CSV exports.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::inference::service::{ApplicantSource, ApplicantSourceError};
use crate::inference::ApplicantSubmission;

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read applicant dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid applicant JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid applicant CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// In-memory list of applicant submissions, unvalidated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicantDataset {
    applicants: Vec<ApplicantSubmission>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DatasetDocument {
    Wrapped { applicants: Vec<ApplicantSubmission> },
    Bare(Vec<ApplicantSubmission>),
}

impl ApplicantDataset {
    pub fn new(applicants: Vec<ApplicantSubmission>) -> Self {
        Self { applicants }
    }

    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(path)?;
        Self::from_json_reader(file)
    }

    /// Accepts `{"applicants": [...]}` or a bare array.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let applicants = match serde_json::from_reader(reader)? {
            DatasetDocument::Wrapped { applicants } => applicants,
            DatasetDocument::Bare(applicants) => applicants,
        };
        Ok(Self { applicants })
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    /// Header row must name the applicant fields; blank cells count as missing.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut applicants = Vec::new();

        for record in csv_reader.deserialize::<ApplicantRow>() {
            applicants.push(record?.into_submission());
        }

        Ok(Self { applicants })
    }

    pub fn applicants(&self) -> &[ApplicantSubmission] {
        &self.applicants
    }

    pub fn into_applicants(self) -> Vec<ApplicantSubmission> {
        self.applicants
    }

    pub fn len(&self) -> usize {
        self.applicants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applicants.is_empty()
    }
}

impl ApplicantSource for ApplicantDataset {
    fn applicants(&self) -> Result<Vec<ApplicantSubmission>, ApplicantSourceError> {
        Ok(self.applicants.clone())
    }
}

/// Dataset read from disk on every request, so edits show up without a
/// restart. Files ending in `.csv` are parsed as CSV, everything else as JSON.
#[derive(Debug, Clone)]
pub struct DatasetFile {
    path: PathBuf,
}

impl DatasetFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<ApplicantDataset, DatasetError> {
        let is_csv = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv {
            ApplicantDataset::from_csv_path(&self.path)
        } else {
            ApplicantDataset::from_json_path(&self.path)
        }
    }
}

impl ApplicantSource for DatasetFile {
    fn applicants(&self) -> Result<Vec<ApplicantSubmission>, ApplicantSourceError> {
        self.load()
            .map(ApplicantDataset::into_applicants)
            .map_err(|err| ApplicantSourceError::Unavailable(err.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ApplicantRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    applicant_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    income: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    credit_score: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    employment_status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    employment_duration: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    age: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    dependents: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    existing_debt: Option<String>,
}

impl ApplicantRow {
    fn into_submission(self) -> ApplicantSubmission {
        ApplicantSubmission {
            applicant_id: self.applicant_id,
            income: self.income.map(Value::String),
            credit_score: self.credit_score.map(Value::String),
            employment_status: self.employment_status.map(Value::String),
            employment_duration: self.employment_duration.map(Value::String),
            age: self.age.map(Value::String),
            dependents: self.dependents.map(Value::String),
            existing_debt: self.existing_debt.map(Value::String),
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
