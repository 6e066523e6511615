//! Domain Models
//!
//! Crime records as the analysis tools see them. Coordinates use
//! `rust_decimal`; choice fields are closed enums that parse
//! case-insensitively from their snake_case values.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::AnalysisError;

/// Prefix used for newly assigned case numbers
pub const CASE_PREFIX: &str = "UPF";

/// Crime category
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    EnumIter, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CrimeCategory {
    Theft,
    Assault,
    Homicide,
    Fraud,
    Cybercrime,
    Robbery,
    Burglary,
    DrugOffense,
    SexualOffense,
    Vandalism,
    Kidnapping,
    Arson,
    Corruption,
    #[default]
    Other,
}

/// Investigation status
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    EnumIter, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CrimeStatus {
    #[default]
    Reported,
    UnderInvestigation,
    Solved,
    Closed,
    ColdCase,
}

/// Severity
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    EnumIter, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CrimeSeverity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

/// Case identifier, `PREFIX-CASE-NNNNN`.
///
/// The empty value means "not yet assigned"; stores assign the next
/// sequence number on insert.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CaseNumber(String);

impl CaseNumber {
    /// Build from a sequence number, zero-padded to five digits
    pub fn from_sequence(prefix: &str, sequence: u32) -> Self {
        Self(format!("{prefix}-CASE-{sequence:05}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_assigned(&self) -> bool {
        !self.0.is_empty()
    }

    /// Numeric part of the identifier
    pub fn sequence(&self) -> Option<u32> {
        self.0.rsplit_once("-CASE-")?.1.parse().ok()
    }
}

impl FromStr for CaseNumber {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::default());
        }

        let valid = s.split_once("-CASE-").is_some_and(|(prefix, digits)| {
            !prefix.is_empty()
                && prefix.chars().all(|c| c.is_ascii_alphanumeric())
                && digits.len() >= 5
                && digits.chars().all(|c| c.is_ascii_digit())
        });

        if valid {
            Ok(Self(s.to_ascii_uppercase()))
        } else {
            Err(AnalysisError::InvalidCaseNumber(s.to_string()))
        }
    }
}

impl TryFrom<String> for CaseNumber {
    type Error = AnalysisError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CaseNumber> for String {
    fn from(value: CaseNumber) -> Self {
        value.0
    }
}

impl fmt::Display for CaseNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A suspect linked to a crime report
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Suspect {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub age_estimate: Option<u32>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub known_to_victim: bool,
    #[serde(default, alias = "is_arrested")]
    pub arrested: bool,
}

impl Suspect {
    /// Display name, "Unknown" when not recorded
    pub fn display_name(&self) -> &str {
        present(self.name.as_ref()).unwrap_or("Unknown")
    }

    /// Age estimate as text, "Unknown" when not recorded
    pub fn display_age(&self) -> String {
        self.age_estimate
            .map_or_else(|| "Unknown".to_string(), |age| age.to_string())
    }
}

/// A witness statement
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Witness {
    pub name: String,
    #[serde(default)]
    pub statement: String,
    #[serde(default, alias = "is_anonymous")]
    pub anonymous: bool,
}

impl Witness {
    pub fn display_name(&self) -> &str {
        if self.anonymous { "Anonymous" } else { &self.name }
    }
}

/// A crime report
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrimeReport {
    #[serde(default)]
    pub case_number: CaseNumber,
    pub title: String,
    #[serde(default)]
    pub category: CrimeCategory,
    #[serde(default)]
    pub severity: CrimeSeverity,
    #[serde(default)]
    pub status: CrimeStatus,

    pub description: String,
    #[serde(default)]
    pub weapons_used: Option<String>,
    #[serde(default)]
    pub modus_operandi: Option<String>,

    pub location: String,
    pub district: String,
    #[serde(default)]
    pub latitude: Option<Decimal>,
    #[serde(default)]
    pub longitude: Option<Decimal>,

    pub date_occurred: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub date_reported: DateTime<Utc>,

    #[serde(default = "default_victim_count")]
    pub victim_count: u32,
    #[serde(default)]
    pub victim_details: Option<String>,
    #[serde(default)]
    pub evidence_notes: Option<String>,

    #[serde(default, alias = "is_analyzed")]
    pub analyzed: bool,
    #[serde(default)]
    pub suspects: Vec<Suspect>,
    #[serde(default)]
    pub witnesses: Vec<Witness>,
}

const fn default_victim_count() -> u32 {
    1
}

impl CrimeReport {
    /// Minimal report, reported now, with no case number assigned yet
    pub fn new(
        title: impl Into<String>,
        category: CrimeCategory,
        district: impl Into<String>,
        date_occurred: DateTime<Utc>,
    ) -> Self {
        let district = district.into();
        Self {
            case_number: CaseNumber::default(),
            title: title.into(),
            category,
            severity: CrimeSeverity::default(),
            status: CrimeStatus::default(),
            description: String::new(),
            weapons_used: None,
            modus_operandi: None,
            location: district.clone(),
            district,
            latitude: None,
            longitude: None,
            date_occurred,
            date_reported: Utc::now(),
            victim_count: default_victim_count(),
            victim_details: None,
            evidence_notes: None,
            analyzed: false,
            suspects: Vec::new(),
            witnesses: Vec::new(),
        }
    }
}

/// Optional text that is actually filled in
pub fn present(field: Option<&String>) -> Option<&str> {
    field.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Lifecycle of an analysis request
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnalysisStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A stored agent analysis, single-report or general
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: u64,
    pub requested_by: String,
    pub case_number: Option<CaseNumber>,
    pub prompt: String,
    pub summary: String,
    pub status: AnalysisStatus,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<agent_core::FailureKind>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_number_format() {
        let case = CaseNumber::from_sequence(CASE_PREFIX, 7);
        assert_eq!(case.as_str(), "UPF-CASE-00007");
        assert_eq!(case.sequence(), Some(7));

        let parsed: CaseNumber = "upf-case-00042".parse().unwrap();
        assert_eq!(parsed.as_str(), "UPF-CASE-00042");
        assert!("CASE-1".parse::<CaseNumber>().is_err());
        assert!("UPF-CASE-12".parse::<CaseNumber>().is_err());
    }

    #[test]
    fn test_enums_parse_case_insensitively() {
        assert_eq!("THEFT".parse::<CrimeCategory>().unwrap(), CrimeCategory::Theft);
        assert_eq!(
            "Under_Investigation".parse::<CrimeStatus>().unwrap(),
            CrimeStatus::UnderInvestigation
        );
        assert_eq!(CrimeCategory::DrugOffense.to_string(), "drug_offense");
        assert!("mischief".parse::<CrimeCategory>().is_err());
    }

    #[test]
    fn test_report_deserializes_with_defaults() {
        let report: CrimeReport = serde_json::from_value(serde_json::json!({
            "title": "Phone snatched",
            "category": "theft",
            "description": "Boda rider grabbed a phone",
            "location": "Kampala Road",
            "district": "Kampala",
            "date_occurred": "2026-10-01T18:30:00Z",
            "latitude": "0.313611",
            "is_analyzed": true,
            "witnesses": [{ "name": "A", "statement": "saw it", "is_anonymous": true }]
        }))
        .unwrap();

        assert!(!report.case_number.is_assigned());
        assert_eq!(report.victim_count, 1);
        assert_eq!(report.severity, CrimeSeverity::Medium);
        assert_eq!(report.status, CrimeStatus::Reported);
        assert!(report.analyzed);
        assert_eq!(report.latitude, Some(rust_decimal_macros::dec!(0.313611)));
        assert_eq!(report.witnesses[0].display_name(), "Anonymous");
    }

    #[test]
    fn test_blank_optional_text_is_absent() {
        let blank = Some("   ".to_string());
        assert_eq!(present(blank.as_ref()), None);
        let filled = Some("panga".to_string());
        assert_eq!(present(filled.as_ref()), Some("panga"));
    }
}
