//! Crime Store
//!
//! Read-side abstraction over crime records. The agent tools only ever
//! query through this trait, so a database-backed store can replace the
//! in-memory one without touching them.

mod memory;

pub use memory::MemoryCrimeStore;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::model::{CaseNumber, CrimeReport};

/// Number of districts listed in a summary
pub const TOP_DISTRICTS: usize = 10;

/// Query filter. Every set field must match.
#[derive(Clone, Debug, Default)]
pub struct CrimeFilter {
    /// Case-insensitive substring of the category value
    pub category: Option<String>,
    /// Case-insensitive substring of the district
    pub district: Option<String>,
    /// Case-insensitive exact status value
    pub status: Option<String>,
    /// Reported at or after this instant
    pub reported_since: Option<DateTime<Utc>>,
}

impl CrimeFilter {
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn district(mut self, district: impl Into<String>) -> Self {
        self.district = Some(district.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    #[must_use]
    pub const fn reported_since(mut self, since: DateTime<Utc>) -> Self {
        self.reported_since = Some(since);
        self
    }

    pub fn matches(&self, report: &CrimeReport) -> bool {
        if let Some(category) = &self.category {
            if !contains_ignore_case(report.category.as_ref(), category) {
                return false;
            }
        }
        if let Some(district) = &self.district {
            if !contains_ignore_case(&report.district, district) {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if !report.status.as_ref().eq_ignore_ascii_case(status.trim()) {
                return false;
            }
        }
        if let Some(since) = self.reported_since {
            if report.date_reported < since {
                return false;
            }
        }
        true
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_lowercase()
        .contains(&needle.trim().to_lowercase())
}

/// Grouped counts, each list sorted by count (descending) then name
#[derive(Clone, Debug, Default, Serialize)]
pub struct CrimeSummary {
    pub total: usize,
    pub by_category: Vec<(String, usize)>,
    pub by_status: Vec<(String, usize)>,
    pub by_severity: Vec<(String, usize)>,
    pub top_districts: Vec<(String, usize)>,
}

impl CrimeSummary {
    pub fn from_reports(reports: &[CrimeReport]) -> Self {
        let mut top_districts = group_counts(reports.iter().map(|r| r.district.trim().to_string()));
        top_districts.truncate(TOP_DISTRICTS);

        Self {
            total: reports.len(),
            by_category: group_counts(reports.iter().map(|r| r.category.to_string())),
            by_status: group_counts(reports.iter().map(|r| r.status.to_string())),
            by_severity: group_counts(reports.iter().map(|r| r.severity.to_string())),
            top_districts,
        }
    }
}

fn group_counts(keys: impl Iterator<Item = String>) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }

    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// Crime store trait (Strategy pattern)
#[async_trait]
pub trait CrimeStore: Send + Sync {
    /// Matching reports, newest reported first, at most `limit` if given
    async fn query(&self, filter: &CrimeFilter, limit: Option<usize>) -> Result<Vec<CrimeReport>>;

    /// Look up one report by case number
    async fn get(&self, case_number: &CaseNumber) -> Result<Option<CrimeReport>>;

    /// Flag a report as analyzed. Returns false if it does not exist.
    async fn mark_analyzed(&self, case_number: &CaseNumber) -> Result<bool>;

    /// Grouped statistics over every report
    async fn summary(&self) -> Result<CrimeSummary> {
        let reports = self.query(&CrimeFilter::all(), None).await?;
        Ok(CrimeSummary::from_reports(&reports))
    }

    /// Store name, for logs
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CrimeCategory, CrimeStatus};
    use chrono::Duration;

    fn report(category: CrimeCategory, district: &str, status: CrimeStatus) -> CrimeReport {
        let mut r = CrimeReport::new("x", category, district, Utc::now());
        r.status = status;
        r
    }

    #[test]
    fn test_filter_matching_rules() {
        let r = report(CrimeCategory::DrugOffense, "Kampala Central", CrimeStatus::UnderInvestigation);

        assert!(CrimeFilter::all().category("DRUG").matches(&r));
        assert!(CrimeFilter::all().district("kampala").matches(&r));
        assert!(CrimeFilter::all().status("Under_Investigation").matches(&r));
        // Status is exact on the choice value
        assert!(!CrimeFilter::all().status("under").matches(&r));
        assert!(!CrimeFilter::all().district("Wakiso").matches(&r));
        assert!(
            !CrimeFilter::all()
                .reported_since(Utc::now() + Duration::days(1))
                .matches(&r)
        );
    }

    #[test]
    fn test_summary_groups_and_orders() {
        let reports = vec![
            report(CrimeCategory::Theft, "Kampala", CrimeStatus::Reported),
            report(CrimeCategory::Theft, "Wakiso", CrimeStatus::Solved),
            report(CrimeCategory::Assault, "Kampala", CrimeStatus::Reported),
        ];

        let summary = CrimeSummary::from_reports(&reports);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_category[0], ("theft".to_string(), 2));
        assert_eq!(summary.top_districts[0], ("Kampala".to_string(), 2));
        assert_eq!(summary.by_severity, vec![("medium".to_string(), 3)]);
    }
}
