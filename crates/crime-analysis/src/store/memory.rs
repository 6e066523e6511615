//! In-Memory Crime Store
//!
//! For development, demos and tests. Loads a JSON array of reports or
//! ships a small built-in dataset.

use std::path::Path;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use tokio::sync::RwLock;

use super::{CrimeFilter, CrimeStore};
use crate::error::{AnalysisError, Result};
use crate::model::{
    CASE_PREFIX, CaseNumber, CrimeCategory, CrimeReport, CrimeSeverity, CrimeStatus, Gender,
    Suspect, Witness,
};

#[derive(Default)]
struct Inner {
    reports: Vec<CrimeReport>,
    next_sequence: u32,
}

impl Inner {
    fn insert(&mut self, mut report: CrimeReport) -> Result<CaseNumber> {
        if report.case_number.is_assigned() {
            if self.reports.iter().any(|r| r.case_number == report.case_number) {
                return Err(AnalysisError::Validation(format!(
                    "duplicate case number {}",
                    report.case_number
                )));
            }
        } else {
            report.case_number = CaseNumber::from_sequence(CASE_PREFIX, self.next_sequence.max(1));
        }

        let sequence = report.case_number.sequence().unwrap_or(0);
        self.next_sequence = self.next_sequence.max(sequence.saturating_add(1));

        let case_number = report.case_number.clone();
        self.reports.push(report);
        Ok(case_number)
    }
}

/// In-memory crime store
pub struct MemoryCrimeStore {
    inner: RwLock<Inner>,
}

impl Default for MemoryCrimeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCrimeStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                reports: Vec::new(),
                next_sequence: 1,
            }),
        }
    }

    /// Build from reports, assigning case numbers where missing
    pub fn from_reports(reports: impl IntoIterator<Item = CrimeReport>) -> Result<Self> {
        let mut inner = Inner {
            reports: Vec::new(),
            next_sequence: 1,
        };
        for report in reports {
            inner.insert(report)?;
        }
        Ok(Self {
            inner: RwLock::new(inner),
        })
    }

    /// Load a JSON array of crime reports
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let reports: Vec<CrimeReport> = serde_json::from_str(&raw)?;

        tracing::info!(path = %path.display(), count = reports.len(), "Loaded crime dataset");
        Self::from_reports(reports)
    }

    /// Add a report. Returns its (possibly newly assigned) case number.
    pub async fn insert(&self, report: CrimeReport) -> Result<CaseNumber> {
        self.inner.write().await.insert(report)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.reports.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.reports.is_empty()
    }

    /// Built-in demo dataset, dated relative to now
    pub fn sample() -> Self {
        let now = Utc::now();
        let mut reports = Vec::new();

        let mut r = CrimeReport::new(
            "Armed robbery at mobile money kiosk",
            CrimeCategory::Robbery,
            "Kampala",
            now - Duration::days(2),
        );
        r.severity = CrimeSeverity::High;
        r.status = CrimeStatus::UnderInvestigation;
        r.location = "Kisenyi, near the bus park".into();
        r.description = "Two men on a motorcycle threatened the kiosk attendant with a pistol and took the day's float before fleeing towards Nakivubo.".into();
        r.weapons_used = Some("Pistol".into());
        r.modus_operandi = Some("Motorcycle approach at closing time, pillion passenger carries the weapon".into());
        r.latitude = Some(dec!(0.312778));
        r.longitude = Some(dec!(32.569444));
        r.date_reported = now - Duration::days(2) + Duration::hours(1);
        r.victim_details = Some("Kiosk attendant, 24, unharmed".into());
        r.suspects = vec![
            Suspect {
                age_estimate: Some(25),
                gender: Gender::Male,
                description: Some("Slim, black helmet, red jacket".into()),
                ..Default::default()
            },
            Suspect {
                name: Some("Okello Peter".into()),
                alias: Some("Kapere".into()),
                age_estimate: Some(30),
                gender: Gender::Male,
                description: Some("Rider, known boda operator in Kisenyi".into()),
                ..Default::default()
            },
        ];
        r.witnesses = vec![
            Witness {
                name: "Nakato Sarah".into(),
                statement: "I saw two men on a red Bajaj stop at the kiosk around 8pm. The passenger pulled a gun and the attendant handed over a black bag.".into(),
                anonymous: false,
            },
            Witness {
                name: "Shop owner".into(),
                statement: "The same motorcycle passed twice before the robbery.".into(),
                anonymous: true,
            },
        ];
        reports.push(r);

        let mut r = CrimeReport::new(
            "Phone snatching on Kampala Road",
            CrimeCategory::Theft,
            "Kampala",
            now - Duration::days(1),
        );
        r.severity = CrimeSeverity::Low;
        r.location = "Kampala Road, opposite the post office".into();
        r.description = "Pedestrian's smartphone grabbed by a boda boda passenger during evening traffic.".into();
        r.modus_operandi = Some("Snatch from moving motorcycle".into());
        r.date_reported = now - Duration::hours(20);
        reports.push(r);

        let mut r = CrimeReport::new(
            "Burglary at hardware store",
            CrimeCategory::Burglary,
            "Wakiso",
            now - Duration::days(5),
        );
        r.severity = CrimeSeverity::Medium;
        r.status = CrimeStatus::Reported;
        r.location = "Nansana trading centre".into();
        r.description = "Padlocks cut overnight, cement and iron sheets removed. No alarm on the premises.".into();
        r.evidence_notes = Some("Bolt cutter marks, tyre tracks of a light truck".into());
        r.date_reported = now - Duration::days(4);
        reports.push(r);

        let mut r = CrimeReport::new(
            "Mobile money fraud ring",
            CrimeCategory::Fraud,
            "Mukono",
            now - Duration::days(20),
        );
        r.severity = CrimeSeverity::Medium;
        r.status = CrimeStatus::Solved;
        r.location = "Mukono town".into();
        r.description = "Callers impersonating network agents persuaded victims to reverse fake transactions.".into();
        r.victim_count = 6;
        r.date_reported = now - Duration::days(18);
        r.suspects = vec![Suspect {
            name: Some("Ssemanda John".into()),
            age_estimate: Some(34),
            gender: Gender::Male,
            arrested: true,
            ..Default::default()
        }];
        reports.push(r);

        let mut r = CrimeReport::new(
            "Assault outside bar",
            CrimeCategory::Assault,
            "Kampala",
            now - Duration::days(9),
        );
        r.severity = CrimeSeverity::Medium;
        r.status = CrimeStatus::Closed;
        r.location = "Kabalagala".into();
        r.description = "Fight between patrons after closing; victim treated for a head wound at Nsambya.".into();
        r.weapons_used = Some("Bottle".into());
        r.date_reported = now - Duration::days(9);
        reports.push(r);

        let mut r = CrimeReport::new(
            "Homicide in Entebbe",
            CrimeCategory::Homicide,
            "Wakiso",
            now - Duration::days(40),
        );
        r.severity = CrimeSeverity::Critical;
        r.status = CrimeStatus::ColdCase;
        r.location = "Kitoro, Entebbe".into();
        r.description = "Body of an adult male found near the lake shore with stab wounds. No identification documents.".into();
        r.weapons_used = Some("Knife".into());
        r.date_reported = now - Duration::days(40);
        reports.push(r);

        let mut r = CrimeReport::new(
            "SIM swap account takeover",
            CrimeCategory::Cybercrime,
            "Kampala",
            now - Duration::days(3),
        );
        r.severity = CrimeSeverity::High;
        r.status = CrimeStatus::UnderInvestigation;
        r.location = "Nakasero".into();
        r.description = "Victim's line was swapped and UGX 4,500,000 moved from the linked bank account within an hour.".into();
        r.date_reported = now - Duration::days(3);
        reports.push(r);

        let mut r = CrimeReport::new(
            "Motorcycle theft at market",
            CrimeCategory::Theft,
            "Mukono",
            now - Duration::days(6),
        );
        r.severity = CrimeSeverity::Medium;
        r.location = "Mukono central market".into();
        r.description = "Parked motorcycle stolen while the owner was offloading produce.".into();
        r.date_reported = now - Duration::days(6);
        reports.push(r);

        let mut inner = Inner {
            reports: Vec::new(),
            next_sequence: 1,
        };
        for report in reports {
            // Fresh dataset: every case number is newly assigned
            if let Err(e) = inner.insert(report) {
                tracing::warn!(error = %e, "Skipping sample report");
            }
        }

        Self {
            inner: RwLock::new(inner),
        }
    }
}

#[async_trait]
impl CrimeStore for MemoryCrimeStore {
    async fn query(&self, filter: &CrimeFilter, limit: Option<usize>) -> Result<Vec<CrimeReport>> {
        let inner = self.inner.read().await;
        let mut result: Vec<CrimeReport> = inner
            .reports
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();

        result.sort_by(|a, b| b.date_reported.cmp(&a.date_reported));
        if let Some(limit) = limit {
            result.truncate(limit);
        }

        Ok(result)
    }

    async fn get(&self, case_number: &CaseNumber) -> Result<Option<CrimeReport>> {
        let inner = self.inner.read().await;
        Ok(inner
            .reports
            .iter()
            .find(|r| &r.case_number == case_number)
            .cloned())
    }

    async fn mark_analyzed(&self, case_number: &CaseNumber) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.reports.iter_mut().find(|r| &r.case_number == case_number) {
            Some(report) => {
                report.analyzed = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "MemoryCrimeStore"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_case_numbers_are_assigned_in_sequence() {
        let store = MemoryCrimeStore::new();
        let a = store
            .insert(CrimeReport::new("a", CrimeCategory::Theft, "Kampala", Utc::now()))
            .await
            .unwrap();
        let b = store
            .insert(CrimeReport::new("b", CrimeCategory::Theft, "Kampala", Utc::now()))
            .await
            .unwrap();

        assert_eq!(a.as_str(), "UPF-CASE-00001");
        assert_eq!(b.as_str(), "UPF-CASE-00002");
    }

    #[tokio::test]
    async fn test_explicit_case_numbers_advance_the_sequence() {
        let mut explicit = CrimeReport::new("x", CrimeCategory::Fraud, "Mukono", Utc::now());
        explicit.case_number = "UPF-CASE-00041".parse().unwrap();
        let store = MemoryCrimeStore::from_reports([explicit.clone()]).unwrap();

        let next = store
            .insert(CrimeReport::new("y", CrimeCategory::Fraud, "Mukono", Utc::now()))
            .await
            .unwrap();
        assert_eq!(next.as_str(), "UPF-CASE-00042");
        assert!(store.insert(explicit).await.is_err());
    }

    #[tokio::test]
    async fn test_query_orders_newest_reported_first_and_limits() {
        let store = MemoryCrimeStore::sample();
        let all = store.query(&CrimeFilter::all(), None).await.unwrap();
        assert_eq!(all.len(), store.len().await);
        assert!(all.windows(2).all(|w| w[0].date_reported >= w[1].date_reported));

        let two = store.query(&CrimeFilter::all(), Some(2)).await.unwrap();
        assert_eq!(two.len(), 2);
        assert_eq!(two[0].case_number, all[0].case_number);
    }

    #[tokio::test]
    async fn test_mark_analyzed() {
        let store = MemoryCrimeStore::sample();
        let case: CaseNumber = "UPF-CASE-00001".parse().unwrap();

        assert!(store.mark_analyzed(&case).await.unwrap());
        assert!(store.get(&case).await.unwrap().unwrap().analyzed);
        assert!(
            !store
                .mark_analyzed(&"UPF-CASE-99999".parse().unwrap())
                .await
                .unwrap()
        );
    }
}
