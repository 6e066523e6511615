//! Service Kit - Agent Tools
//!
//! The read-only crime queries the agent may call mid-reasoning.
//! [`CrimeToolKind`] is the single source for each tool's name, schema and
//! handler; the registry is generated from it.
//!
//! Every tool answers with plain text. Store failures and bad arguments
//! come back as failed results carrying a description, never as errors, so
//! one broken call cannot abort the reasoning loop.

mod case_detail;
mod listing;
mod summary;

use std::sync::Arc;

use agent_core::{ParameterSchema, Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::model::{CrimeCategory, CrimeStatus};
use crate::store::{CrimeFilter, CrimeStore};

/// Default row count for `get_all_crimes`
pub const DEFAULT_LIMIT: i64 = 50;
/// Default window for `get_recent_crimes`
pub const DEFAULT_DAYS: i64 = 7;

/// The crime tool catalog
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CrimeToolKind {
    GetAllCrimes,
    GetCrimesByCategory,
    GetCrimesByDistrict,
    GetCrimesByStatus,
    GetRecentCrimes,
    GetCrimeSummaryStats,
    GetSingleCrime,
}

impl CrimeToolKind {
    /// Name as the model sees it
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn description(self) -> String {
        match self {
            Self::GetAllCrimes => {
                "Fetch crime reports, newest first, as a one-line-per-case summary. \
                 Use limit to control how many records to retrieve (default 50)."
                    .into()
            }
            Self::GetCrimesByCategory => format!(
                "Fetch crime reports filtered by category, with location and a short description. \
                 Categories: {}",
                choices::<CrimeCategory>()
            ),
            Self::GetCrimesByDistrict => {
                "Fetch all crime reports from a specific district or location. \
                 Example: 'Kampala', 'Wakiso', 'Mukono'"
                    .into()
            }
            Self::GetCrimesByStatus => format!(
                "Fetch crime reports by their investigation status. Statuses: {}",
                choices::<CrimeStatus>()
            ),
            Self::GetRecentCrimes => {
                "Fetch crime reports from the last N days. \
                 Default is last 7 days. Use days=30 for last month."
                    .into()
            }
            Self::GetCrimeSummaryStats => {
                "Get overall crime statistics including totals by category, \
                 status, severity, and top districts. Use this for overview analysis."
                    .into()
            }
            Self::GetSingleCrime => {
                "Get full details of a specific crime report by its case number, \
                 including suspects and witnesses. Example case number format: UPF-CASE-00001"
                    .into()
            }
        }
    }

    pub fn parameters(self) -> Vec<ParameterSchema> {
        match self {
            Self::GetAllCrimes => vec![ParameterSchema::integer_with_default(
                "limit",
                "Maximum number of reports to return",
                DEFAULT_LIMIT,
            )],
            Self::GetCrimesByCategory => vec![ParameterSchema::required_string(
                "category",
                "Crime category, e.g. 'theft' or 'robbery'",
            )],
            Self::GetCrimesByDistrict => vec![ParameterSchema::required_string(
                "district",
                "District or area name",
            )],
            Self::GetCrimesByStatus => vec![
                ParameterSchema::required_string("crime_status", "Investigation status")
                    .with_enum(CrimeStatus::iter().map(|s| s.to_string())),
            ],
            Self::GetRecentCrimes => vec![ParameterSchema::integer_with_default(
                "days",
                "How many days back to look",
                DEFAULT_DAYS,
            )],
            Self::GetCrimeSummaryStats => Vec::new(),
            Self::GetSingleCrime => vec![ParameterSchema::required_string(
                "case_number",
                "Case number, e.g. UPF-CASE-00001",
            )],
        }
    }

    pub fn schema(self) -> ToolSchema {
        ToolSchema {
            name: self.name().into(),
            description: self.description(),
            parameters: self.parameters(),
            category: Some("crime_data".into()),
            has_side_effects: false,
        }
    }

    /// Run the query. `Err` carries the text for a failed tool result.
    async fn run(self, store: &dyn CrimeStore, call: &ToolCall) -> Result<String, String> {
        match self {
            Self::GetAllCrimes => {
                let limit = positive_arg(call, "limit", DEFAULT_LIMIT)?;
                let reports = store
                    .query(&CrimeFilter::all(), Some(limit))
                    .await
                    .map_err(|e| format!("Error retrieving crimes: {e}"))?;
                Ok(listing::all_crimes(&reports))
            }
            Self::GetCrimesByCategory => {
                let category = required_arg(call, "category")?;
                let reports = store
                    .query(&CrimeFilter::all().category(category), None)
                    .await
                    .map_err(|e| format!("Error retrieving crimes by category: {e}"))?;
                Ok(listing::by_category(category, &reports))
            }
            Self::GetCrimesByDistrict => {
                let district = required_arg(call, "district")?;
                let reports = store
                    .query(&CrimeFilter::all().district(district), None)
                    .await
                    .map_err(|e| format!("Error retrieving crimes by district: {e}"))?;
                Ok(listing::by_district(district, &reports))
            }
            Self::GetCrimesByStatus => {
                let status = required_arg(call, "crime_status")?;
                let reports = store
                    .query(&CrimeFilter::all().status(status), None)
                    .await
                    .map_err(|e| format!("Error retrieving crimes by status: {e}"))?;
                Ok(listing::by_status(status, &reports))
            }
            Self::GetRecentCrimes => {
                let days = call
                    .int_arg("days", DEFAULT_DAYS)
                    .map_err(|e| e.to_string())?;
                if days < 0 {
                    return Err(format!("'days' must not be negative, got {days}"));
                }
                let since = Duration::try_days(days)
                    .and_then(|window| Utc::now().checked_sub_signed(window))
                    .ok_or_else(|| format!("'days' is out of range, got {days}"))?;
                let reports = store
                    .query(&CrimeFilter::all().reported_since(since), None)
                    .await
                    .map_err(|e| format!("Error retrieving recent crimes: {e}"))?;
                Ok(listing::recent(days, &reports))
            }
            Self::GetCrimeSummaryStats => {
                let stats = store
                    .summary()
                    .await
                    .map_err(|e| format!("Error retrieving stats: {e}"))?;
                Ok(summary::render(&stats))
            }
            Self::GetSingleCrime => {
                let raw = required_arg(call, "case_number")?;
                let Ok(case_number) = raw.parse() else {
                    return Ok(case_detail::not_found(raw));
                };
                let report = store
                    .get(&case_number)
                    .await
                    .map_err(|e| format!("Error retrieving crime: {e}"))?;
                Ok(report.map_or_else(|| case_detail::not_found(raw), |r| case_detail::render(&r)))
            }
        }
    }
}

fn choices<E: IntoEnumIterator + std::fmt::Display>() -> String {
    E::iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ")
}

fn required_arg<'a>(call: &'a ToolCall, key: &str) -> Result<&'a str, String> {
    call.str_arg(key)
        .ok_or_else(|| format!("Missing required parameter: {key}"))
}

fn positive_arg(call: &ToolCall, key: &str, default: i64) -> Result<usize, String> {
    let value = call.int_arg(key, default).map_err(|e| e.to_string())?;
    usize::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| format!("'{key}' must be a positive integer, got {value}"))
}

/// One crime query bound to a store
pub struct CrimeQueryTool {
    kind: CrimeToolKind,
    store: Arc<dyn CrimeStore>,
}

impl CrimeQueryTool {
    pub fn new(kind: CrimeToolKind, store: Arc<dyn CrimeStore>) -> Self {
        Self { kind, store }
    }
}

#[async_trait]
impl Tool for CrimeQueryTool {
    fn schema(&self) -> ToolSchema {
        self.kind.schema()
    }

    async fn execute(&self, call: &ToolCall) -> agent_core::Result<ToolResult> {
        let name = self.kind.name();
        tracing::debug!(tool = name, args = ?call.arguments, "Crime query");

        Ok(match self.kind.run(self.store.as_ref(), call).await {
            Ok(output) => ToolResult::success(name, output),
            Err(error) => {
                tracing::error!(tool = name, %error, "Crime query failed");
                ToolResult::failure(name, error)
            }
        })
    }
}

/// Registry holding every crime tool, bound to `store`
pub fn crime_tools(store: Arc<dyn CrimeStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for kind in CrimeToolKind::iter() {
        registry.register(CrimeQueryTool::new(kind, store.clone()));
    }
    registry
}

/// Cut `text` to `max` characters, marking the cut
pub(crate) fn truncate(text: &str, max: usize) -> String {
    let mut out: String = text.chars().take(max).collect();
    if text.chars().count() > max {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AnalysisError, Result as AnalysisResult};
    use crate::model::{CaseNumber, CrimeReport};
    use crate::store::MemoryCrimeStore;

    async fn theft_and_assault_store() -> Arc<dyn CrimeStore> {
        let store = MemoryCrimeStore::new();
        for (title, category, district) in [
            ("Phone stolen", CrimeCategory::Theft, "Kampala"),
            ("Bicycle stolen", CrimeCategory::Theft, "Wakiso"),
            ("Bar fight", CrimeCategory::Assault, "Kampala"),
        ] {
            let mut report = CrimeReport::new(title, category, district, Utc::now());
            report.description = format!("{title} description");
            store.insert(report).await.unwrap();
        }
        Arc::new(store)
    }

    async fn call(registry: &ToolRegistry, call: ToolCall) -> ToolResult {
        registry.execute(&call).await.unwrap()
    }

    #[test]
    fn test_schema_is_generated_for_every_kind() {
        let registry = crime_tools(Arc::new(MemoryCrimeStore::new()));
        assert_eq!(
            registry.names(),
            vec![
                "get_all_crimes",
                "get_crime_summary_stats",
                "get_crimes_by_category",
                "get_crimes_by_district",
                "get_crimes_by_status",
                "get_recent_crimes",
                "get_single_crime",
            ]
        );
        for schema in registry.schemas() {
            assert!(!schema.has_side_effects);
        }
        let category = CrimeToolKind::GetCrimesByCategory.schema();
        assert!(category.description.contains("drug_offense"));
    }

    #[tokio::test]
    async fn test_category_filter_returns_only_matching_records() {
        let registry = crime_tools(theft_and_assault_store().await);

        let result = call(&registry, ToolCall::new("get_crimes_by_category").with_arg("category", "theft")).await;
        assert!(result.success);
        assert!(result.output.starts_with("Found 2 theft cases:"));
        assert_eq!(result.output.matches("- Case: ").count(), 2);
        assert!(result.output.contains("Phone stolen"));
        assert!(result.output.contains("Bicycle stolen"));
        assert!(!result.output.contains("Bar fight"));
    }

    #[tokio::test]
    async fn test_zero_results_are_stated_explicitly() {
        let registry = crime_tools(theft_and_assault_store().await);

        for tool_call in [
            ToolCall::new("get_crimes_by_category").with_arg("category", "arson"),
            ToolCall::new("get_crimes_by_district").with_arg("district", "Gulu"),
            ToolCall::new("get_crimes_by_status").with_arg("crime_status", "cold_case"),
            ToolCall::new("get_single_crime").with_arg("case_number", "UPF-CASE-00999"),
        ] {
            let result = call(&registry, tool_call).await;
            assert!(result.success);
            assert!(!result.output.is_empty());
            assert!(result.output.starts_with("No crime report"), "{}", result.output);
        }

        let empty = crime_tools(Arc::new(MemoryCrimeStore::new()));
        for name in ["get_all_crimes", "get_recent_crimes", "get_crime_summary_stats"] {
            let result = call(&empty, ToolCall::new(name)).await;
            assert!(result.output.starts_with("No crime reports"), "{}", result.output);
        }
    }

    #[tokio::test]
    async fn test_district_is_substring_and_case_insensitive() {
        let registry = crime_tools(theft_and_assault_store().await);
        let result = call(&registry, ToolCall::new("get_crimes_by_district").with_arg("district", "KAMP")).await;
        assert!(result.output.starts_with("Found 2 crimes in KAMP:"));
    }

    #[tokio::test]
    async fn test_numeric_arguments() {
        let registry = crime_tools(theft_and_assault_store().await);

        let limited = call(&registry, ToolCall::new("get_all_crimes").with_arg("limit", "1")).await;
        assert!(limited.output.starts_with("Found 1 crime reports:"));

        let bad = call(&registry, ToolCall::new("get_all_crimes").with_arg("limit", "lots")).await;
        assert!(!bad.success);
        assert!(bad.output.contains("limit"));

        let zero = call(&registry, ToolCall::new("get_all_crimes").with_arg("limit", 0)).await;
        assert!(!zero.success);

        let recent = call(&registry, ToolCall::new("get_recent_crimes").with_arg("days", 30)).await;
        assert!(recent.output.starts_with("Found 3 crimes in the last 30 days:"));
    }

    #[tokio::test]
    async fn test_huge_day_windows_fail_as_text() {
        let registry = crime_tools(theft_and_assault_store().await);

        for days in [1_000_000_000_i64, i64::MAX] {
            let result = call(&registry, ToolCall::new("get_recent_crimes").with_arg("days", days)).await;
            assert!(!result.success);
            assert_eq!(result.output, format!("'days' is out of range, got {days}"));
        }

        let negative = call(&registry, ToolCall::new("get_recent_crimes").with_arg("days", -1)).await;
        assert!(!negative.success);
    }

    struct BrokenStore;

    #[async_trait]
    impl CrimeStore for BrokenStore {
        async fn query(&self, _: &CrimeFilter, _: Option<usize>) -> AnalysisResult<Vec<CrimeReport>> {
            Err(AnalysisError::Store("connection refused".into()))
        }

        async fn get(&self, _: &CaseNumber) -> AnalysisResult<Option<CrimeReport>> {
            Err(AnalysisError::Store("connection refused".into()))
        }

        async fn mark_analyzed(&self, _: &CaseNumber) -> AnalysisResult<bool> {
            Err(AnalysisError::Store("connection refused".into()))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_store_failures_become_text() {
        let registry = crime_tools(Arc::new(BrokenStore));

        let result = call(&registry, ToolCall::new("get_crime_summary_stats")).await;
        assert!(!result.success);
        assert_eq!(result.output, "Error retrieving stats: Crime store error: connection refused");
    }

    #[test]
    fn test_truncate_marks_cut() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
