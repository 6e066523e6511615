//! List views: one line per case, plus a capped description where the
//! filter calls for it.

use std::fmt::Write;

use super::truncate;
use crate::model::CrimeReport;

/// Description cap in category listings
const DESCRIPTION_PREVIEW: usize = 150;

pub fn all_crimes(reports: &[CrimeReport]) -> String {
    if reports.is_empty() {
        return "No crime reports found in the database.".into();
    }

    let mut out = format!("Found {} crime reports:\n\n", reports.len());
    for r in reports {
        let _ = writeln!(
            out,
            "- Case: {} | {} | Category: {} | Severity: {} | Status: {} | District: {} | Date: {}",
            r.case_number,
            r.title,
            r.category,
            r.severity,
            r.status,
            r.district,
            r.date_occurred.format("%Y-%m-%d"),
        );
    }
    out
}

pub fn by_category(category: &str, reports: &[CrimeReport]) -> String {
    if reports.is_empty() {
        return format!("No crime reports found for category: {category}");
    }

    let mut out = format!("Found {} {category} cases:\n\n", reports.len());
    for r in reports {
        let _ = writeln!(
            out,
            "- Case: {} | {} | Severity: {} | Status: {} | Location: {}, {} | Date: {}\n  Description: {}",
            r.case_number,
            r.title,
            r.severity,
            r.status,
            r.location,
            r.district,
            r.date_occurred.format("%Y-%m-%d"),
            truncate(&r.description, DESCRIPTION_PREVIEW),
        );
    }
    out
}

pub fn by_district(district: &str, reports: &[CrimeReport]) -> String {
    if reports.is_empty() {
        return format!("No crime reports found for district: {district}");
    }

    let mut out = format!("Found {} crimes in {district}:\n\n", reports.len());
    for r in reports {
        let _ = writeln!(
            out,
            "- Case: {} | {} | Category: {} | Severity: {} | Status: {} | Date: {}",
            r.case_number,
            r.title,
            r.category,
            r.severity,
            r.status,
            r.date_occurred.format("%Y-%m-%d"),
        );
    }
    out
}

pub fn by_status(status: &str, reports: &[CrimeReport]) -> String {
    if reports.is_empty() {
        return format!("No crime reports found with status: {status}");
    }

    let mut out = format!("Found {} cases with status '{status}':\n\n", reports.len());
    for r in reports {
        let _ = writeln!(
            out,
            "- Case: {} | {} | Category: {} | Severity: {} | District: {} | Date: {}",
            r.case_number,
            r.title,
            r.category,
            r.severity,
            r.district,
            r.date_occurred.format("%Y-%m-%d"),
        );
    }
    out
}

pub fn recent(days: i64, reports: &[CrimeReport]) -> String {
    if reports.is_empty() {
        return format!("No crime reports found in the last {days} days.");
    }

    let mut out = format!("Found {} crimes in the last {days} days:\n\n", reports.len());
    for r in reports {
        let _ = writeln!(
            out,
            "- Case: {} | {} | Category: {} | Severity: {} | District: {} | Date: {}",
            r.case_number,
            r.title,
            r.category,
            r.severity,
            r.district,
            r.date_occurred.format("%Y-%m-%d %H:%M"),
        );
    }
    out
}
