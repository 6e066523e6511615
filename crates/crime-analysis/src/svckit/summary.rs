//! Aggregate statistics view.

use std::fmt::Write;

use crate::store::CrimeSummary;

pub fn render(stats: &CrimeSummary) -> String {
    if stats.total == 0 {
        return "No crime reports in the database yet.".into();
    }

    let mut out = String::from("=== CRIME SUMMARY STATISTICS ===\n");
    let _ = writeln!(out, "Total Crime Reports: {}", stats.total);

    for (heading, rows) in [
        ("BY CATEGORY", &stats.by_category),
        ("BY STATUS", &stats.by_status),
        ("BY SEVERITY", &stats.by_severity),
        ("TOP DISTRICTS", &stats.top_districts),
    ] {
        let _ = writeln!(out, "\n{heading}:");
        for (name, count) in rows {
            let _ = writeln!(out, "  - {name}: {count} cases");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_sections() {
        let stats = CrimeSummary {
            total: 3,
            by_category: vec![("theft".into(), 2), ("assault".into(), 1)],
            by_status: vec![("reported".into(), 3)],
            by_severity: vec![("medium".into(), 3)],
            top_districts: vec![("Kampala".into(), 2), ("Wakiso".into(), 1)],
        };

        let out = render(&stats);
        assert!(out.contains("Total Crime Reports: 3"));
        assert!(out.contains("BY CATEGORY:\n  - theft: 2 cases\n  - assault: 1 cases"));
        assert!(out.contains("TOP DISTRICTS:\n  - Kampala: 2 cases"));
    }
}
