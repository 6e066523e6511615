//! Single-record view: every field, suspects and witnesses.

use std::fmt::Write;

use super::truncate;
use crate::model::{CrimeReport, present};

/// Witness statement cap
const STATEMENT_PREVIEW: usize = 100;

pub fn not_found(case_number: &str) -> String {
    format!("No crime report found with case number: {case_number}")
}

pub fn render(r: &CrimeReport) -> String {
    let mut out = String::from("=== CRIME REPORT DETAILS ===\n");
    let _ = writeln!(out, "Case Number   : {}", r.case_number);
    let _ = writeln!(out, "Title         : {}", r.title);
    let _ = writeln!(out, "Category      : {}", r.category);
    let _ = writeln!(out, "Severity      : {}", r.severity);
    let _ = writeln!(out, "Status        : {}", r.status);
    let _ = writeln!(out, "Location      : {}, {}", r.location, r.district);
    if let (Some(lat), Some(long)) = (r.latitude, r.longitude) {
        let _ = writeln!(out, "Coordinates   : {lat}, {long}");
    }
    let _ = writeln!(out, "Date Occurred : {}", r.date_occurred.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(out, "Date Reported : {}", r.date_reported.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(out, "Victim Count  : {}", r.victim_count);
    let _ = writeln!(
        out,
        "Victim Info   : {}",
        present(r.victim_details.as_ref()).unwrap_or("Not provided")
    );
    let _ = writeln!(out, "Description   : {}", r.description);
    let _ = writeln!(
        out,
        "Weapons Used  : {}",
        present(r.weapons_used.as_ref()).unwrap_or("None reported")
    );
    let _ = writeln!(
        out,
        "Modus Operandi: {}",
        present(r.modus_operandi.as_ref()).unwrap_or("Not provided")
    );
    let _ = writeln!(
        out,
        "Evidence      : {}",
        present(r.evidence_notes.as_ref()).unwrap_or("None")
    );
    let _ = writeln!(out, "Analyzed      : {}", if r.analyzed { "yes" } else { "no" });

    if !r.suspects.is_empty() {
        let _ = writeln!(out, "\nSUSPECTS ({}):", r.suspects.len());
        for s in &r.suspects {
            let alias = present(s.alias.as_ref())
                .map(|a| format!(" (alias {a})"))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "  - {}{alias} | Age: {} | Gender: {} | Known to victim: {} | Arrested: {}\n    Description: {}",
                s.display_name(),
                s.display_age(),
                s.gender,
                yes_no(s.known_to_victim),
                yes_no(s.arrested),
                present(s.description.as_ref()).unwrap_or("Not provided"),
            );
        }
    }

    if !r.witnesses.is_empty() {
        let _ = writeln!(out, "\nWITNESSES ({}):", r.witnesses.len());
        for w in &r.witnesses {
            let _ = writeln!(
                out,
                "  - {}: {}",
                w.display_name(),
                truncate(&w.statement, STATEMENT_PREVIEW)
            );
        }
    }

    out
}

const fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCrimeStore;
    use crate::store::CrimeStore;

    #[tokio::test]
    async fn test_detail_includes_related_records() {
        let store = MemoryCrimeStore::sample();
        let report = store
            .get(&"UPF-CASE-00001".parse().unwrap())
            .await
            .unwrap()
            .unwrap();

        let out = render(&report);
        assert!(out.contains("Case Number   : UPF-CASE-00001"));
        assert!(out.contains("Weapons Used  : Pistol"));
        assert!(out.contains("SUSPECTS (2):"));
        assert!(out.contains("  - Unknown | Age: 25 | Gender: male"));
        assert!(out.contains("Okello Peter (alias Kapere)"));
        assert!(out.contains("WITNESSES (2):"));
        assert!(out.contains("  - Anonymous: The same motorcycle"));
        // Description is never capped in the detail view
        assert!(out.contains(&report.description));
    }

    #[test]
    fn test_missing_fields_use_placeholders() {
        let report = CrimeReport::new(
            "Bare",
            crate::model::CrimeCategory::Other,
            "Gulu",
            chrono::Utc::now(),
        );
        let out = render(&report);
        assert!(out.contains("Weapons Used  : None reported"));
        assert!(out.contains("Modus Operandi: Not provided"));
        assert!(out.contains("Evidence      : None"));
        assert!(!out.contains("SUSPECTS"));
    }
}
