//! Prompt Templates
//!
//! The analyst persona and the task templates sent as the user turn.
//! Template fields are substituted explicitly; a missing optional field
//! becomes a fixed placeholder, never a gap.

use agent_core::ToolRegistry;

use crate::model::{CrimeReport, present};

const PERSONA: &str = r"You are SafePulse AI, an expert crime analysis agent for the Uganda Police Force.
Your role is to assist police officers and analysts by analyzing crime data,
identifying patterns, detecting hotspots, and generating intelligent reports.";

const ANALYSIS_RULES: &str = r"When analyzing crime data, always:
1. Identify recurring patterns (same location, same method, same crime type)
2. Detect crime hotspots (areas with high crime concentration)
3. Analyze time-based trends (peak hours, peak days, seasonal patterns)
4. Highlight high severity and unsolved cases that need attention
5. Provide actionable recommendations for crime prevention
6. Assess risk levels for specific areas or crime types

Always respond in a structured, professional format suitable for a police report.
Use clear headings and bullet points.
Base all analysis ONLY on the data provided by the tools.
Never fabricate or assume crime data that is not in the database.";

/// Default task for a corpus-wide analysis
pub const GENERAL_ANALYSIS_PROMPT: &str = r"Perform a comprehensive analysis of all available crime data.
Please provide:
1. Overall crime summary and statistics
2. Top crime categories and their frequency
3. Crime hotspots (most affected districts and locations)
4. Time-based trends (when crimes occur most)
5. High-risk unsolved cases
6. Patterns and correlations between cases
7. Strategic recommendations for crime prevention";

/// System prompt listing the tools actually registered
pub fn system_prompt(tools: &ToolRegistry) -> String {
    format!(
        "{PERSONA}\n\nYou have access to the following tools:\n{}\n{ANALYSIS_RULES}",
        tools.summary()
    )
}

/// Single-report deep-dive task
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SingleReportPrompt {
    pub case_number: String,
    pub title: String,
    pub category: String,
    pub severity: String,
    pub location: String,
    pub district: String,
    pub date_occurred: String,
    pub description: String,
    pub weapons_used: String,
    pub modus_operandi: String,
    pub victim_count: u32,
    pub suspects: String,
}

impl SingleReportPrompt {
    pub fn from_report(report: &CrimeReport) -> Self {
        let suspects = report
            .suspects
            .iter()
            .map(|s| {
                format!(
                    "{} (Age: {}, Gender: {})",
                    s.display_name(),
                    s.display_age(),
                    s.gender
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            case_number: report.case_number.to_string(),
            title: report.title.clone(),
            category: report.category.to_string(),
            severity: report.severity.to_string(),
            location: report.location.clone(),
            district: report.district.clone(),
            date_occurred: report.date_occurred.format("%Y-%m-%d %H:%M").to_string(),
            description: report.description.clone(),
            weapons_used: present(report.weapons_used.as_ref())
                .unwrap_or("None reported")
                .to_string(),
            modus_operandi: present(report.modus_operandi.as_ref())
                .unwrap_or("Not provided")
                .to_string(),
            victim_count: report.victim_count,
            suspects: if suspects.is_empty() {
                "No suspects recorded".into()
            } else {
                suspects
            },
        }
    }

    pub fn render(&self) -> String {
        format!(
            "Analyze this crime report in detail:
Case Number: {case_number}
Title: {title}
Category: {category}
Severity: {severity}
Location: {location}, {district}
Date Occurred: {date_occurred}
Description: {description}
Weapons Used: {weapons_used}
Modus Operandi: {modus_operandi}
Victim Count: {victim_count}
Suspects: {suspects}

Please provide:
1. A detailed summary of this crime
2. Comparison with similar crimes in the same area
3. Identified patterns or connections to other cases
4. Risk assessment for the area
5. Recommended investigation steps
6. Crime prevention recommendations",
            case_number = self.case_number,
            title = self.title,
            category = self.category,
            severity = self.severity,
            location = self.location,
            district = self.district,
            date_occurred = self.date_occurred,
            description = self.description,
            weapons_used = self.weapons_used,
            modus_operandi = self.modus_operandi,
            victim_count = self.victim_count,
            suspects = self.suspects,
        )
    }
}
