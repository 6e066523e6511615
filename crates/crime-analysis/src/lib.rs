//! # crime-analysis
//!
//! Crime data, read-only query tools and the AI analysis service behind
//! SafePulse.
//!
//! ## How a request flows
//!
//! ```text
//! ┌──────────────┐   prompt    ┌─────────────┐  tool calls  ┌──────────────┐
//! │ Analysis     │ ──────────▶ │ Agent       │ ───────────▶ │ crime tools  │
//! │ Service      │ ◀────────── │ (agent-core)│ ◀─────────── │ (svckit)     │
//! └──────┬───────┘   outcome   └─────────────┘  plain text  └──────┬───────┘
//!        │                                                         │
//!        ▼                                                         ▼
//!  analysis records                                           CrimeStore
//!  chat sessions
//! ```
//!
//! The agent only reads crime data. Records, sessions and the `analyzed`
//! flag are written by [`AnalysisService`] once a run settles.

pub mod error;
pub mod model;
pub mod prompts;
pub mod records;
pub mod service;
pub mod store;
pub mod svckit;

pub use error::{AnalysisError, Result};
pub use model::{
    AnalysisRecord, AnalysisStatus, CaseNumber, CrimeCategory, CrimeReport, CrimeSeverity,
    CrimeStatus, Gender, Suspect, Witness,
};
pub use records::{AnalysisStore, MemoryAnalysisStore};
pub use service::{AnalysisService, ChatTurn};
pub use store::{CrimeFilter, CrimeStore, CrimeSummary, MemoryCrimeStore};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{CrimeQueryTool, CrimeToolKind, crime_tools};
}
