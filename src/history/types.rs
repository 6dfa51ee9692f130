use serde::Serialize;

use crate::analyzer::{AnalysisResult, AnalysisStatus};

/// One row of the history list.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub id: i64,
    pub log_path: String,
    pub created_at: String,
    pub status: String,
    pub score: u32,
    pub applied: bool,
}

/// A stored analysis with its full result.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub log_path: String,
    pub created_at: String,
    pub applied: bool,
    pub result: AnalysisResult,
}

impl AnalysisSummary {
    pub fn is_error(&self) -> bool {
        self.status == AnalysisStatus::Error.label()
    }
}
