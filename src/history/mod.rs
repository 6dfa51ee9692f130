pub mod store;
pub mod types;

pub use store::AnalysisHistory;
pub use types::{AnalysisRecord, AnalysisSummary};
