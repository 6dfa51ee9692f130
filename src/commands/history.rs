//! History commands: listing and inspecting past analyses.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::info;

use crate::error::AnalyzerError;
use crate::history::{AnalysisHistory, AnalysisRecord, AnalysisSummary};
use crate::settings::AppPaths;

/// Which stored analysis a command operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordSelector {
    #[default]
    Latest,
    Id(i64),
}

impl FromStr for RecordSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("latest") {
            return Ok(RecordSelector::Latest);
        }
        s.parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .map(RecordSelector::Id)
            .ok_or_else(|| format!("expected an analysis ID or 'latest', got '{}'", s))
    }
}

/// Run `f` against the history database on the blocking pool.
pub(crate) async fn with_history<T, F>(db_path: PathBuf, f: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce(&AnalysisHistory) -> Result<T, String> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let history = AnalysisHistory::new(&db_path).map_err(AnalyzerError::History)?;
        f(&history).map_err(|e| AnalyzerError::History(e).into())
    })
    .await
    .map_err(|e| AnalyzerError::History(format!("task failed: {}", e)))?
}

/// Fetch one analysis by ID, or the newest one.
pub async fn load_record(
    paths: &AppPaths,
    selector: RecordSelector,
) -> Result<AnalysisRecord, String> {
    with_history(paths.history_db(), move |history| match selector {
        RecordSelector::Id(id) => history.get(id),
        RecordSelector::Latest => history
            .latest()?
            .ok_or_else(|| "No analysis recorded yet. Run `analyze` first.".to_string()),
    })
    .await
}

/// List recent analyses, newest first.
pub async fn list_history(paths: &AppPaths, limit: usize) -> Result<Vec<AnalysisSummary>, String> {
    let rows = with_history(paths.history_db(), move |history| history.list(limit)).await?;
    info!("Listed {} analyses", rows.len());
    Ok(rows)
}

pub async fn show_history(paths: &AppPaths, id: i64) -> Result<AnalysisRecord, String> {
    let record = load_record(paths, RecordSelector::Id(id)).await?;
    info!("Retrieved analysis {}", id);
    Ok(record)
}

/// Render history rows as an aligned table.
pub fn format_history_table(rows: &[AnalysisSummary]) -> String {
    if rows.is_empty() {
        return "No analyses recorded.".to_string();
    }
    let mut out = format!(
        "{:>5}  {:<32}  {:<11}  {:>5}  {:<7}  {}\n",
        "ID", "CREATED", "STATUS", "SCORE", "APPLIED", "LOG"
    );
    for row in rows {
        out.push_str(&format!(
            "{:>5}  {:<32}  {:<11}  {:>5}  {:<7}  {}\n",
            row.id,
            row.created_at,
            row.status,
            row.score,
            if row.applied { "yes" } else { "no" },
            row.log_path
        ));
    }
    out
}
