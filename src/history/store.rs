use std::path::Path;

use chrono::SecondsFormat;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::types::{AnalysisRecord, AnalysisSummary};
use crate::analyzer::AnalysisResult;

/// SQLite store of past analyses.
/// All operations are synchronous (rusqlite is blocking).
/// Callers in async contexts should use `tokio::task::spawn_blocking`.
pub struct AnalysisHistory {
    conn: Connection,
}

const RECORD_COLUMNS: &str = "id, log_path, created_at, applied, result_json";

impl AnalysisHistory {
    /// Create or open the history database at `db_path`.
    pub fn new(db_path: &Path) -> Result<Self, String> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create data dir: {}", e))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| format!("Failed to open history db: {}", e))?;
        Self::init(&conn)?;
        info!("Opened analysis history database at {:?}", db_path);
        Ok(Self { conn })
    }

    fn init(conn: &Connection) -> Result<(), String> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS analyses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                log_path TEXT NOT NULL,
                created_at TEXT NOT NULL,
                status TEXT NOT NULL,
                score INTEGER NOT NULL,
                result_json TEXT NOT NULL,
                applied INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )
        .map_err(|e| format!("Failed to create table: {}", e))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_analyses_created ON analyses(created_at DESC)",
            [],
        )
        .map_err(|e| format!("Failed to create date index: {}", e))?;
        Ok(())
    }

    /// Record a finished analysis. Returns the row ID.
    pub fn record_analysis(&self, log_path: &str, result: &AnalysisResult) -> Result<i64, String> {
        let result_json = serde_json::to_string(result)
            .map_err(|e| format!("Failed to serialize analysis: {}", e))?;

        self.conn
            .execute(
                "INSERT INTO analyses (log_path, created_at, status, score, result_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    log_path,
                    result
                        .created_at
                        .to_rfc3339_opts(SecondsFormat::Micros, true),
                    result.status.label(),
                    result.score,
                    result_json
                ],
            )
            .map_err(|e| format!("Failed to insert analysis: {}", e))?;

        let id = self.conn.last_insert_rowid();
        info!("Recorded analysis {} for log: {}", id, log_path);
        Ok(id)
    }

    /// Flag an analysis whose recommendations were applied.
    pub fn mark_applied(&self, id: i64) -> Result<(), String> {
        let updated = self
            .conn
            .execute("UPDATE analyses SET applied = 1 WHERE id = ?1", params![id])
            .map_err(|e| format!("Failed to update analysis: {}", e))?;
        if updated == 0 {
            return Err(format!("Analysis {} not found", id));
        }
        info!("Marked analysis {} as applied", id);
        Ok(())
    }

    /// Most recent analyses first, at most `limit` rows.
    pub fn list(&self, limit: usize) -> Result<Vec<AnalysisSummary>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, log_path, created_at, status, score, applied
             FROM analyses
             ORDER BY created_at DESC, id DESC
             LIMIT ?1",
            )
            .map_err(|e| format!("Failed to prepare query: {}", e))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(AnalysisSummary {
                    id: row.get(0)?,
                    log_path: row.get(1)?,
                    created_at: row.get(2)?,
                    status: row.get(3)?,
                    score: row.get(4)?,
                    applied: row.get(5)?,
                })
            })
            .map_err(|e| format!("Failed to query analyses: {}", e))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("Failed to collect analyses: {}", e))
    }

    pub fn count(&self) -> Result<usize, String> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM analyses", [], |row| row.get(0))
            .map_err(|e| format!("Failed to count analyses: {}", e))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub fn get(&self, id: i64) -> Result<AnalysisRecord, String> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {} FROM analyses WHERE id = ?1", RECORD_COLUMNS),
                params![id],
                read_raw_record,
            )
            .optional()
            .map_err(|e| format!("Failed to query analysis: {}", e))?
            .ok_or_else(|| format!("Analysis {} not found", id))?;
        raw.into_record()
    }

    /// The newest analysis, if any has been recorded.
    pub fn latest(&self) -> Result<Option<AnalysisRecord>, String> {
        let raw = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM analyses ORDER BY created_at DESC, id DESC LIMIT 1",
                    RECORD_COLUMNS
                ),
                [],
                read_raw_record,
            )
            .optional()
            .map_err(|e| format!("Failed to query latest analysis: {}", e))?;
        raw.map(RawRecord::into_record).transpose()
    }
}

struct RawRecord {
    id: i64,
    log_path: String,
    created_at: String,
    applied: bool,
    result_json: String,
}

fn read_raw_record(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        id: row.get(0)?,
        log_path: row.get(1)?,
        created_at: row.get(2)?,
        applied: row.get(3)?,
        result_json: row.get(4)?,
    })
}

impl RawRecord {
    fn into_record(self) -> Result<AnalysisRecord, String> {
        let result = serde_json::from_str(&self.result_json)
            .map_err(|e| format!("Stored analysis {} is corrupt: {}", self.id, e))?;
        Ok(AnalysisRecord {
            id: self.id,
            log_path: self.log_path,
            created_at: self.created_at,
            applied: self.applied,
            result,
        })
    }
}
