//! Ingestion metrics, persisted in a local SQLite database.

use std::path::Path;

use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ingest_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    duration_ms INTEGER NOT NULL,
    success INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ingest_log_timestamp ON ingest_log(timestamp);
"#;

pub struct MetricsStore {
    conn: Connection,
}

impl MetricsStore {
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Record one completed file. Called once per file, never per batch or
    /// chunk.
    pub fn record(&self, duration_ms: u64, success: bool) {
        let _ = self.conn.execute(
            "INSERT INTO ingest_log (timestamp, duration_ms, success)
             VALUES (datetime('now'), ?1, ?2)",
            params![duration_ms as i64, success as i32],
        );
    }

    pub fn get_summary(&self, retention_days: u32) -> MetricsSummary {
        let query = format!(
            r#"
            SELECT
                COUNT(*) as files_processed,
                COALESCE(AVG(duration_ms), 0) as avg_duration_ms,
                COALESCE(SUM(CASE WHEN success = 0 THEN 1 ELSE 0 END) * 100.0 / NULLIF(COUNT(*), 0), 0) as error_rate
            FROM ingest_log
            WHERE timestamp >= datetime('now', '-{} days')
            "#,
            retention_days
        );

        self.conn
            .query_row(&query, [], |row| {
                Ok(MetricsSummary {
                    files_processed: row.get::<_, i64>(0)? as u64,
                    avg_duration_ms: row.get::<_, f64>(1)? as u64,
                    error_rate: row.get::<_, f64>(2)? as f32,
                })
            })
            .unwrap_or_default()
    }

    pub fn cleanup(&self, retention_days: u32) {
        let query = format!(
            "DELETE FROM ingest_log WHERE timestamp < datetime('now', '-{} days')",
            retention_days
        );
        let _ = self.conn.execute(&query, []);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub files_processed: u64,
    pub avg_duration_ms: u64,
    pub error_rate: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetricsStore::open(&dir.path().join("metrics.db")).unwrap();

        store.record(120, true);
        store.record(80, true);
        store.record(500, false);

        let summary = store.get_summary(7);
        assert_eq!(summary.files_processed, 3);
        assert!(summary.error_rate > 0.0);

        store.cleanup(7);
        assert_eq!(store.get_summary(7).files_processed, 3);
    }
}
