use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use std::path::Path;

use crate::error::Result;
use crate::pipeline::RunSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Complete,
    /// The pipeline ran but its record could not be persisted.
    Incomplete,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Complete => write!(f, "complete"),
            RunStatus::Incomplete => write!(f, "incomplete"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

impl RunStatus {
    fn parse(s: &str) -> Self {
        match s {
            "complete" => RunStatus::Complete,
            "incomplete" => RunStatus::Incomplete,
            _ => RunStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub run_date: NaiveDate,
    pub category: String,
    pub status: RunStatus,
    pub total: usize,
    pub judged: usize,
    pub relevant: usize,
    pub extracted: usize,
    pub analyzed: usize,
    pub finished_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl RunRecord {
    pub fn from_summary(run_date: NaiveDate, summary: &RunSummary) -> Self {
        Self {
            run_date,
            category: summary.category.clone(),
            status: if summary.persisted {
                RunStatus::Complete
            } else {
                RunStatus::Incomplete
            },
            total: summary.total,
            judged: summary.judged,
            relevant: summary.relevant,
            extracted: summary.extracted,
            analyzed: summary.analyzed,
            finished_at: Utc::now(),
            error: None,
        }
    }

    pub fn failed(run_date: NaiveDate, category: &str, error: String) -> Self {
        Self {
            run_date,
            category: category.to_string(),
            status: RunStatus::Failed,
            total: 0,
            judged: 0,
            relevant: 0,
            extracted: 0,
            analyzed: 0,
            finished_at: Utc::now(),
            error: Some(error),
        }
    }
}

/// SQLite log of category runs, one row per (run date, category).
pub struct RunLedger {
    conn: Connection,
}

impl RunLedger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let ledger = Self { conn };
        ledger.init_db()?;
        Ok(ledger)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let ledger = Self { conn };
        ledger.init_db()?;
        Ok(ledger)
    }

    fn init_db(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY,
                run_date TEXT NOT NULL,
                category TEXT NOT NULL,
                status TEXT NOT NULL,
                total INTEGER NOT NULL,
                judged INTEGER NOT NULL,
                relevant INTEGER NOT NULL,
                extracted INTEGER NOT NULL,
                analyzed INTEGER NOT NULL,
                finished_at TEXT NOT NULL,
                error TEXT,
                UNIQUE(run_date, category)
            );

            CREATE INDEX IF NOT EXISTS idx_runs_run_date ON runs(run_date);
            "#,
        )?;

        Ok(())
    }

    pub fn record(&self, run: &RunRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO runs (run_date, category, status, total, judged, relevant, extracted, analyzed, finished_at, error)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(run_date, category) DO UPDATE SET
                status = excluded.status,
                total = excluded.total,
                judged = excluded.judged,
                relevant = excluded.relevant,
                extracted = excluded.extracted,
                analyzed = excluded.analyzed,
                finished_at = excluded.finished_at,
                error = excluded.error
            "#,
            params![
                run.run_date.format("%Y-%m-%d").to_string(),
                run.category,
                run.status.to_string(),
                run.total as i64,
                run.judged as i64,
                run.relevant as i64,
                run.extracted as i64,
                run.analyzed as i64,
                run.finished_at.to_rfc3339(),
                run.error,
            ],
        )?;

        Ok(())
    }

    pub fn list(&self, run_date: NaiveDate) -> Result<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT category, status, total, judged, relevant, extracted, analyzed, finished_at, error
            FROM runs
            WHERE run_date = ?1
            ORDER BY category
            "#,
        )?;

        let runs = stmt.query_map(params![run_date.format("%Y-%m-%d").to_string()], |row| {
            let status: String = row.get(1)?;
            let finished_at: String = row.get(7)?;
            Ok(RunRecord {
                run_date,
                category: row.get(0)?,
                status: RunStatus::parse(&status),
                total: row.get::<_, i64>(2)? as usize,
                judged: row.get::<_, i64>(3)? as usize,
                relevant: row.get::<_, i64>(4)? as usize,
                extracted: row.get::<_, i64>(5)? as usize,
                analyzed: row.get::<_, i64>(6)? as usize,
                finished_at: DateTime::parse_from_rfc3339(&finished_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
                error: row.get(8)?,
            })
        })?;

        runs.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 25).unwrap()
    }

    fn summary(category: &str, persisted: bool) -> RunSummary {
        RunSummary {
            category: category.to_string(),
            total: 10,
            judged: 8,
            relevant: 3,
            extracted: 2,
            analyzed: 2,
            persisted,
            ..Default::default()
        }
    }

    #[test]
    fn test_record_and_list() {
        let ledger = RunLedger::in_memory().unwrap();
        ledger.record(&RunRecord::from_summary(date(), &summary("cs.OS", true))).unwrap();
        ledger.record(&RunRecord::from_summary(date(), &summary("cs.AI", false))).unwrap();
        ledger
            .record(&RunRecord::failed(date(), "cs.CL", "HTTP 503".to_string()))
            .unwrap();

        let runs = ledger.list(date()).unwrap();
        let statuses: Vec<_> = runs.iter().map(|r| (r.category.as_str(), r.status)).collect();
        assert_eq!(
            statuses,
            vec![
                ("cs.AI", RunStatus::Incomplete),
                ("cs.CL", RunStatus::Failed),
                ("cs.OS", RunStatus::Complete),
            ]
        );
        assert_eq!(runs[1].error.as_deref(), Some("HTTP 503"));
        assert_eq!(runs[2].judged, 8);
    }

    #[test]
    fn test_rerun_overwrites_row() {
        let ledger = RunLedger::in_memory().unwrap();
        ledger
            .record(&RunRecord::failed(date(), "cs.AI", "timeout".to_string()))
            .unwrap();
        ledger.record(&RunRecord::from_summary(date(), &summary("cs.AI", true))).unwrap();

        let runs = ledger.list(date()).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Complete);
        assert_eq!(runs[0].error, None);

        let other_day = NaiveDate::from_ymd_opt(2025, 11, 26).unwrap();
        assert!(ledger.list(other_day).unwrap().is_empty());
    }
}
