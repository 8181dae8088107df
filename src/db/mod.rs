use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub mod models;
pub use models::*;

use crate::model::{ConfidenceLevel, Factor, GameInput, PredictionResult, SideScores};

/// Append-only prediction history backed by SQLite.
///
/// A single connection behind a mutex: concurrent appends are serialized, so
/// no caller can lose another caller's write.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path. `:memory:`
    /// opens a private in-memory store.
    pub fn open(path: &str) -> Result<Self> {
        if path != ":memory:" {
            if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open prediction store at {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("prediction store mutex poisoned"))
    }

    // ── Writes ───────────────────────────────────────────────────────────────

    /// Append a prediction and the inputs behind it. Returns the new row id.
    pub fn insert_prediction(&self, result: &PredictionResult, input: &GameInput) -> Result<i64> {
        let input_json =
            serde_json::to_string(input).context("Failed to serialize game input")?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO predictions (
                created_at, home_team, away_team, home_probability, away_probability,
                predicted_winner, confidence, confidence_level, raw_home, raw_away, input_json
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
            params![
                result.timestamp,
                result.home_team,
                result.away_team,
                result.home_probability,
                result.away_probability,
                result.predicted_winner,
                result.confidence,
                result.confidence_level.label(),
                result.raw_scores.home,
                result.raw_scores.away,
                input_json,
            ],
        )?;
        let id = tx.last_insert_rowid();
        for (factor, scores) in &result.factor_breakdown {
            tx.execute(
                "INSERT INTO prediction_factors (prediction_id, factor, home, away)
                 VALUES (?1,?2,?3,?4)",
                params![id, factor.key(), scores.home, scores.away],
            )?;
        }
        tx.commit()?;
        Ok(id)
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    /// Every stored prediction, oldest first
    pub fn all_predictions(&self) -> Result<Vec<PredictionResult>> {
        self.list_predictions(-1)
    }

    /// The most recent `limit` predictions, oldest first. A negative limit
    /// returns the whole history.
    pub fn list_predictions(&self, limit: i64) -> Result<Vec<PredictionResult>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM (
                SELECT {PREDICTION_COLUMNS} FROM predictions ORDER BY id DESC LIMIT ?1
             ) ORDER BY id ASC"
        ))?;
        let rows = stmt
            .query_map(params![limit], map_prediction_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter()
            .map(|row| -> Result<PredictionResult> {
                let factors = load_factors(&conn, row.id)?;
                Ok(row.into_result(factors))
            })
            .collect()
    }

    /// The last prediction appended, if any
    pub fn latest_prediction(&self) -> Result<Option<PredictionResult>> {
        Ok(self.latest_entry()?.map(|entry| entry.result))
    }

    /// The last prediction appended, with its inputs
    pub fn latest_entry(&self) -> Result<Option<StoredPrediction>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {PREDICTION_COLUMNS} FROM predictions ORDER BY id DESC LIMIT 1"
                ),
                [],
                map_prediction_row,
            )
            .optional()?;
        let Some(row) = row else {
            return Ok(None);
        };
        let input: GameInput = serde_json::from_str(&row.input_json)
            .with_context(|| format!("Stored input for prediction {} is corrupt", row.id))?;
        let id = row.id;
        let result = row.into_result(load_factors(&conn, id)?);
        Ok(Some(StoredPrediction { id, result, input }))
    }

    // ── Stats ────────────────────────────────────────────────────────────────

    /// Aggregate statistics over the full history
    pub fn get_stats(&self) -> Result<PredictionStats> {
        let conn = self.lock()?;
        let stats = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(AVG(confidence), 0.0),
                    COALESCE(SUM(CASE WHEN confidence >= 15.0 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN confidence < 5.0 THEN 1 ELSE 0 END), 0)
             FROM predictions",
            [],
            |r| {
                Ok(PredictionStats {
                    total_predictions: r.get(0)?,
                    average_confidence: r.get(1)?,
                    high_confidence_picks: r.get(2)?,
                    toss_ups: r.get(3)?,
                })
            },
        )?;
        Ok(stats)
    }
}

// ── SQL helpers ──────────────────────────────────────────────────────────────

const PREDICTION_COLUMNS: &str = "id, created_at, home_team, away_team, home_probability, \
     away_probability, predicted_winner, confidence, confidence_level, raw_home, raw_away, \
     input_json";

/// A `predictions` row before its factor rows are attached
struct PredictionRow {
    id: i64,
    result: PredictionResult,
    input_json: String,
}

impl PredictionRow {
    fn into_result(self, factor_breakdown: BTreeMap<Factor, SideScores>) -> PredictionResult {
        PredictionResult {
            factor_breakdown,
            ..self.result
        }
    }
}

fn map_prediction_row(row: &rusqlite::Row) -> rusqlite::Result<PredictionRow> {
    let level: String = row.get(8)?;
    Ok(PredictionRow {
        id: row.get(0)?,
        result: PredictionResult {
            timestamp: row.get(1)?,
            home_team: row.get(2)?,
            away_team: row.get(3)?,
            home_probability: row.get(4)?,
            away_probability: row.get(5)?,
            predicted_winner: row.get(6)?,
            confidence: row.get(7)?,
            confidence_level: parse_level(8, &level)?,
            factor_breakdown: BTreeMap::new(),
            raw_scores: SideScores::new(row.get(9)?, row.get(10)?),
        },
        input_json: row.get(11)?,
    })
}

fn parse_level(idx: usize, label: &str) -> rusqlite::Result<ConfidenceLevel> {
    ConfidenceLevel::from_label(label).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown confidence level '{}'", label).into(),
        )
    })
}

fn load_factors(conn: &Connection, prediction_id: i64) -> Result<BTreeMap<Factor, SideScores>> {
    let mut stmt = conn.prepare_cached(
        "SELECT factor, home, away FROM prediction_factors WHERE prediction_id = ?1",
    )?;
    let rows = stmt
        .query_map(params![prediction_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                SideScores::new(row.get(1)?, row.get(2)?),
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut factors = BTreeMap::new();
    for (key, scores) in rows {
        let factor = Factor::from_key(&key)
            .ok_or_else(|| anyhow!("prediction {} has unknown factor '{}'", prediction_id, key))?;
        factors.insert(factor, scores);
    }
    Ok(factors)
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS predictions (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at       TEXT    NOT NULL,
    home_team        TEXT    NOT NULL,
    away_team        TEXT    NOT NULL,
    home_probability REAL    NOT NULL,
    away_probability REAL    NOT NULL,
    predicted_winner TEXT    NOT NULL,
    confidence       REAL    NOT NULL,
    confidence_level TEXT    NOT NULL,
    raw_home         REAL    NOT NULL,
    raw_away         REAL    NOT NULL,
    input_json       TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS prediction_factors (
    prediction_id INTEGER NOT NULL,
    factor        TEXT    NOT NULL,
    home          REAL    NOT NULL,
    away          REAL    NOT NULL,
    PRIMARY KEY (prediction_id, factor),
    FOREIGN KEY (prediction_id) REFERENCES predictions(id)
);

CREATE INDEX IF NOT EXISTS idx_predictions_confidence ON predictions(confidence);
"#;
