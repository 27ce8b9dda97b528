use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, params};
use sha2::{Digest, Sha256};

use crate::enrich::EnrichedMatch;
use crate::table::DATE_FORMAT;

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create archive dir {}", parent.display()))?;
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            match_key TEXT PRIMARY KEY,
            career_match_index INTEGER NOT NULL,
            season TEXT NOT NULL,
            date TEXT NOT NULL,
            opponent TEXT NOT NULL,
            opponent_slug TEXT NOT NULL,
            match_type TEXT NOT NULL,
            result TEXT NULL,
            set_result TEXT NULL,
            did_play INTEGER NOT NULL,
            sets_played INTEGER NULL,
            win_streak INTEGER NOT NULL,
            loss_streak INTEGER NOT NULL,
            performance_score REAL NULL,
            performance_percentile REAL NULL,
            season_highs_flags TEXT NOT NULL,
            career_highs_flags TEXT NOT NULL,
            clutch_performance INTEGER NOT NULL,
            highlight_match INTEGER NOT NULL,
            record_json TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_season ON matches(season);
        CREATE INDEX IF NOT EXISTS idx_matches_date ON matches(date);

        CREATE TABLE IF NOT EXISTS pipeline_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            matches INTEGER NOT NULL,
            validation_passed INTEGER NOT NULL,
            enriched_sha256 TEXT NOT NULL,
            diagnostics_json TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Hex SHA-256 of a file's bytes.
pub fn file_sha256(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

#[derive(Debug, Clone)]
pub struct ArchiveRun<'a> {
    pub started_at: String,
    pub validation_passed: bool,
    pub enriched_csv: &'a Path,
    pub diagnostics: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub run_id: i64,
    pub matches: usize,
    pub enriched_sha256: String,
}

/// Replace the archived matches in one transaction and log the run.
pub fn archive_run(
    conn: &mut Connection,
    rows: &[EnrichedMatch],
    columns: &[String],
    run: &ArchiveRun<'_>,
) -> Result<ArchiveSummary> {
    let sha = file_sha256(run.enriched_csv)?;
    let diagnostics_json =
        serde_json::to_string(run.diagnostics).context("encode run diagnostics")?;
    conn.execute(
        "INSERT INTO pipeline_runs(started_at, finished_at, matches, validation_passed, enriched_sha256, diagnostics_json)
         VALUES (?1, NULL, ?2, ?3, ?4, ?5)",
        params![
            run.started_at,
            rows.len() as i64,
            run.validation_passed as i64,
            sha,
            diagnostics_json
        ],
    )
    .context("insert pipeline run")?;
    let run_id = conn.last_insert_rowid();

    let tx = conn.transaction().context("begin archive transaction")?;
    tx.execute("DELETE FROM matches", [])
        .context("clear archived matches")?;
    for row in rows {
        insert_match(&tx, row, columns)?;
    }
    tx.commit().context("commit archive transaction")?;

    conn.execute(
        "UPDATE pipeline_runs SET finished_at = ?1 WHERE run_id = ?2",
        params![Utc::now().to_rfc3339(), run_id],
    )
    .context("update pipeline run")?;

    Ok(ArchiveSummary {
        run_id,
        matches: rows.len(),
        enriched_sha256: sha,
    })
}

fn insert_match(tx: &rusqlite::Transaction<'_>, m: &EnrichedMatch, columns: &[String]) -> Result<()> {
    let s = &m.merged.schedule;
    let record: serde_json::Map<String, serde_json::Value> = columns
        .iter()
        .cloned()
        .zip(m.to_record().into_iter().map(serde_json::Value::String))
        .collect();
    let record_json = serde_json::to_string(&record).context("encode match record")?;
    tx.execute(
        r#"
        INSERT INTO matches (
            match_key, career_match_index, season, date, opponent, opponent_slug,
            match_type, result, set_result, did_play, sets_played,
            win_streak, loss_streak, performance_score, performance_percentile,
            season_highs_flags, career_highs_flags, clutch_performance, highlight_match,
            record_json
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6,
            ?7, ?8, ?9, ?10, ?11,
            ?12, ?13, ?14, ?15,
            ?16, ?17, ?18, ?19,
            ?20
        )
        "#,
        params![
            s.match_key,
            s.career_match_index as i64,
            s.season.code(),
            s.date.format(DATE_FORMAT).to_string(),
            s.opponent,
            s.opponent_slug,
            s.match_type.name(),
            s.result.map(|r| r.code()),
            s.set_result.map(|t| t.to_string()),
            s.did_play as i64,
            m.merged.sets_played.map(i64::from),
            m.streak.wins as i64,
            m.streak.losses as i64,
            m.performance.score,
            m.percentile,
            m.highs.season_label(),
            m.highs.career_label(),
            m.flags.clutch_performance as i64,
            m.flags.highlight_match as i64,
            record_json
        ],
    )
    .with_context(|| format!("insert match {}", s.match_key))?;
    Ok(())
}

/// Number of runs logged so far.
pub fn run_count(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM pipeline_runs", [], |row| row.get(0))
        .context("count pipeline runs")
}

pub fn archived_keys(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT match_key FROM matches ORDER BY career_match_index")
        .context("prepare archived keys")?;
    let keys = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query archived keys")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("read archived keys")?;
    Ok(keys)
}
