use std::path::Path;

use rusqlite::Connection;

use crate::error::PersistenceError;
use crate::item::{ItemKind, QuizItem};
use crate::pipeline::PersistenceSink;

pub fn connect(path: &Path) -> Result<Connection, PersistenceError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        // A missing directory surfaces as an open error below.
        let _ = std::fs::create_dir_all(dir);
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<(), PersistenceError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS questions (
            id          INTEGER PRIMARY KEY,
            run_id      TEXT NOT NULL,
            source      TEXT NOT NULL,
            kind        TEXT NOT NULL CHECK(kind IN ('multiple_choice','true_false','fill_blank')),
            content     TEXT NOT NULL,
            answer      TEXT NOT NULL,
            difficulty  TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_questions_kind ON questions(kind);
        CREATE INDEX IF NOT EXISTS idx_questions_run ON questions(run_id);
        ",
    )?;
    Ok(())
}

pub fn new_run_id() -> String {
    format!("run-{}", chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f"))
}

// ── Sink ──

/// Writes one run's items in a single transaction.
pub struct SqliteSink<'c> {
    conn: &'c Connection,
    run_id: String,
    source: String,
    difficulty: String,
}

impl<'c> SqliteSink<'c> {
    pub fn new(conn: &'c Connection, source: impl Into<String>, difficulty: impl Into<String>) -> Self {
        Self {
            conn,
            run_id: new_run_id(),
            source: source.into(),
            difficulty: difficulty.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl PersistenceSink for SqliteSink<'_> {
    fn store(&mut self, items: &[QuizItem]) -> Result<(), PersistenceError> {
        let created_at = chrono::Utc::now().to_rfc3339();
        // Dropped without commit on any error, which rolls back the whole batch.
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO questions (run_id, source, kind, content, answer, difficulty, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for item in items {
                stmt.execute(rusqlite::params![
                    self.run_id,
                    self.source,
                    item.kind.as_str(),
                    item.content,
                    item.answer,
                    self.difficulty,
                    created_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

// ── Queries ──

pub struct QuestionRow {
    pub id: i64,
    pub run_id: String,
    pub source: String,
    pub kind: String,
    pub content: String,
    pub answer: String,
    pub difficulty: String,
    pub created_at: String,
}

pub fn fetch_questions(
    conn: &Connection,
    kind: Option<ItemKind>,
    limit: usize,
) -> Result<Vec<QuestionRow>, PersistenceError> {
    let mut stmt = conn.prepare(
        "SELECT id, run_id, source, kind, content, answer, difficulty, created_at
         FROM questions
         WHERE (?1 IS NULL OR kind = ?1)
         ORDER BY id
         LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![kind.map(ItemKind::as_str), limit as i64], |row| {
            Ok(QuestionRow {
                id: row.get(0)?,
                run_id: row.get(1)?,
                source: row.get(2)?,
                kind: row.get(3)?,
                content: row.get(4)?,
                answer: row.get(5)?,
                difficulty: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub struct Stats {
    pub total: i64,
    pub runs: i64,
    pub multiple_choice: i64,
    pub true_false: i64,
    pub fill_blank: i64,
}

pub fn get_stats(conn: &Connection) -> Result<Stats, PersistenceError> {
    let stats = conn.query_row(
        "SELECT
            COUNT(*),
            COUNT(DISTINCT run_id),
            COALESCE(SUM(kind = 'multiple_choice'), 0),
            COALESCE(SUM(kind = 'true_false'), 0),
            COALESCE(SUM(kind = 'fill_blank'), 0)
         FROM questions",
        [],
        |row| {
            Ok(Stats {
                total: row.get(0)?,
                runs: row.get(1)?,
                multiple_choice: row.get(2)?,
                true_false: row.get(3)?,
                fill_blank: row.get(4)?,
            })
        },
    )?;
    Ok(stats)
}
