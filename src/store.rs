use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::types::{Null, ToSqlOutput};
use rusqlite::{Connection, ToSql, params, params_from_iter};

use crate::error::Result;
use crate::etl::{EntityKind, NaturalKey};
use crate::http_cache::app_cache_dir;
use crate::table::{Field, Table};

// Keeps id-list deletes under the SQLite bind-variable limit.
const ID_DELETE_CHUNK: usize = 500;

impl ToSql for Field {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Field::Text(s) => ToSqlOutput::from(s.as_str()),
            Field::Int(i) => ToSqlOutput::from(*i),
            Field::Real(f) => ToSqlOutput::from(*f),
            Field::Date(d) => ToSqlOutput::from(d.format("%Y-%m-%d").to_string()),
            Field::Null => ToSqlOutput::from(Null),
        })
    }
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join("atp_matches.sqlite"))
}

/// The persistent relational store. One connection per process; every
/// batch write runs inside its own transaction.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Store> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Store { conn })
    }

    pub fn open_in_memory() -> Result<Store> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Store { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Idempotently replace one batch's contribution: delete every
    /// persisted row matching the natural key, insert the transformed rows,
    /// commit. Any failure rolls the whole batch back, leaving the store in
    /// its pre-attempt state for that key.
    pub fn replace_batch(
        &mut self,
        kind: EntityKind,
        key: &NaturalKey,
        table: &Table,
    ) -> Result<usize> {
        let tx = self.conn.transaction()?;
        delete_batch(&tx, kind, key)?;
        let inserted = insert_rows(&tx, kind.table_name(), table)?;
        tx.commit()?;
        Ok(inserted)
    }

    pub fn begin_run(&self, entity: EntityKind, seasons_total: usize) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO ingest_runs(entity, started_at, finished_at, seasons_total, seasons_succeeded, rows_loaded, errors_json)
             VALUES (?1, ?2, NULL, ?3, 0, 0, '[]')",
            params![entity.table_name(), Utc::now().to_rfc3339(), seasons_total as i64],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn finish_run(
        &self,
        run_id: i64,
        seasons_succeeded: usize,
        rows_loaded: usize,
        errors: &[String],
    ) -> Result<()> {
        let errors_json = serde_json::to_string(errors).unwrap_or_else(|_| "[]".to_string());
        self.conn.execute(
            "UPDATE ingest_runs
             SET finished_at = ?1, seasons_succeeded = ?2, rows_loaded = ?3, errors_json = ?4
             WHERE run_id = ?5",
            params![
                Utc::now().to_rfc3339(),
                seasons_succeeded as i64,
                rows_loaded as i64,
                errors_json,
                run_id
            ],
        )?;
        Ok(())
    }

    pub fn row_count(&self, kind: EntityKind) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", kind.table_name());
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    pub fn tournament_ids(&self) -> Result<Vec<String>> {
        self.text_column("SELECT tourney_id FROM tournaments ORDER BY tourney_id")
    }

    pub fn player_ids(&self) -> Result<Vec<String>> {
        self.text_column("SELECT player_id FROM players ORDER BY player_id")
    }

    fn text_column(&self, sql: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS tournaments (
            tourney_id TEXT PRIMARY KEY,
            tourney_name TEXT,
            tourney_level TEXT,
            tourney_date TEXT,
            surface TEXT,
            draw_size INTEGER
        );
        CREATE TABLE IF NOT EXISTS players (
            player_id TEXT PRIMARY KEY,
            name TEXT,
            hand TEXT,
            height REAL,
            ioc TEXT,
            birth_year INTEGER
        );
        CREATE TABLE IF NOT EXISTS matches (
            season INTEGER NOT NULL,
            tourney_id TEXT NOT NULL,
            match_num INTEGER NOT NULL,
            winner_id TEXT NOT NULL,
            loser_id TEXT NOT NULL,
            score TEXT,
            best_of REAL,
            round TEXT,
            minutes REAL,
            winner_aces REAL,
            winner_double_faults REAL,
            winner_serve_points REAL,
            winner_first_serve_in REAL,
            winner_first_serve_won REAL,
            winner_second_serve_won REAL,
            winner_service_games REAL,
            winner_break_points_saved REAL,
            winner_break_points_faced REAL,
            loser_aces REAL,
            loser_double_faults REAL,
            loser_serve_points REAL,
            loser_first_serve_in REAL,
            loser_first_serve_won REAL,
            loser_second_serve_won REAL,
            loser_service_games REAL,
            loser_break_points_saved REAL,
            loser_break_points_faced REAL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_season ON matches(season);
        CREATE INDEX IF NOT EXISTS idx_matches_tourney ON matches(tourney_id);
        CREATE TABLE IF NOT EXISTS rankings (
            season INTEGER NOT NULL,
            tourney_id TEXT NOT NULL,
            player_id TEXT NOT NULL,
            rank INTEGER,
            points REAL
        );
        CREATE INDEX IF NOT EXISTS idx_rankings_season ON rankings(season);
        CREATE INDEX IF NOT EXISTS idx_rankings_player ON rankings(player_id);
        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            entity TEXT NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            seasons_total INTEGER NOT NULL,
            seasons_succeeded INTEGER NOT NULL,
            rows_loaded INTEGER NOT NULL,
            errors_json TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn delete_batch(tx: &rusqlite::Transaction<'_>, kind: EntityKind, key: &NaturalKey) -> Result<()> {
    match key {
        NaturalKey::Ids { column, values } => {
            for chunk in values.chunks(ID_DELETE_CHUNK) {
                let placeholders = vec!["?"; chunk.len()].join(",");
                let sql = format!(
                    "DELETE FROM {} WHERE {column} IN ({placeholders})",
                    kind.table_name()
                );
                tx.execute(&sql, params_from_iter(chunk.iter()))?;
            }
        }
        NaturalKey::Season(season) => {
            let sql = format!("DELETE FROM {} WHERE season = ?1", kind.table_name());
            tx.execute(&sql, params![season])?;
        }
    }
    Ok(())
}

fn insert_rows(tx: &rusqlite::Transaction<'_>, table_name: &str, table: &Table) -> Result<usize> {
    if table.is_empty() {
        return Ok(0);
    }
    let columns = table.columns().join(", ");
    let placeholders = (1..=table.columns().len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("INSERT INTO {table_name} ({columns}) VALUES ({placeholders})");
    let mut stmt = tx.prepare(&sql)?;
    let mut inserted = 0usize;
    for row in table.rows() {
        stmt.execute(params_from_iter(row.iter()))?;
        inserted += 1;
    }
    Ok(inserted)
}
