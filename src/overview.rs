//! Read-only view for downstream exploration: one join across the four
//! tables, keyed on tourney_id / player_id / season. The statistical work
//! itself lives outside this crate.

use rusqlite::params;

use crate::error::Result;
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct MatchOverviewRow {
    pub season: i64,
    pub tourney_name: Option<String>,
    pub surface: Option<String>,
    pub round: Option<String>,
    pub winner_name: Option<String>,
    pub loser_name: Option<String>,
    pub winner_rank: Option<i64>,
    pub loser_rank: Option<i64>,
    pub score: Option<String>,
    pub minutes: Option<f64>,
}

pub fn season_overview(store: &Store, season: i32) -> Result<Vec<MatchOverviewRow>> {
    let mut stmt = store.conn().prepare(
        r#"
        SELECT
            m.season, t.tourney_name, t.surface, m.round,
            w.name, l.name, rw.rank, rl.rank, m.score, m.minutes
        FROM matches m
        JOIN tournaments t ON t.tourney_id = m.tourney_id
        JOIN players w ON w.player_id = m.winner_id
        JOIN players l ON l.player_id = m.loser_id
        LEFT JOIN rankings rw
            ON rw.season = m.season
            AND rw.tourney_id = m.tourney_id
            AND rw.player_id = m.winner_id
        LEFT JOIN rankings rl
            ON rl.season = m.season
            AND rl.tourney_id = m.tourney_id
            AND rl.player_id = m.loser_id
        WHERE m.season = ?1
        ORDER BY m.tourney_id ASC, m.match_num ASC
        "#,
    )?;

    let rows = stmt.query_map(params![season], |row| {
        Ok(MatchOverviewRow {
            season: row.get(0)?,
            tourney_name: row.get(1)?,
            surface: row.get(2)?,
            round: row.get(3)?,
            winner_name: row.get(4)?,
            loser_name: row.get(5)?,
            winner_rank: row.get(6)?,
            loser_rank: row.get(7)?,
            score: row.get(8)?,
            minutes: row.get(9)?,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
