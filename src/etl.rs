//! The four entity pipelines. Each one projects its columns out of a raw
//! season table, normalizes them, and replaces its batch in the store.

use std::collections::HashMap;

use crate::error::{EtlError, Result};
use crate::schema::{
    MATCH_COLUMNS, PLAYER_LOSER_COLUMNS, PLAYER_WINNER_COLUMNS, RANKING_LOSER_COLUMNS,
    RANKING_WINNER_COLUMNS, TOURNAMENT_COLUMNS, match_column_name, player_column_name,
    ranking_column_name,
};
use crate::store::Store;
use crate::table::{Field, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Tournaments,
    Players,
    Rankings,
    Matches,
}

impl EntityKind {
    /// Dimension tables load before the fact tables that reference them.
    pub const LOAD_ORDER: [EntityKind; 4] = [
        EntityKind::Tournaments,
        EntityKind::Players,
        EntityKind::Rankings,
        EntityKind::Matches,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            EntityKind::Tournaments => "tournaments",
            EntityKind::Players => "players",
            EntityKind::Rankings => "rankings",
            EntityKind::Matches => "matches",
        }
    }
}

/// The column values identifying one batch's rows for delete-then-insert.
#[derive(Debug, Clone)]
pub enum NaturalKey {
    Ids {
        column: &'static str,
        values: Vec<String>,
    },
    Season(i32),
}

/// One entity's extract/transform/load contract. `load` replaces the
/// batch's prior rows wholesale inside a single store transaction.
pub trait EntityEtl {
    fn kind(&self) -> EntityKind;

    fn extract(&self, raw: &Table) -> Result<Table>;

    fn transform(&self, extracted: Table, season: i32) -> Result<Table>;

    fn natural_key(&self, transformed: &Table, season: i32) -> Result<NaturalKey>;

    fn load(&self, store: &mut Store, transformed: &Table, season: i32) -> Result<usize> {
        let key = self.natural_key(transformed, season)?;
        store.replace_batch(self.kind(), &key, transformed)
    }
}

pub struct Tournaments;

impl EntityEtl for Tournaments {
    fn kind(&self) -> EntityKind {
        EntityKind::Tournaments
    }

    fn extract(&self, raw: &Table) -> Result<Table> {
        raw.select(TOURNAMENT_COLUMNS)
    }

    fn transform(&self, mut extracted: Table, _season: i32) -> Result<Table> {
        extracted.map_column_with_row("draw_size", |_, cell| real_to_int(cell))?;
        Ok(extracted.dedup())
    }

    fn natural_key(&self, transformed: &Table, _season: i32) -> Result<NaturalKey> {
        Ok(NaturalKey::Ids {
            column: "tourney_id",
            values: transformed.distinct_text("tourney_id")?,
        })
    }
}

pub struct Players;

impl EntityEtl for Players {
    fn kind(&self) -> EntityKind {
        EntityKind::Players
    }

    fn extract(&self, raw: &Table) -> Result<Table> {
        let winners = raw
            .select(PLAYER_WINNER_COLUMNS)?
            .rename_columns(player_column_name)?;
        let losers = raw
            .select(PLAYER_LOSER_COLUMNS)?
            .rename_columns(player_column_name)?;
        winners.stack(losers)
    }

    /// `birth_year = season − round(age)`. Age reporting drifts by a few
    /// tenths between matches, so conflicting derived years for one player
    /// id reconcile to that id's most frequent value before dedup collapses
    /// the now-identical rows. A player with no reported age keeps a null
    /// birth year.
    fn transform(&self, mut extracted: Table, season: i32) -> Result<Table> {
        let id_idx = extracted
            .column_index("player_id")
            .ok_or_else(|| EtlError::schema("player table lost `player_id`"))?;

        let mut observed: HashMap<String, HashMap<i64, usize>> = HashMap::new();
        let age_idx = extracted
            .column_index("age")
            .ok_or_else(|| EtlError::schema("player table lost `age`"))?;
        for row in extracted.rows() {
            let Some(id) = row[id_idx].as_text() else {
                continue;
            };
            let Some(age) = row[age_idx].as_real() else {
                continue;
            };
            let year = i64::from(season) - age.round() as i64;
            *observed
                .entry(id.to_string())
                .or_default()
                .entry(year)
                .or_insert(0) += 1;
        }
        let modes: HashMap<String, i64> = observed
            .into_iter()
            .map(|(id, years)| (id, mode_year(&years)))
            .collect();

        extracted.map_column_with_row("age", |row, _| {
            match row[id_idx].as_text().and_then(|id| modes.get(id)) {
                Some(year) => Field::Int(*year),
                None => Field::Null,
            }
        })?;
        extracted.set_column_name("age", "birth_year")?;
        Ok(extracted.dedup())
    }

    fn natural_key(&self, transformed: &Table, _season: i32) -> Result<NaturalKey> {
        Ok(NaturalKey::Ids {
            column: "player_id",
            values: transformed.distinct_text("player_id")?,
        })
    }
}

pub struct Matches;

impl EntityEtl for Matches {
    fn kind(&self) -> EntityKind {
        EntityKind::Matches
    }

    fn extract(&self, raw: &Table) -> Result<Table> {
        raw.select(MATCH_COLUMNS)?.rename_columns(match_column_name)
    }

    fn transform(&self, extracted: Table, season: i32) -> Result<Table> {
        let mut table = extracted.dedup();
        table.insert_lead_column("season", Field::Int(i64::from(season)));
        Ok(table)
    }

    fn natural_key(&self, _transformed: &Table, season: i32) -> Result<NaturalKey> {
        Ok(NaturalKey::Season(season))
    }
}

pub struct Rankings;

impl EntityEtl for Rankings {
    fn kind(&self) -> EntityKind {
        EntityKind::Rankings
    }

    fn extract(&self, raw: &Table) -> Result<Table> {
        let winners = raw
            .select(RANKING_WINNER_COLUMNS)?
            .rename_columns(ranking_column_name)?;
        let losers = raw
            .select(RANKING_LOSER_COLUMNS)?
            .rename_columns(ranking_column_name)?;
        winners.stack(losers)
    }

    fn transform(&self, mut extracted: Table, season: i32) -> Result<Table> {
        extracted.map_column_with_row("rank", |_, cell| real_to_int(cell))?;
        let mut table = extracted.dedup();
        table.insert_lead_column("season", Field::Int(i64::from(season)));
        Ok(table)
    }

    fn natural_key(&self, _transformed: &Table, season: i32) -> Result<NaturalKey> {
        Ok(NaturalKey::Season(season))
    }
}

/// The most frequent derived year; ties go to the smallest year so repeat
/// runs agree.
fn mode_year(years: &HashMap<i64, usize>) -> i64 {
    let mut best: Option<(i64, usize)> = None;
    for (&year, &count) in years {
        best = match best {
            None => Some((year, count)),
            Some((best_year, best_count))
                if count > best_count || (count == best_count && year < best_year) =>
            {
                Some((year, count))
            }
            keep => keep,
        };
    }
    best.map(|(year, _)| year).unwrap_or_default()
}

fn real_to_int(cell: &Field) -> Field {
    match cell {
        Field::Real(f) => Field::Int(f.round() as i64),
        other => other.clone(),
    }
}
