//! The fixed raw-file schema and the renaming rules that take raw
//! winner/loser-prefixed columns to their canonical unprefixed names.

use chrono::NaiveDate;

use crate::error::{EtlError, Result};
use crate::table::Field;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Int,
    Real,
    Date,
}

impl ColumnType {
    /// Parse one raw CSV cell. Empty cells are null for every type; the
    /// tournament date uses the fixed `YYYYMMDD` encoding.
    pub fn parse(self, raw: &str) -> std::result::Result<Field, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Field::Null);
        }
        match self {
            ColumnType::Text => Ok(Field::Text(trimmed.to_string())),
            ColumnType::Int => trimmed
                .parse::<i64>()
                .map(Field::Int)
                .map_err(|_| format!("`{trimmed}` is not an integer")),
            ColumnType::Real => trimmed
                .parse::<f64>()
                .map(Field::Real)
                .map_err(|_| format!("`{trimmed}` is not a number")),
            ColumnType::Date => NaiveDate::parse_from_str(trimmed, "%Y%m%d")
                .map(Field::Date)
                .map_err(|_| format!("`{trimmed}` is not a YYYYMMDD date")),
        }
    }
}

/// Every column a season file must carry, in file order, with its type.
/// The seed and entry columns are typed here but never projected into an
/// entity table.
pub const RAW_COLUMNS: &[(&str, ColumnType)] = &[
    ("tourney_id", ColumnType::Text),
    ("tourney_name", ColumnType::Text),
    ("surface", ColumnType::Text),
    ("draw_size", ColumnType::Real),
    ("tourney_level", ColumnType::Text),
    ("tourney_date", ColumnType::Date),
    ("match_num", ColumnType::Int),
    ("winner_id", ColumnType::Text),
    ("winner_seed", ColumnType::Real),
    ("winner_entry", ColumnType::Text),
    ("winner_name", ColumnType::Text),
    ("winner_hand", ColumnType::Text),
    ("winner_ht", ColumnType::Real),
    ("winner_ioc", ColumnType::Text),
    ("winner_age", ColumnType::Real),
    ("loser_id", ColumnType::Text),
    ("loser_seed", ColumnType::Real),
    ("loser_entry", ColumnType::Text),
    ("loser_name", ColumnType::Text),
    ("loser_hand", ColumnType::Text),
    ("loser_ht", ColumnType::Real),
    ("loser_ioc", ColumnType::Text),
    ("loser_age", ColumnType::Real),
    ("score", ColumnType::Text),
    ("best_of", ColumnType::Real),
    ("round", ColumnType::Text),
    ("minutes", ColumnType::Real),
    ("w_ace", ColumnType::Real),
    ("w_df", ColumnType::Real),
    ("w_svpt", ColumnType::Real),
    ("w_1stIn", ColumnType::Real),
    ("w_1stWon", ColumnType::Real),
    ("w_2ndWon", ColumnType::Real),
    ("w_SvGms", ColumnType::Real),
    ("w_bpSaved", ColumnType::Real),
    ("w_bpFaced", ColumnType::Real),
    ("l_ace", ColumnType::Real),
    ("l_df", ColumnType::Real),
    ("l_svpt", ColumnType::Real),
    ("l_1stIn", ColumnType::Real),
    ("l_1stWon", ColumnType::Real),
    ("l_2ndWon", ColumnType::Real),
    ("l_SvGms", ColumnType::Real),
    ("l_bpSaved", ColumnType::Real),
    ("l_bpFaced", ColumnType::Real),
    ("winner_rank", ColumnType::Real),
    ("winner_rank_points", ColumnType::Real),
    ("loser_rank", ColumnType::Real),
    ("loser_rank_points", ColumnType::Real),
];

pub const TOURNAMENT_COLUMNS: &[&str] = &[
    "tourney_id",
    "tourney_name",
    "tourney_level",
    "tourney_date",
    "surface",
    "draw_size",
];

pub const PLAYER_WINNER_COLUMNS: &[&str] = &[
    "winner_id",
    "winner_name",
    "winner_hand",
    "winner_ht",
    "winner_ioc",
    "winner_age",
];

pub const PLAYER_LOSER_COLUMNS: &[&str] = &[
    "loser_id",
    "loser_name",
    "loser_hand",
    "loser_ht",
    "loser_ioc",
    "loser_age",
];

pub const MATCH_COLUMNS: &[&str] = &[
    "tourney_id",
    "match_num",
    "winner_id",
    "loser_id",
    "score",
    "best_of",
    "round",
    "minutes",
    "w_ace",
    "w_df",
    "w_svpt",
    "w_1stIn",
    "w_1stWon",
    "w_2ndWon",
    "w_SvGms",
    "w_bpSaved",
    "w_bpFaced",
    "l_ace",
    "l_df",
    "l_svpt",
    "l_1stIn",
    "l_1stWon",
    "l_2ndWon",
    "l_SvGms",
    "l_bpSaved",
    "l_bpFaced",
];

pub const RANKING_WINNER_COLUMNS: &[&str] = &[
    "tourney_id",
    "winner_id",
    "winner_rank",
    "winner_rank_points",
];

pub const RANKING_LOSER_COLUMNS: &[&str] =
    &["tourney_id", "loser_id", "loser_rank", "loser_rank_points"];

/// Canonical name for a player-perspective column: the id becomes
/// `player_id`, the height abbreviation expands, everything else keeps the
/// suffix after its `winner_`/`loser_` prefix.
pub fn player_column_name(raw: &str) -> Result<String> {
    let suffix = raw
        .strip_prefix("winner_")
        .or_else(|| raw.strip_prefix("loser_"))
        .ok_or_else(|| EtlError::unknown_column(raw))?;
    let canonical = match suffix {
        "id" => "player_id",
        "ht" => "height",
        "name" | "hand" | "ioc" | "age" => suffix,
        _ => return Err(EtlError::unknown_column(raw)),
    };
    Ok(canonical.to_string())
}

/// Canonical name for a match column. Only the abbreviated `w_`/`l_`
/// statistics columns change; everything else passes through unchanged.
pub fn match_column_name(raw: &str) -> Result<String> {
    let (prefix, suffix) = match raw.split_once('_') {
        Some(("w", rest)) => ("winner", rest),
        Some(("l", rest)) => ("loser", rest),
        _ => return Ok(raw.to_string()),
    };
    let canonical = match suffix {
        "id" => "player_id",
        "ace" => "aces",
        "df" => "double_faults",
        "svpt" => "serve_points",
        "1stIn" => "first_serve_in",
        "1stWon" => "first_serve_won",
        "2ndWon" => "second_serve_won",
        "SvGms" => "service_games",
        "bpSaved" => "break_points_saved",
        "bpFaced" => "break_points_faced",
        _ => return Err(EtlError::unknown_column(raw)),
    };
    Ok(format!("{prefix}_{canonical}"))
}

/// Canonical name for a ranking-perspective column, via a fixed lookup.
pub fn ranking_column_name(raw: &str) -> Result<String> {
    let canonical = match raw {
        "tourney_id" => "tourney_id",
        "winner_id" | "loser_id" => "player_id",
        "winner_rank" | "loser_rank" => "rank",
        "winner_rank_points" | "loser_rank_points" => "points",
        _ => return Err(EtlError::unknown_column(raw)),
    };
    Ok(canonical.to_string())
}
