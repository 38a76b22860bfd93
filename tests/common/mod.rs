#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;

use atp_ingest::schema::RAW_COLUMNS;

/// Data repository pointing at the checked-in fixture seasons.
pub fn fixtures_repo() -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .to_string_lossy()
        .to_string()
}

/// Default raw cells for one match row, keyed by raw column name. Tests
/// override just the cells they care about.
const DEFAULT_ROW: &[(&str, &str)] = &[
    ("tourney_id", "2010-301"),
    ("tourney_name", "Auckland"),
    ("surface", "Hard"),
    ("draw_size", "32"),
    ("tourney_level", "A"),
    ("tourney_date", "20100111"),
    ("match_num", "1"),
    ("winner_id", "103819"),
    ("winner_seed", "1"),
    ("winner_entry", ""),
    ("winner_name", "Roger Federer"),
    ("winner_hand", "R"),
    ("winner_ht", "185"),
    ("winner_ioc", "SUI"),
    ("winner_age", "28.4"),
    ("loser_id", "104745"),
    ("loser_seed", "2"),
    ("loser_entry", ""),
    ("loser_name", "Rafael Nadal"),
    ("loser_hand", "L"),
    ("loser_ht", "185"),
    ("loser_ioc", "ESP"),
    ("loser_age", "23.5"),
    ("score", "6-3 6-4"),
    ("best_of", "3"),
    ("round", "F"),
    ("minutes", "88"),
    ("w_ace", "7"),
    ("w_df", "1"),
    ("w_svpt", "55"),
    ("w_1stIn", "34"),
    ("w_1stWon", "28"),
    ("w_2ndWon", "11"),
    ("w_SvGms", "9"),
    ("w_bpSaved", "2"),
    ("w_bpFaced", "3"),
    ("l_ace", "3"),
    ("l_df", "2"),
    ("l_svpt", "60"),
    ("l_1stIn", "35"),
    ("l_1stWon", "22"),
    ("l_2ndWon", "13"),
    ("l_SvGms", "10"),
    ("l_bpSaved", "4"),
    ("l_bpFaced", "8"),
    ("winner_rank", "1"),
    ("winner_rank_points", "9045"),
    ("loser_rank", "2"),
    ("loser_rank_points", "8715"),
];

/// Build a season CSV body: one row per override list, each cell taken
/// from the override when present and the default template otherwise.
pub fn season_csv(rows: &[&[(&str, &str)]]) -> String {
    let defaults: HashMap<&str, &str> = DEFAULT_ROW.iter().copied().collect();
    let mut body = RAW_COLUMNS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(",");
    body.push('\n');
    for overrides in rows {
        let cells: HashMap<&str, &str> = overrides.iter().copied().collect();
        let line = RAW_COLUMNS
            .iter()
            .map(|(name, _)| {
                cells
                    .get(name)
                    .or_else(|| defaults.get(name))
                    .copied()
                    .unwrap_or("")
            })
            .collect::<Vec<_>>()
            .join(",");
        body.push_str(&line);
        body.push('\n');
    }
    body
}
