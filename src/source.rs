use std::path::Path;

use once_cell::unsync::OnceCell;

use crate::error::{EtlError, Result};
use crate::http_cache::{fetch_text_cached, http_client};
use crate::schema::RAW_COLUMNS;
use crate::table::Table;

/// Upstream repository holding one CSV per season.
pub const DATA_REPO: &str = "https://raw.githubusercontent.com/dangvohiep/tennis_atp/master/";
pub const FILE_PREFIX: &str = "atp_matches_";

/// One season's raw match file. The parsed table is computed on first
/// access and reused for the lifetime of the source; the underlying season
/// file is immutable so there is no invalidation.
pub struct AtpSource {
    season: i32,
    repo: String,
    table: OnceCell<Table>,
}

impl AtpSource {
    /// Source for one season against the configured data repository
    /// (`APP_DATA_REPO`, defaulting to the public tennis_atp mirror).
    pub fn new(season: i32) -> AtpSource {
        let repo = std::env::var("APP_DATA_REPO")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DATA_REPO.to_string());
        AtpSource::with_repo(season, repo)
    }

    /// Source against an explicit repository: an HTTP base URL or a local
    /// directory of season files.
    pub fn with_repo(season: i32, repo: impl Into<String>) -> AtpSource {
        AtpSource {
            season,
            repo: repo.into(),
            table: OnceCell::new(),
        }
    }

    pub fn season(&self) -> i32 {
        self.season
    }

    pub fn table(&self) -> Result<&Table> {
        self.table.get_or_try_init(|| {
            let body = fetch_season_file(&self.repo, self.season)?;
            parse_season_csv(&body, self.season)
        })
    }
}

fn fetch_season_file(repo: &str, season: i32) -> Result<String> {
    let name = format!("{FILE_PREFIX}{season}.csv");
    if repo.starts_with("http://") || repo.starts_with("https://") {
        let client = http_client().map_err(|e| EtlError::fetch(season, format!("{e:#}")))?;
        let url = if repo.ends_with('/') {
            format!("{repo}{name}")
        } else {
            format!("{repo}/{name}")
        };
        fetch_text_cached(client, &url).map_err(|e| EtlError::fetch(season, format!("{e:#}")))
    } else {
        let path = Path::new(repo).join(name);
        std::fs::read_to_string(&path)
            .map_err(|e| EtlError::fetch(season, format!("{}: {e}", path.display())))
    }
}

/// Parse a season file through the fixed raw schema. Every schema column
/// must be present; cells are typed at read time and the tournament date is
/// decoded from `YYYYMMDD`. Columns the schema does not know are ignored.
pub fn parse_season_csv(body: &str, season: i32) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new().from_reader(body.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| EtlError::fetch(season, e))?
        .clone();

    let mut positions = Vec::with_capacity(RAW_COLUMNS.len());
    for (name, _) in RAW_COLUMNS {
        let pos = headers
            .iter()
            .position(|h| h.trim() == *name)
            .ok_or_else(|| EtlError::fetch(season, format!("column `{name}` missing")))?;
        positions.push(pos);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| EtlError::fetch(season, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let mut row = Vec::with_capacity(RAW_COLUMNS.len());
        for ((name, ty), &pos) in RAW_COLUMNS.iter().zip(&positions) {
            let cell = record.get(pos).unwrap_or("");
            let field = ty.parse(cell).map_err(|reason| {
                EtlError::fetch(season, format!("line {line}, column `{name}`: {reason}"))
            })?;
            row.push(field);
        }
        rows.push(row);
    }

    Table::new(
        RAW_COLUMNS.iter().map(|(name, _)| name.to_string()).collect(),
        rows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Field;

    fn sample_csv() -> String {
        let header = RAW_COLUMNS
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(",");
        let row = [
            "2010-301",
            "Auckland",
            "Hard",
            "32",
            "A",
            "20100111",
            "1",
            "103819",
            "1",
            "",
            "Roger Federer",
            "R",
            "185",
            "SUI",
            "28.4",
            "104745",
            "",
            "Q",
            "Rafael Nadal",
            "L",
            "185",
            "ESP",
            "23.5",
            "6-3 6-4",
            "3",
            "F",
            "88",
            "7",
            "1",
            "55",
            "34",
            "28",
            "11",
            "9",
            "2",
            "3",
            "3",
            "2",
            "60",
            "35",
            "22",
            "13",
            "10",
            "4",
            "8",
            "1",
            "9045",
            "2",
            "8715",
        ]
        .join(",");
        format!("{header}\n{row}\n")
    }

    #[test]
    fn parses_typed_cells_and_date() {
        let table = parse_season_csv(&sample_csv(), 2010).unwrap();
        assert_eq!(table.len(), 1);
        let row = &table.rows()[0];
        let date_idx = table.column_index("tourney_date").unwrap();
        match &row[date_idx] {
            Field::Date(d) => assert_eq!(d.to_string(), "2010-01-11"),
            other => panic!("expected date, got {other:?}"),
        }
        let num_idx = table.column_index("match_num").unwrap();
        assert_eq!(row[num_idx], Field::Int(1));
        let entry_idx = table.column_index("winner_entry").unwrap();
        assert_eq!(row[entry_idx], Field::Null);
        let age_idx = table.column_index("loser_age").unwrap();
        assert_eq!(row[age_idx], Field::Real(23.5));
    }

    #[test]
    fn missing_schema_column_is_fetch_error() {
        let body = "tourney_id,tourney_name\n2010-301,Auckland\n";
        let err = parse_season_csv(body, 2010).unwrap_err();
        assert_eq!(err.kind(), "fetch");
    }

    #[test]
    fn unparseable_date_is_fetch_error() {
        let body = sample_csv().replace("20100111", "January 11");
        let err = parse_season_csv(&body, 2010).unwrap_err();
        assert_eq!(err.kind(), "fetch");
    }

    #[test]
    fn source_caches_first_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("{FILE_PREFIX}2010.csv"));
        std::fs::write(&path, sample_csv()).unwrap();

        let source = AtpSource::with_repo(2010, dir.path().to_string_lossy().to_string());
        assert_eq!(source.table().unwrap().len(), 1);

        // A second access must serve the in-memory table, not re-fetch.
        std::fs::remove_file(&path).unwrap();
        assert_eq!(source.table().unwrap().len(), 1);
    }
}
