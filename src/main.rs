use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use log::LevelFilter;

use atp_ingest::pipeline::{PipelineConfig, run_ingest};
use atp_ingest::store::{Store, default_db_path};

const DEFAULT_START_SEASON: i32 = 1985;
const DEFAULT_END_SEASON: i32 = 2023;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_logging();

    let (start_season, end_season) = resolve_season_range()?;
    if start_season > end_season {
        return Err(anyhow!("season range {start_season}-{end_season} is empty"));
    }

    let db_path = arg_value("--db")
        .map(PathBuf::from)
        .or_else(|| env_nonempty("APP_DB_PATH").map(PathBuf::from))
        .or_else(default_db_path)
        .context("unable to resolve sqlite path")?;
    let repo = arg_value("--repo").or_else(|| env_nonempty("APP_DATA_REPO"));

    let mut store = Store::open(&db_path)?;
    let mut config = PipelineConfig::new(start_season, end_season);
    if let Some(repo) = repo {
        config = config.with_repo(repo);
    }
    let summary = run_ingest(&mut store, &config)?;

    println!("ATP ingest complete");
    println!("DB: {}", db_path.display());
    println!("Seasons: {start_season}-{end_season}");
    println!("Rows loaded: {}", summary.rows_loaded());
    for entity in &summary.per_entity {
        println!(
            "{}: seasons {}/{} rows={}",
            entity.entity.table_name(),
            entity.seasons_succeeded,
            entity.seasons_total,
            entity.rows_loaded
        );
        if !entity.failures.is_empty() {
            println!("  errors: {}", entity.failures.len());
            for failure in entity.failures.iter().take(6) {
                println!(
                    "   - season {} [{}]: {}",
                    failure.season, failure.kind, failure.message
                );
            }
        }
    }

    if summary.rows_loaded() == 0 && summary.failure_count() > 0 {
        return Err(anyhow!("no season loaded"));
    }
    Ok(())
}

fn init_logging() {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
    if std::env::var("RUST_LOG").is_err() {
        builder.filter_module("atp_ingest", LevelFilter::Info);
    }
    let _ = builder.format_timestamp_millis().try_init();
}

fn resolve_season_range() -> Result<(i32, i32)> {
    if let Some(raw) = arg_value("--seasons") {
        return parse_season_range(&raw);
    }
    let start = arg_value("--start")
        .or_else(|| env_nonempty("APP_START_SEASON"))
        .map(|raw| parse_season(&raw))
        .transpose()?
        .unwrap_or(DEFAULT_START_SEASON);
    let end = arg_value("--end")
        .or_else(|| env_nonempty("APP_END_SEASON"))
        .map(|raw| parse_season(&raw))
        .transpose()?
        .unwrap_or(DEFAULT_END_SEASON);
    Ok((start, end))
}

fn parse_season_range(raw: &str) -> Result<(i32, i32)> {
    let (start, end) = raw
        .split_once('-')
        .ok_or_else(|| anyhow!("expected START-END, got `{raw}`"))?;
    Ok((parse_season(start)?, parse_season(end)?))
}

fn parse_season(raw: &str) -> Result<i32> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| anyhow!("`{raw}` is not a season year"))
}

fn arg_value(flag: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(flag).and_then(|rest| rest.strip_prefix('=')) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
