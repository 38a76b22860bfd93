use log::{info, warn};

use crate::error::Result;
use crate::etl::{EntityEtl, EntityKind, Matches, Players, Rankings, Tournaments};
use crate::source::AtpSource;
use crate::store::Store;

/// A contiguous, inclusive season range plus an optional data-repo
/// override (HTTP base URL or local directory).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub start_season: i32,
    pub end_season: i32,
    pub data_repo: Option<String>,
}

impl PipelineConfig {
    pub fn new(start_season: i32, end_season: i32) -> PipelineConfig {
        PipelineConfig {
            start_season,
            end_season,
            data_repo: None,
        }
    }

    pub fn with_repo(mut self, repo: impl Into<String>) -> PipelineConfig {
        self.data_repo = Some(repo.into());
        self
    }

    fn seasons_total(&self) -> usize {
        if self.end_season < self.start_season {
            0
        } else {
            (self.end_season - self.start_season + 1) as usize
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeasonFailure {
    pub season: i32,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct EntitySummary {
    pub entity: EntityKind,
    pub seasons_total: usize,
    pub seasons_succeeded: usize,
    pub rows_loaded: usize,
    pub failures: Vec<SeasonFailure>,
}

#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub start_season: i32,
    pub end_season: i32,
    pub per_entity: Vec<EntitySummary>,
}

impl IngestSummary {
    pub fn rows_loaded(&self) -> usize {
        self.per_entity.iter().map(|e| e.rows_loaded).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.per_entity.iter().map(|e| e.failures.len()).sum()
    }
}

/// Run every entity pipeline across the configured season range,
/// entity-by-entity in dependency order. A failing (entity, season) pair
/// is recorded and the driver moves on to the next season; only store
/// bookkeeping failures abort the whole run.
pub fn run_ingest(store: &mut Store, config: &PipelineConfig) -> Result<IngestSummary> {
    let entities: [&dyn EntityEtl; 4] = [&Tournaments, &Players, &Rankings, &Matches];
    debug_assert!(
        entities
            .iter()
            .map(|e| e.kind())
            .eq(EntityKind::LOAD_ORDER),
        "entity pipelines out of dependency order"
    );

    let mut per_entity = Vec::with_capacity(entities.len());
    for etl in entities {
        per_entity.push(run_entity(store, etl, config)?);
    }

    Ok(IngestSummary {
        start_season: config.start_season,
        end_season: config.end_season,
        per_entity,
    })
}

fn run_entity(
    store: &mut Store,
    etl: &dyn EntityEtl,
    config: &PipelineConfig,
) -> Result<EntitySummary> {
    let kind = etl.kind();
    let run_id = store.begin_run(kind, config.seasons_total())?;

    let mut summary = EntitySummary {
        entity: kind,
        seasons_total: config.seasons_total(),
        seasons_succeeded: 0,
        rows_loaded: 0,
        failures: Vec::new(),
    };

    for season in config.start_season..=config.end_season {
        let source = match &config.data_repo {
            Some(repo) => AtpSource::with_repo(season, repo.clone()),
            None => AtpSource::new(season),
        };
        match run_season(store, etl, &source) {
            Ok(rows) => {
                info!("{} season {season}: loaded {rows} rows", kind.table_name());
                summary.seasons_succeeded += 1;
                summary.rows_loaded += rows;
            }
            Err(err) => {
                warn!("{} season {season} failed: {err}", kind.table_name());
                summary.failures.push(SeasonFailure {
                    season,
                    kind: err.kind(),
                    message: err.to_string(),
                });
            }
        }
    }

    let error_lines: Vec<String> = summary
        .failures
        .iter()
        .map(|f| format!("season {}: {}", f.season, f.message))
        .collect();
    store.finish_run(
        run_id,
        summary.seasons_succeeded,
        summary.rows_loaded,
        &error_lines,
    )?;
    Ok(summary)
}

fn run_season(store: &mut Store, etl: &dyn EntityEtl, source: &AtpSource) -> Result<usize> {
    let raw = source.table()?;
    let extracted = etl.extract(raw)?;
    let transformed = etl.transform(extracted, source.season())?;
    etl.load(store, &transformed, source.season())
}
