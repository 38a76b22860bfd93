mod common;

use atp_ingest::etl::EntityKind;
use atp_ingest::overview::season_overview;
use atp_ingest::pipeline::{PipelineConfig, run_ingest};
use atp_ingest::store::Store;

#[test]
fn fixture_season_loads_end_to_end() {
    let mut store = Store::open_in_memory().unwrap();
    let config = PipelineConfig::new(2010, 2010).with_repo(common::fixtures_repo());
    let summary = run_ingest(&mut store, &config).unwrap();

    let order: Vec<EntityKind> = summary.per_entity.iter().map(|e| e.entity).collect();
    assert_eq!(
        order,
        vec![
            EntityKind::Tournaments,
            EntityKind::Players,
            EntityKind::Rankings,
            EntityKind::Matches
        ]
    );
    assert_eq!(summary.failure_count(), 0);

    // Two matches in one tournament between two players.
    assert_eq!(store.row_count(EntityKind::Tournaments).unwrap(), 1);
    assert_eq!(store.row_count(EntityKind::Players).unwrap(), 2);
    assert_eq!(store.row_count(EntityKind::Rankings).unwrap(), 2);
    assert_eq!(store.row_count(EntityKind::Matches).unwrap(), 2);

    let seasons: Vec<i64> = {
        let mut stmt = store
            .conn()
            .prepare("SELECT DISTINCT season FROM matches")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    };
    assert_eq!(seasons, vec![2010]);
}

#[test]
fn rerunning_the_range_is_idempotent() {
    let mut store = Store::open_in_memory().unwrap();
    let config = PipelineConfig::new(2010, 2010).with_repo(common::fixtures_repo());
    run_ingest(&mut store, &config).unwrap();
    let first = [
        store.row_count(EntityKind::Tournaments).unwrap(),
        store.row_count(EntityKind::Players).unwrap(),
        store.row_count(EntityKind::Rankings).unwrap(),
        store.row_count(EntityKind::Matches).unwrap(),
    ];

    run_ingest(&mut store, &config).unwrap();
    let second = [
        store.row_count(EntityKind::Tournaments).unwrap(),
        store.row_count(EntityKind::Players).unwrap(),
        store.row_count(EntityKind::Rankings).unwrap(),
        store.row_count(EntityKind::Matches).unwrap(),
    ];
    assert_eq!(first, second);
}

#[test]
fn bad_seasons_are_reported_without_stopping_the_run() {
    let mut store = Store::open_in_memory().unwrap();
    // 2011 carries an unparseable tournament date; 2012 has no file.
    let config = PipelineConfig::new(2010, 2012).with_repo(common::fixtures_repo());
    let summary = run_ingest(&mut store, &config).unwrap();

    for entity in &summary.per_entity {
        assert_eq!(entity.seasons_total, 3);
        assert_eq!(entity.seasons_succeeded, 1);
        let failed: Vec<i32> = entity.failures.iter().map(|f| f.season).collect();
        assert_eq!(failed, vec![2011, 2012]);
        assert!(entity.failures.iter().all(|f| f.kind == "fetch"));
    }

    // Only the good season's rows persisted.
    assert_eq!(store.row_count(EntityKind::Matches).unwrap(), 2);
    assert_eq!(store.row_count(EntityKind::Tournaments).unwrap(), 1);

    // Every entity run is recorded in the ingest ledger.
    let runs: Vec<(String, i64)> = {
        let mut stmt = store
            .conn()
            .prepare("SELECT entity, seasons_succeeded FROM ingest_runs ORDER BY run_id")
            .unwrap();
        stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    };
    assert_eq!(
        runs,
        vec![
            ("tournaments".to_string(), 1),
            ("players".to_string(), 1),
            ("rankings".to_string(), 1),
            ("matches".to_string(), 1),
        ]
    );
}

#[test]
fn overview_join_resolves_every_match() {
    let mut store = Store::open_in_memory().unwrap();
    let config = PipelineConfig::new(2010, 2010).with_repo(common::fixtures_repo());
    run_ingest(&mut store, &config).unwrap();

    let rows = season_overview(&store, 2010).unwrap();
    assert_eq!(rows.len(), 2);

    let first = &rows[0];
    assert_eq!(first.season, 2010);
    assert_eq!(first.tourney_name.as_deref(), Some("Auckland"));
    assert_eq!(first.surface.as_deref(), Some("Hard"));
    assert_eq!(first.winner_name.as_deref(), Some("Roger Federer"));
    assert_eq!(first.loser_name.as_deref(), Some("Rafael Nadal"));
    assert_eq!(first.winner_rank, Some(1));
    assert_eq!(first.loser_rank, Some(2));
    assert_eq!(first.minutes, Some(88.0));

    // The final has no recorded statistics; nulls flow through the join.
    let second = &rows[1];
    assert_eq!(second.round.as_deref(), Some("F"));
    assert_eq!(second.minutes, None);
}
