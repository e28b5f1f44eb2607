use std::path::Path;

use ufc_history::config::Config;
use ufc_history::coordinator::run_partitioned;
use ufc_history::cumulative::accumulate_career_totals;
use ufc_history::dedup::{dedup_records, order_records};
use ufc_history::fighter_page::{
    ClinchRow, FighterPage, GeneralInfo, GroundRow, HistoryRow, PageStats, StandingRow,
};
use ufc_history::match_history;
use ufc_history::pipeline::{run_from_snapshot, run_report};
use ufc_history::snapshot::load_snapshot;
use ufc_history::stats_store::{MatchSeed, StatsStore};

const ALPHA_URL: &str = "http://www.espn.com/mma/fighter/_/id/1/alpha";
const BRAVO_URL: &str = "http://www.espn.com/mma/fighter/_/id/2/bravo";
const CHARLIE_URL: &str = "http://www.espn.com/mma/fighter/_/id/3/charlie";

fn bout(date: &str, opponent: &str, opp_url: Option<&str>, result: &str) -> HistoryRow {
    HistoryRow {
        date: date.to_string(),
        event: "UFC Fight Night".to_string(),
        opponent: opponent.to_string(),
        opp_url: opp_url.map(str::to_string),
        result: result.to_string(),
        decision: "KO/TKO".to_string(),
        round: 2,
        time: "3:14".to_string(),
    }
}

fn stats(rows: &[(&str, &str, &str, &str)]) -> PageStats {
    let mut out = PageStats::default();
    for (date, opp_url, sdbl_a, tsl) in rows {
        let opp_url = Some(opp_url.to_string());
        out.standing.push(StandingRow {
            date: date.to_string(),
            opp_url: opp_url.clone(),
            sdbl_a: sdbl_a.to_string(),
            tsl: tsl.to_string(),
            kd: "-".to_string(),
            ..StandingRow::default()
        });
        out.clinch.push(ClinchRow {
            date: date.to_string(),
            opp_url: opp_url.clone(),
            tdl: "1".to_string(),
            ..ClinchRow::default()
        });
        out.ground.push(GroundRow {
            date: date.to_string(),
            opp_url,
            sm: "1".to_string(),
            ..GroundRow::default()
        });
    }
    out
}

fn fighter(name: &str, url: &str, history: Vec<HistoryRow>, stats: PageStats) -> FighterPage {
    FighterPage {
        url: url.to_string(),
        info: GeneralInfo {
            name: Some(name.to_string()),
            age: Some(30),
            height: Some("6' 0\"".to_string()),
            weight_class: Some("Welterweight".to_string()),
            reach: Some("74\"".to_string()),
            ..GeneralInfo::default()
        },
        history,
        stats,
    }
}

/// Alpha and Bravo fight twice, Alpha and Charlie once (Charlie has no
/// statistics), and Alpha has one bout against an unlisted opponent.
fn seed_store(path: &Path) {
    let store = StatsStore::open(path).unwrap();
    store.create_schema().unwrap();

    let alpha = fighter(
        "Alpha",
        ALPHA_URL,
        vec![
            bout("2020-01-01", "Bravo", Some(BRAVO_URL), "Win"),
            bout("2020-06-01", "Bravo", Some(BRAVO_URL), "Loss"),
            bout("2020-09-01", "Nobody", None, "Win"),
            bout("2021-01-01", "Charlie", Some(CHARLIE_URL), "Win"),
        ],
        stats(&[
            ("2020-01-01", BRAVO_URL, "3/5", "10"),
            ("2020-06-01", BRAVO_URL, "1/4", "7"),
            ("2021-01-01", CHARLIE_URL, "2/2", "5"),
        ]),
    );
    let bravo = fighter(
        "Bravo",
        BRAVO_URL,
        vec![
            bout("2020-01-01", "Alpha", Some(ALPHA_URL), "Loss"),
            bout("2020-06-01", "Alpha", Some(ALPHA_URL), "Win"),
        ],
        stats(&[
            ("2020-01-01", ALPHA_URL, "0/3", "4"),
            ("2020-06-01", ALPHA_URL, "6/9", "1"),
        ]),
    );
    let charlie = fighter(
        "Charlie",
        CHARLIE_URL,
        vec![bout("2021-01-01", "Alpha", Some(ALPHA_URL), "Loss")],
        PageStats::default(),
    );

    for (id, page) in [(1, &alpha), (2, &bravo), (3, &charlie)] {
        let summary = store.persist_page(id, page).unwrap();
        assert!(summary.fighter);
    }
    assert_eq!(store.fighter_count().unwrap(), 3);
    assert_eq!(store.history_count().unwrap(), 7);
}

fn config_in(dir: &Path) -> Config {
    Config {
        db_path: dir.join("raw.db"),
        output_db_path: dir.join("out").join("history.db"),
        report_path: dir.join("out").join("matches.xlsx"),
        cumulative_report_path: dir.join("out").join("totals.xlsx"),
        snapshot_path: dir.join("out").join("matches.bin"),
        scratch_dir: Some(dir.join("scratch")),
        workers: 3,
        ..Config::default()
    }
}

#[test]
fn partitioned_run_keeps_one_entry_per_seed() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    seed_store(&config.db_path);

    let seeds = StatsStore::open(&config.db_path)
        .unwrap()
        .query_match_seeds()
        .unwrap();
    assert_eq!(seeds.len(), 7);

    let run = run_partitioned(&config.db_path, config.scratch_dir.as_deref(), &seeds, 3, |_| {})
        .unwrap();
    assert_eq!(run.workers_spawned, 3);
    assert_eq!(run.workers_completed, 3);
    assert_eq!(run.records.len(), seeds.len());
    assert_eq!(run.records.iter().filter(|r| r.is_none()).count(), 1);

    // Every snapshot copy is gone once the workers have joined.
    let leftovers = std::fs::read_dir(config.scratch_dir.as_ref().unwrap())
        .unwrap()
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn mirrored_bouts_collapse_to_the_winner_view() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    seed_store(&config.db_path);
    let seeds = StatsStore::open(&config.db_path)
        .unwrap()
        .query_match_seeds()
        .unwrap();

    let run = run_partitioned(&config.db_path, None, &seeds, 20, |_| {}).unwrap();
    let matches = order_records(dedup_records(run.records));
    assert_eq!(matches.len(), 3);

    let first = &matches[0];
    assert_eq!(first.date, "2020-01-01");
    assert_eq!(first.winner, "Alpha");
    assert_eq!(first.fighter1.name, "Alpha");
    assert_eq!(first.fighter2.name, "Bravo");
    assert_eq!((first.fighter1.stats.sdbl, first.fighter1.stats.sdba), (3, 5));
    assert_eq!(first.fighter1.stats.tsl, 10);
    assert_eq!(first.fighter2.stats.tsl, 4);

    assert_eq!(matches[1].winner, "Bravo");
    assert!(matches.iter().all(|m| m.date != "2020-09-01"));

    let charlie_bout = &matches[2];
    assert_eq!(charlie_bout.fighter2.name, "Charlie");
    assert!(charlie_bout.fighter2.stats.is_zero());
    assert_eq!(charlie_bout.fighter1.stats.tsl, 5);
}

#[test]
fn career_totals_follow_each_fighter_across_slots() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    seed_store(&config.db_path);
    let seeds = StatsStore::open(&config.db_path)
        .unwrap()
        .query_match_seeds()
        .unwrap();

    let run = run_partitioned(&config.db_path, None, &seeds, 2, |_| {}).unwrap();
    let matches = order_records(dedup_records(run.records));
    let totals = accumulate_career_totals(&matches);

    assert_eq!(totals.len(), matches.len());
    assert_eq!(totals[1].fighter1.stats.tsl, 17);
    assert_eq!(totals[1].fighter2.stats.tsl, 5);
    assert_eq!(totals[2].fighter1.stats.tsl, 22);
    assert_eq!(totals[2].fighter1.stats.sm, 3);
    assert_eq!(totals[2].fighter2.stats.tsl, 0);
}

#[test]
fn report_run_writes_every_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    seed_store(&config.db_path);

    let run = run_report(&config, |_| {}).unwrap();
    assert_eq!(run.seeds, 7);
    assert_eq!(run.discarded, 1);
    assert_eq!(run.registered(), 3);
    assert!(run.output_failures.is_empty(), "{:?}", run.output_failures);

    assert!(config.report_path.exists());
    assert!(config.cumulative_report_path.exists());
    let snapshot = load_snapshot(&config.snapshot_path).unwrap();
    assert_eq!(snapshot.matches, run.matches);
    assert_eq!(snapshot.totals, run.totals);

    let conn = match_history::open_db(&config.output_db_path).unwrap();
    assert_eq!(match_history::load_match_history(&conn).unwrap(), run.matches);

    // A second run replaces rather than appends.
    let again = run_report(&config, |_| {}).unwrap();
    assert_eq!(match_history::load_match_history(&conn).unwrap(), again.matches);
}

#[test]
fn report_on_a_missing_store_fails_and_keeps_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    seed_store(&config.db_path);
    let run = run_report(&config, |_| {}).unwrap();

    let mut typo = config.clone();
    typo.db_path = dir.path().join("typo.db");
    assert!(run_report(&typo, |_| {}).is_err());
    assert!(!typo.db_path.exists());

    let conn = match_history::open_db(&config.output_db_path).unwrap();
    let kept = match_history::load_match_history(&conn).unwrap();
    assert_eq!(kept.len(), 3);
    assert_eq!(kept, run.matches);
    assert_eq!(load_snapshot(&config.snapshot_path).unwrap().matches, run.matches);
}

#[test]
fn reports_can_be_rebuilt_from_the_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    seed_store(&config.db_path);
    let run = run_report(&config, |_| {}).unwrap();

    std::fs::remove_file(&config.db_path).unwrap();
    std::fs::remove_file(&config.report_path).unwrap();
    std::fs::remove_file(&config.cumulative_report_path).unwrap();

    let rebuilt = run_from_snapshot(&config, |_| {}).unwrap();
    assert!(rebuilt.output_failures.is_empty(), "{:?}", rebuilt.output_failures);
    assert_eq!(rebuilt.matches, run.matches);
    assert_eq!(rebuilt.totals, run.totals);
    assert!(config.report_path.exists());
    assert!(config.cumulative_report_path.exists());

    let conn = match_history::open_db(&config.output_db_path).unwrap();
    assert_eq!(match_history::load_match_history(&conn).unwrap(), run.matches);
}

#[test]
fn missing_store_snapshots_yield_no_records() {
    let dir = tempfile::tempdir().unwrap();
    let seeds = vec![MatchSeed::default(); 4];
    let run = run_partitioned(&dir.path().join("absent.db"), None, &seeds, 2, |_| {}).unwrap();
    assert_eq!(run.workers_spawned, 2);
    assert_eq!(run.workers_completed, 0);
    assert!(run.records.is_empty());
}
