/// End-to-end tests: event log in, results table out.
///
/// Run with: cargo test --test integration_tests -- --nocapture

use biathlon_timer::{
    build_report, decode_line, rank, render_text, RaceConfig, RaceLedger, ReportSettings,
    Standing,
};
use chrono::Duration;
use proptest::prelude::*;

const CONFIG: &str = r#"{
    "laps": 2,
    "lapLen": 3651,
    "penaltyLen": 50,
    "firingLines": 1,
    "start": "09:30:00",
    "startDelta": "00:00:30"
}"#;

fn run(cfg: &RaceConfig, log: &str) -> (RaceLedger, String) {
    let mut ledger = RaceLedger::from_config(cfg);
    ledger.ingest(log.as_bytes()).expect("event log should apply");
    let rows = build_report(&ledger, &ReportSettings::from(cfg));
    let mut out = Vec::new();
    render_text(&rows, &mut out).expect("report renders");
    (ledger, String::from_utf8(out).expect("utf-8 report"))
}

fn one_lap_config(lap_len: u32) -> RaceConfig {
    RaceConfig::from_json(&format!(
        r#"{{"laps": 1, "lapLen": {lap_len}, "penaltyLen": 150, "firingLines": 1,
            "start": "10:00:00", "startDelta": "00:00:30"}}"#
    ))
    .expect("valid config")
}

#[test]
fn test_single_lap_scenario() {
    println!("\n=== Test: Single Lap Scenario ===");
    let cfg = one_lap_config(3000);
    let (ledger, report) = run(
        &cfg,
        "[10:00:00.000] 1 1\n\
         [10:00:00.000] 2 1 10:00:00\n\
         [10:00:00.000] 4 1\n\
         [10:30:00.000] 10 1\n",
    );

    let rec = ledger.get("1").expect("competitor 1");
    assert_eq!(rec.laps.len(), 1);
    assert!(!rec.laps[0].is_open());
    assert_eq!(rec.laps[0].duration(), Some(Duration::minutes(30)));
    assert_eq!(report, "00:30:00.000 1 [{00:30:00.000, 1.667}] [] 0/5\n");
    println!("✓ {}", report.trim_end());
}

#[test]
fn test_lost_in_the_forest() {
    println!("\n=== Test: Cannot Continue ===");
    let cfg = RaceConfig::from_json(CONFIG).unwrap();
    let (ledger, report) = run(
        &cfg,
        "[09:05:59.867] 1 1\n\
         [09:15:00.841] 2 1 09:30:00.000\n\
         [09:29:45.734] 3 1\n\
         [09:30:01.005] 4 1\n\
         [09:49:31.659] 5 1 1\n\
         [09:49:33.123] 6 1 1\n\
         [09:49:34.650] 6 1 2\n\
         [09:49:35.937] 6 1 4\n\
         [09:49:37.364] 6 1 5\n\
         [09:49:38.339] 7 1\n\
         [09:49:55.915] 8 1\n\
         [09:51:48.391] 9 1\n\
         [09:59:03.872] 10 1\n\
         [09:59:03.872] 11 1 Lost in the forest\n",
    );

    let rec = ledger.get("1").unwrap();
    assert!(rec.not_finished);
    assert!(!rec.not_started, "started one second after the draw");
    assert_eq!(rec.comment.as_deref(), Some("Lost in the forest"));
    assert_eq!(
        report,
        "{NotFinished} 1 [{00:29:02.867, 2.095}, {,}] [{00:01:52.476, 0.445}] 4/5\n"
    );
    println!("✓ {}", report.trim_end());
}

#[test]
fn test_late_start_is_not_started() {
    println!("\n=== Test: Late Start ===");
    let cfg = RaceConfig::from_json(CONFIG).unwrap();
    let (ledger, report) = run(
        &cfg,
        "[09:05:59.867] 1 2\n\
         [09:15:00.841] 2 2 09:30:30.000\n\
         [09:31:00.001] 4 2\n\
         [09:50:00.000] 10 2\n\
         [10:10:00.000] 10 2\n",
    );

    let rec = ledger.get("2").unwrap();
    assert!(rec.not_started);
    assert!(rec.finish_time.is_some(), "laps are still recorded");
    assert!(report.starts_with("{NotStarted} 2 "), "{report}");
}

#[test]
fn test_full_field_ordering() {
    println!("\n=== Test: Full Field Ordering ===");
    let cfg = RaceConfig::from_json(CONFIG).unwrap();
    let (_, report) = run(
        &cfg,
        "[09:00:00.000] 1 1\n\
         [09:00:00.000] 1 2\n\
         [09:00:00.000] 1 3\n\
         [09:00:00.000] 1 4\n\
         [09:00:00.000] 1 5\n\
         [09:10:00.000] 2 1 09:30:00\n\
         [09:10:00.000] 2 2 09:30:30\n\
         [09:10:00.000] 2 3 09:31:00\n\
         [09:10:00.000] 2 4 09:31:30\n\
         [09:10:00.000] 2 5 09:32:00\n\
         [09:30:00.000] 4 1\n\
         [09:30:30.000] 4 2\n\
         [09:31:00.000] 4 3\n\
         [09:33:00.000] 4 4\n\
         [09:40:00.000] 10 1\n\
         [09:41:00.000] 10 2\n\
         [09:42:00.000] 10 3\n\
         [09:45:00.000] 11 3 Broken pole\n\
         [09:49:30.000] 10 2\n\
         [09:50:00.000] 10 1\n",
    );

    let ids: Vec<&str> = report
        .lines()
        .map(|l| l.split(' ').nth(1).expect("id column"))
        .collect();
    // 4 started late, 5 never started, 3 abandoned, 2 beat 1.
    assert_eq!(ids, vec!["4", "5", "3", "2", "1"]);
    for line in report.lines() {
        println!("  {line}");
    }
}

#[test]
fn test_unknown_kind_is_harmless() {
    let cfg = one_lap_config(3500);
    let (ledger, report) = run(
        &cfg,
        "[10:00:00.000] 4 1\n\
         [10:01:00.000] 99 1 whatever comes here\n\
         [10:05:50.000] 10 1\n",
    );
    let rec = ledger.get("1").unwrap();
    assert_eq!(rec.hits, 0);
    assert_eq!(report, "00:05:50.000 1 [{00:05:50.000, 10.000}] [] 0/5\n");
}

#[test]
fn test_malformed_event_aborts() {
    let cfg = one_lap_config(3500);
    let mut ledger = RaceLedger::from_config(&cfg);
    let err = ledger
        .ingest("[10:00:00.000] 4 1\n[10:00:00.000] 10 2\n".as_bytes())
        .expect_err("competitor 2 has no open lap");
    assert!(err.is_malformed_event());
    assert!(err.to_string().contains("[10:00:00.000] 10 2"), "{err}");
}

#[test]
fn test_decode_then_apply_by_hand() {
    let mut ledger = RaceLedger::new(1, Duration::seconds(30));
    for line in ["[10:00:00.000] 4 7", "[10:00:10.000] 8 7", "[10:00:40.000] 9 7"] {
        ledger.apply(&decode_line(line).unwrap()).unwrap();
    }
    let ranked = rank(&ledger);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].standing, Standing::NotFinished);
    assert_eq!(ranked[0].record.penalty_loops[0].duration(), Some(Duration::seconds(30)));
}

fn finisher_log(finish_secs: &[u32]) -> String {
    let mut log = String::new();
    for (i, secs) in finish_secs.iter().enumerate() {
        let id = i + 1;
        log.push_str(&format!("[08:00:00.000] 4 {id}\n"));
        log.push_str(&format!(
            "[{:02}:{:02}:{:02}.000] 10 {id}\n",
            8 + secs / 3600,
            (secs / 60) % 60,
            secs % 60
        ));
    }
    log
}

proptest! {
    #[test]
    fn prop_finishers_rank_by_elapsed(finish_secs in prop::collection::vec(1u32..7200, 1..20)) {
        let mut ledger = RaceLedger::new(1, Duration::seconds(30));
        ledger.ingest(finisher_log(&finish_secs).as_bytes()).unwrap();

        let ranked = rank(&ledger);
        prop_assert_eq!(ranked.len(), finish_secs.len());
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].standing <= pair[1].standing);
            prop_assert!(pair[0].record.elapsed() <= pair[1].record.elapsed());
        }
    }

    #[test]
    fn prop_laps_never_exceed_lap_count(lap_count in 1usize..5, lap_ends in 0usize..8) {
        let mut ledger = RaceLedger::new(lap_count, Duration::seconds(30));
        ledger.apply(&decode_line("[08:00:00.000] 4 1").unwrap()).unwrap();
        for n in 0..lap_ends {
            let line = format!("[08:{:02}:00.000] 10 1", n + 1);
            let result = ledger.apply(&decode_line(&line).unwrap());
            prop_assert_eq!(result.is_err(), n >= lap_count);
            prop_assert!(ledger.get("1").unwrap().laps.len() <= lap_count);
        }
    }

    #[test]
    fn prop_tiers_are_ordered(
        flags in prop::collection::vec((any::<bool>(), any::<bool>(), 1u32..3600), 1..20)
    ) {
        let mut log = String::new();
        for (i, (late, quit, secs)) in flags.iter().enumerate() {
            let id = i + 1;
            log.push_str(&format!("[07:00:00.000] 2 {id} 08:00:00\n"));
            let start = if *late { "08:05:00.000" } else { "08:00:00.000" };
            log.push_str(&format!("[{start}] 4 {id}\n"));
            if *quit {
                log.push_str(&format!("[08:05:00.000] 11 {id} gave up\n"));
            } else {
                log.push_str(&format!(
                    "[{:02}:{:02}:{:02}.000] 10 {id}\n",
                    9 + secs / 3600,
                    (secs / 60) % 60,
                    secs % 60
                ));
            }
        }
        let mut ledger = RaceLedger::new(1, Duration::seconds(30));
        ledger.ingest(log.as_bytes()).unwrap();

        let tiers: Vec<u8> = rank(&ledger)
            .iter()
            .map(|r| match r.standing {
                Standing::NotStarted => 0,
                Standing::NotFinished => 1,
                Standing::Finished(_) => 2,
            })
            .collect();
        prop_assert!(tiers.windows(2).all(|w| w[0] <= w[1]));
    }
}
