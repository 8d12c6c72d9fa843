use std::fs;
use std::path::PathBuf;

use matchpulse::loaders;
use matchpulse::phase::PhaseIndex;
use matchpulse::pipeline::{EngineConfig, MatchInputs, run_match};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn read_fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).expect("fixture file should be readable")
}

fn demo_inputs() -> MatchInputs {
    MatchInputs {
        tracking: loaders::load_tracking_jsonl(&fixture_path("tracking_demo.jsonl"), "demo-1", 10)
            .expect("tracking fixture should parse"),
        phases: loaders::parse_phases_json(&read_fixture("phases_demo.json"))
            .expect("phases fixture should parse"),
        runs: loaders::parse_runs_json(&read_fixture("runs_demo.json"))
            .expect("runs fixture should parse"),
        pressing: loaders::parse_pressing_json(&read_fixture("pressing_demo.json"))
            .expect("pressing fixture should parse"),
        roster: loaders::parse_roster_json(&read_fixture("roster_demo.json"))
            .expect("roster fixture should parse"),
    }
}

#[test]
fn plateau_trace_yields_one_sprint_near_the_plateau() {
    let inputs = demo_inputs();
    let metrics = run_match(&inputs, &EngineConfig::default()).unwrap();

    let sprints: Vec<_> = metrics
        .sprint_events
        .iter()
        .filter(|ev| ev.player_id == 1)
        .collect();
    assert_eq!(sprints.len(), 1, "exactly one sprint expected: {sprints:?}");
    let ev = sprints[0];
    // Smoothing shaves the plateau edges; the event must still sit on it.
    assert!(
        (40..=60).contains(&ev.start_frame),
        "start {} not near 50",
        ev.start_frame
    );
    assert!(
        (90..=110).contains(&ev.end_frame),
        "end {} not near 100",
        ev.end_frame
    );

    // The jogging player produces nothing.
    assert!(!metrics.sprint_events.iter().any(|ev| ev.player_id == 2));
}

#[test]
fn demo_match_tables_line_up() {
    let inputs = demo_inputs();
    let metrics = run_match(&inputs, &EngineConfig::default()).unwrap();

    assert_eq!(metrics.combined.len(), 3);

    let p1 = &metrics.combined[0];
    assert_eq!(p1.player_id, 1);
    let sprint = p1.sprints.as_ref().expect("player 1 qualifies for sprints");
    assert_eq!(sprint.sprint_count, 1);
    assert!((sprint.sprints_per_90 - 1.0).abs() < 1e-12);
    // Mid frame falls in build_up with Alpha in possession: an attacking,
    // non-high-value sprint.
    assert!((sprint.attacking_sprint_pct - 1.0).abs() < 1e-12);
    assert!((sprint.high_value_sprint_pct - 0.0).abs() < 1e-12);

    let runs = p1.runs.as_ref().expect("player 1 qualifies for runs");
    assert_eq!(runs.run_count, 3);
    assert!((runs.avg_xthreat - 0.16).abs() < 1e-12);
    assert!((runs.dangerous_run_pct - 2.0 / 3.0).abs() < 1e-12);

    let pressing = p1.pressing.as_ref().expect("player 1 qualifies for pressing");
    assert_eq!(pressing.pressing_action_count, 4);
    assert_eq!(pressing.total_regain_count, 2);
    assert_eq!(pressing.counter_press_count, 1);
    // Frame 205 sits in the unclassified gap, so only three actions carry a
    // block label.
    assert_eq!(
        pressing.high_block_press_count
            + pressing.medium_block_press_count
            + pressing.low_block_press_count,
        3
    );

    // No events and no minutes respectively, but both rows survive.
    let p2 = &metrics.combined[1];
    assert!(p2.sprints.is_none());
    let p3 = &metrics.combined[2];
    assert_eq!(p3.minutes_played, 0.0);
    assert!(p3.runs.is_none());
}

#[test]
fn overlapping_phases_reject_the_batch() {
    let mut inputs = demo_inputs();
    inputs.phases = loaders::parse_phases_json(&read_fixture("phases_overlapping.json")).unwrap();
    let err = run_match(&inputs, &EngineConfig::default()).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("demo-1"), "error should name the match: {msg}");
    assert!(msg.contains("overlapping"), "unexpected error: {msg}");
}

#[test]
fn phase_gap_is_not_an_error() {
    let inputs = demo_inputs();
    let index = PhaseIndex::build(inputs.phases).unwrap();
    // Frames 200-219 are deliberately uncovered.
    let probe = matchpulse::rows::SprintEvent {
        match_id: "demo-1".to_string(),
        player_id: 1,
        period: 1,
        start_frame: 200,
        end_frame: 219,
        mid_frame: 210,
        duration_s: 2.0,
        distance_m: 15.0,
        avg_speed_kmh: 27.0,
        max_speed_kmh: 29.0,
    };
    assert!(index.lookup(&probe).is_none());
}

#[test]
fn roster_missing_required_column_fails_fast() {
    let err = loaders::parse_roster_json(&read_fixture("roster_missing_minutes.json")).unwrap_err();
    assert!(format!("{err:#}").contains("roster"));
}
