use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::combine::combine_tables;
use crate::metrics::{MetricsConfig, aggregate_pressing, aggregate_runs, aggregate_sprints};
use crate::phase::PhaseIndex;
use crate::rows::{
    OffBallRun, PhaseInterval, PlayerMatchMeta, PlayerMatchRow, PressingAction,
    PressingMetricsRow, RunMetricsRow, SprintEvent, SprintMetricsRow, TrackingSample,
};
use crate::signal::{SignalConfig, smooth_speed_signal};
use crate::sprint::{SprintConfig, detect_sprints};

/// Every tunable the engine has, in one immutable struct handed to each
/// stage. Nothing reads ambient state, so differently configured runs can
/// coexist in one process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub signal: SignalConfig,
    pub sprint: SprintConfig,
    pub metrics: MetricsConfig,
    /// In-possession phase types counted as high value by the sprint family.
    pub high_value_phases: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            signal: SignalConfig::default(),
            sprint: SprintConfig::default(),
            metrics: MetricsConfig::default(),
            high_value_phases: ["create", "finish", "quick_break", "transition"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read engine config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse engine config {}", path.display()))
}

pub fn save_config(cfg: &EngineConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(cfg).context("serialize engine config")?;
    fs::write(&tmp, json).context("write engine config")?;
    fs::rename(&tmp, path).context("swap engine config")?;
    Ok(())
}

/// Fully materialized inputs for one match batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchInputs {
    pub tracking: Vec<TrackingSample>,
    pub phases: Vec<PhaseInterval>,
    pub runs: Vec<OffBallRun>,
    pub pressing: Vec<PressingAction>,
    pub roster: Vec<PlayerMatchMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchMetrics {
    pub sprint_events: Vec<SprintEvent>,
    pub sprint_rows: Vec<SprintMetricsRow>,
    pub run_rows: Vec<RunMetricsRow>,
    pub pressing_rows: Vec<PressingMetricsRow>,
    pub combined: Vec<PlayerMatchRow>,
}

/// Run the full pipeline for one match batch. Pure function of its inputs:
/// re-running on identical inputs produces identical output, so a caller can
/// abandon and retry a match wholesale.
pub fn run_match(inputs: &MatchInputs, cfg: &EngineConfig) -> Result<MatchMetrics> {
    let index = PhaseIndex::build(inputs.phases.clone())?;

    let sprint_events = detect_all_sprints(&inputs.tracking, cfg);
    info!(
        "detected {} sprints from {} tracking samples",
        sprint_events.len(),
        inputs.tracking.len()
    );

    let enriched_sprints = index.enrich(sprint_events.clone());
    let enriched_runs = index.enrich(inputs.runs.clone());
    let enriched_pressing = index.enrich(inputs.pressing.clone());

    let sprint_rows = aggregate_sprints(
        &enriched_sprints,
        &inputs.roster,
        &cfg.high_value_phases,
        &cfg.metrics,
    );
    let run_rows = aggregate_runs(&enriched_runs, &inputs.roster, &cfg.metrics);
    let pressing_rows = aggregate_pressing(&enriched_pressing, &inputs.roster, &cfg.metrics);
    info!(
        "aggregated rows: {} sprint, {} run, {} pressing for {} roster entries",
        sprint_rows.len(),
        run_rows.len(),
        pressing_rows.len(),
        inputs.roster.len()
    );

    let combined = combine_tables(
        &inputs.roster,
        sprint_rows.clone(),
        run_rows.clone(),
        pressing_rows.clone(),
    );
    if combined.len() != inputs.roster.len() {
        bail!(
            "combined table has {} rows for {} roster entries",
            combined.len(),
            inputs.roster.len()
        );
    }

    Ok(MatchMetrics {
        sprint_events,
        sprint_rows,
        run_rows,
        pressing_rows,
        combined,
    })
}

/// Smooth and scan every player/period in parallel. Groups are independent,
/// so the fan-out carries no shared state; results are re-sorted afterwards
/// to keep output order (and serialized artifacts) stable.
pub fn detect_all_sprints(tracking: &[TrackingSample], cfg: &EngineConfig) -> Vec<SprintEvent> {
    let mut groups: HashMap<(u32, u8), Vec<TrackingSample>> = HashMap::new();
    for sample in tracking {
        groups
            .entry((sample.player_id, sample.period))
            .or_default()
            .push(sample.clone());
    }

    let mut keyed: Vec<((u32, u8), Vec<TrackingSample>)> = groups.into_iter().collect();
    keyed.sort_by_key(|(key, _)| *key);
    for (_, samples) in keyed.iter_mut() {
        samples.sort_by_key(|s| s.frame);
    }

    let mut events: Vec<SprintEvent> = keyed
        .par_iter()
        .flat_map(|((player_id, period), samples)| {
            let Some(speeds) = smooth_speed_signal(samples, &cfg.signal) else {
                debug!("player {player_id} period {period}: span too short, skipped");
                return Vec::new();
            };
            detect_sprints(samples, &speeds, &cfg.sprint, cfg.signal.fps)
        })
        .collect();

    events.sort_by(|a, b| {
        a.match_id
            .cmp(&b.match_id)
            .then(a.player_id.cmp(&b.player_id))
            .then(a.period.cmp(&b.period))
            .then(a.start_frame.cmp(&b.start_frame))
    });
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_through_json() {
        let cfg = EngineConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sprint.threshold_kmh, cfg.sprint.threshold_kmh);
        assert_eq!(back.high_value_phases, cfg.high_value_phases);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"sprint":{"threshold_kmh":25.5}}"#).unwrap();
        assert_eq!(cfg.sprint.threshold_kmh, 25.5);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.sprint.gap_tolerance_frames, 2);
        assert_eq!(cfg.signal.fps, 10);
        assert!(!cfg.high_value_phases.is_empty());
    }

    #[test]
    fn empty_inputs_produce_empty_tables() {
        let metrics = run_match(&MatchInputs::default(), &EngineConfig::default()).unwrap();
        assert!(metrics.sprint_events.is_empty());
        assert!(metrics.combined.is_empty());
    }
}
