use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::phase::Enriched;
use crate::rows::{
    OffBallRun, PlayerMatchMeta, PressingAction, PressingMetricsRow, RunMetricsRow, SprintEvent,
    SprintMetricsRow,
};

/// Minimum-sample filters per family. A player with a few minutes of
/// garbage-time exposure must not surface with an inflated per-90 rate from
/// one lucky event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub min_minutes_sprints: f64,
    pub min_minutes_runs: f64,
    pub min_runs: u32,
    pub min_minutes_pressing: f64,
    pub min_pressing_actions: u32,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            min_minutes_sprints: 30.0,
            min_minutes_runs: 10.0,
            min_runs: 3,
            min_minutes_pressing: 30.0,
            min_pressing_actions: 3,
        }
    }
}

pub fn per_90(raw: f64, minutes_played: f64) -> f64 {
    raw * 90.0 / minutes_played
}

/// Proportion of a 0/1 indicator. Zero denominator means no qualifying
/// events, reported as 0.0.
fn ratio(num: u32, den: u32) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn key(match_id: &str, player_id: u32) -> String {
    format!("{match_id}|{player_id}")
}

pub fn roster_by_key(roster: &[PlayerMatchMeta]) -> HashMap<String, &PlayerMatchMeta> {
    roster
        .iter()
        .map(|meta| (key(&meta.match_id, meta.player_id), meta))
        .collect()
}

/// Shared join/guard step: resolve the group's playing time from the roster.
/// Missing roster rows and zero/negative minutes exclude the player from
/// per-90 output entirely instead of dividing by a small number.
fn minutes_for(roster: &HashMap<String, &PlayerMatchMeta>, group_key: &str) -> Option<f64> {
    let Some(meta) = roster.get(group_key) else {
        debug!("no roster row for {group_key}, skipping per-90 metrics");
        return None;
    };
    if meta.minutes_played <= 0.0 {
        debug!(
            "player {} in match {} has no recorded minutes, skipping per-90 metrics",
            meta.player_id, meta.match_id
        );
        return None;
    }
    Some(meta.minutes_played)
}

#[derive(Default)]
struct SprintAcc {
    match_id: String,
    player_id: u32,
    count: u32,
    distance_sum: f64,
    avg_speed_sum: f64,
    peak_speed_sum: f64,
    // Phase-conditioned indicators count only events with a phase match.
    phased: u32,
    high_value: u32,
    shot: u32,
    goal: u32,
    attacking_third: u32,
    // Attacking/defensive need a known possession team as well.
    possession_known: u32,
    attacking: u32,
}

/// Roll enriched sprints up to one row per (match, player), normalized to a
/// 90-minute basis and filtered by minimum minutes.
pub fn aggregate_sprints(
    events: &[Enriched<SprintEvent>],
    roster: &[PlayerMatchMeta],
    high_value_phases: &[String],
    cfg: &MetricsConfig,
) -> Vec<SprintMetricsRow> {
    let roster_map = roster_by_key(roster);
    let mut groups: HashMap<String, SprintAcc> = HashMap::new();

    for enriched in events {
        let sprint = &enriched.event;
        let group_key = key(&sprint.match_id, sprint.player_id);
        let acc = groups.entry(group_key.clone()).or_insert_with(|| SprintAcc {
            match_id: sprint.match_id.clone(),
            player_id: sprint.player_id,
            ..SprintAcc::default()
        });
        acc.count += 1;
        acc.distance_sum += sprint.distance_m;
        acc.avg_speed_sum += sprint.avg_speed_kmh;
        acc.peak_speed_sum += sprint.max_speed_kmh;

        let Some(phase) = &enriched.phase else {
            continue;
        };
        acc.phased += 1;
        if phase.is_high_value(high_value_phases) {
            acc.high_value += 1;
        }
        if phase.leads_to_shot {
            acc.shot += 1;
        }
        if phase.leads_to_goal {
            acc.goal += 1;
        }
        if phase.third_end.as_deref() == Some("attacking_third") {
            acc.attacking_third += 1;
        }
        if let Some(possession_team) = phase.team_in_possession_id {
            if let Some(meta) = roster_map.get(&group_key) {
                acc.possession_known += 1;
                if meta.team_id == possession_team {
                    acc.attacking += 1;
                }
            }
        }
    }

    let mut rows: Vec<SprintMetricsRow> = groups
        .into_iter()
        .filter_map(|(group_key, acc)| {
            let minutes = minutes_for(&roster_map, &group_key)?;
            if minutes < cfg.min_minutes_sprints {
                return None;
            }
            let sprints_per_90 = per_90(acc.count as f64, minutes);
            let high_value_sprint_pct = ratio(acc.high_value, acc.phased);
            Some(SprintMetricsRow {
                match_id: acc.match_id,
                player_id: acc.player_id,
                minutes_played: minutes,
                sprint_count: acc.count,
                sprints_per_90,
                sprint_distance_m: acc.distance_sum,
                sprint_distance_per_90: per_90(acc.distance_sum, minutes),
                avg_sprint_speed_kmh: acc.avg_speed_sum / acc.count as f64,
                max_sprint_speed_kmh: acc.peak_speed_sum / acc.count as f64,
                high_value_sprint_pct,
                attacking_sprint_pct: ratio(acc.attacking, acc.possession_known),
                defensive_sprint_pct: ratio(
                    acc.possession_known - acc.attacking,
                    acc.possession_known,
                ),
                shot_possession_pct: ratio(acc.shot, acc.phased),
                goal_possession_pct: ratio(acc.goal, acc.phased),
                attacking_third_pct: ratio(acc.attacking_third, acc.phased),
                // Composite: independent rate times independent proportion,
                // never a ratio of two per-90 figures.
                high_value_sprints_per_90: sprints_per_90 * high_value_sprint_pct,
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        a.match_id
            .cmp(&b.match_id)
            .then(a.player_id.cmp(&b.player_id))
    });
    rows
}

#[derive(Default)]
struct RunAcc {
    match_id: String,
    player_id: u32,
    count: u32,
    xthreat_sum: f64,
    xthreat_max: f64,
    dangerous: u32,
    speed_sum: f64,
    overtaken_sum: f64,
    ahead: u32,
    behind: u32,
}

/// Off-ball run volume and threat quality per (match, player). Phase context
/// stays at event level for this family; nothing here conditions on it.
pub fn aggregate_runs(
    events: &[Enriched<OffBallRun>],
    roster: &[PlayerMatchMeta],
    cfg: &MetricsConfig,
) -> Vec<RunMetricsRow> {
    let roster_map = roster_by_key(roster);
    let mut groups: HashMap<String, RunAcc> = HashMap::new();

    for enriched in events {
        let run = &enriched.event;
        let acc = groups
            .entry(key(&run.match_id, run.player_id))
            .or_insert_with(|| RunAcc {
                match_id: run.match_id.clone(),
                player_id: run.player_id,
                ..RunAcc::default()
            });
        acc.count += 1;
        acc.xthreat_sum += run.xthreat;
        acc.xthreat_max = acc.xthreat_max.max(run.xthreat);
        if run.dangerous {
            acc.dangerous += 1;
        }
        acc.speed_sum += run.speed_avg_kmh;
        acc.overtaken_sum += run.opponents_overtaken;
        match run.subtype.as_deref() {
            Some("run_ahead") => acc.ahead += 1,
            Some("run_behind") => acc.behind += 1,
            _ => {}
        }
    }

    let mut rows: Vec<RunMetricsRow> = groups
        .into_iter()
        .filter_map(|(group_key, acc)| {
            let minutes = minutes_for(&roster_map, &group_key)?;
            if minutes < cfg.min_minutes_runs || acc.count < cfg.min_runs {
                return None;
            }
            let runs_per_90 = per_90(acc.count as f64, minutes);
            let avg_xthreat = acc.xthreat_sum / acc.count as f64;
            let dangerous_run_pct = ratio(acc.dangerous, acc.count);
            Some(RunMetricsRow {
                match_id: acc.match_id,
                player_id: acc.player_id,
                minutes_played: minutes,
                run_count: acc.count,
                runs_per_90,
                avg_xthreat,
                max_xthreat: acc.xthreat_max,
                threat_per_90: runs_per_90 * avg_xthreat,
                dangerous_run_pct,
                dangerous_runs_per_90: runs_per_90 * dangerous_run_pct,
                avg_run_speed_kmh: acc.speed_sum / acc.count as f64,
                avg_opponents_overtaken: acc.overtaken_sum / acc.count as f64,
                run_ahead_pct: ratio(acc.ahead, acc.count),
                run_behind_pct: ratio(acc.behind, acc.count),
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        a.match_id
            .cmp(&b.match_id)
            .then(a.player_id.cmp(&b.player_id))
    });
    rows
}

#[derive(Default)]
struct PressingAcc {
    match_id: String,
    player_id: u32,
    count: u32,
    direct_regain: u32,
    indirect_regain: u32,
    any_regain: u32,
    direct_disruption: u32,
    indirect_disruption: u32,
    any_disruption: u32,
    successful: u32,
    shot: u32,
    goal: u32,
    high_block: u32,
    medium_block: u32,
    low_block: u32,
    counter_press: u32,
}

/// Pressing volume, regain/disruption outcomes, and block-height breakdown
/// per (match, player). Block height comes from the enriched phase's
/// out-of-possession type; uncovered events simply do not count toward it.
pub fn aggregate_pressing(
    events: &[Enriched<PressingAction>],
    roster: &[PlayerMatchMeta],
    cfg: &MetricsConfig,
) -> Vec<PressingMetricsRow> {
    let roster_map = roster_by_key(roster);
    let mut groups: HashMap<String, PressingAcc> = HashMap::new();

    for enriched in events {
        let action = &enriched.event;
        let acc = groups
            .entry(key(&action.match_id, action.player_id))
            .or_insert_with(|| PressingAcc {
                match_id: action.match_id.clone(),
                player_id: action.player_id,
                ..PressingAcc::default()
            });
        acc.count += 1;
        if action.direct_regain {
            acc.direct_regain += 1;
        }
        if action.indirect_regain {
            acc.indirect_regain += 1;
        }
        if action.any_regain() {
            acc.any_regain += 1;
        }
        if action.direct_disruption {
            acc.direct_disruption += 1;
        }
        if action.indirect_disruption {
            acc.indirect_disruption += 1;
        }
        if action.any_disruption() {
            acc.any_disruption += 1;
        }
        if action.successful() {
            acc.successful += 1;
        }
        if action.lead_to_shot {
            acc.shot += 1;
        }
        if action.lead_to_goal {
            acc.goal += 1;
        }
        if action.subtype.as_deref() == Some("counter_press") {
            acc.counter_press += 1;
        }
        let block = enriched
            .phase
            .as_ref()
            .and_then(|p| p.out_of_possession_phase.as_deref());
        match block {
            Some("high_block") => acc.high_block += 1,
            Some("medium_block") => acc.medium_block += 1,
            Some("low_block") => acc.low_block += 1,
            _ => {}
        }
    }

    let mut rows: Vec<PressingMetricsRow> = groups
        .into_iter()
        .filter_map(|(group_key, acc)| {
            let minutes = minutes_for(&roster_map, &group_key)?;
            if minutes < cfg.min_minutes_pressing || acc.count < cfg.min_pressing_actions {
                return None;
            }
            Some(PressingMetricsRow {
                match_id: acc.match_id,
                player_id: acc.player_id,
                minutes_played: minutes,
                pressing_action_count: acc.count,
                pressing_actions_per_90: per_90(acc.count as f64, minutes),
                direct_regain_count: acc.direct_regain,
                indirect_regain_count: acc.indirect_regain,
                total_regain_count: acc.any_regain,
                regain_rate: ratio(acc.any_regain, acc.count),
                regains_per_90: per_90(acc.any_regain as f64, minutes),
                direct_disruption_count: acc.direct_disruption,
                indirect_disruption_count: acc.indirect_disruption,
                total_disruption_count: acc.any_disruption,
                disruption_rate: ratio(acc.any_disruption, acc.count),
                successful_press_count: acc.successful,
                press_success_rate: ratio(acc.successful, acc.count),
                successful_presses_per_90: per_90(acc.successful as f64, minutes),
                presses_leading_to_shot: acc.shot,
                presses_leading_to_goal: acc.goal,
                shot_creation_rate: ratio(acc.shot, acc.count),
                high_block_press_count: acc.high_block,
                medium_block_press_count: acc.medium_block,
                low_block_press_count: acc.low_block,
                counter_press_count: acc.counter_press,
                counter_presses_per_90: per_90(acc.counter_press as f64, minutes),
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        a.match_id
            .cmp(&b.match_id)
            .then(a.player_id.cmp(&b.player_id))
    });
    rows
}
