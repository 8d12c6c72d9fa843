use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::pipeline::MatchInputs;
use crate::rows::{
    OffBallRun, PhaseInterval, PlayerMatchMeta, PressingAction, TrackingSample,
};

pub const HOME_TEAM_ID: u32 = 100;
pub const AWAY_TEAM_ID: u32 = 200;

const PITCH_X_M: f64 = 105.0;
const PITCH_Y_M: f64 = 68.0;

const IN_POSSESSION_PHASES: [&str; 7] = [
    "build_up",
    "progression",
    "create",
    "finish",
    "transition",
    "quick_break",
    "long_ball",
];
const OUT_OF_POSSESSION_PHASES: [&str; 3] = ["high_block", "medium_block", "low_block"];
const THIRDS: [&str; 3] = ["defensive_third", "middle_third", "attacking_third"];
const RUN_SUBTYPES: [&str; 4] = ["run_ahead", "run_behind", "run_wide", "overlap"];

/// Knobs for the generator. Seeded, so the same config always produces the
/// same match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub match_id: String,
    pub players_per_team: usize,
    pub periods: u8,
    pub period_frames: i64,
    pub fps: u32,
    pub sprints_per_player_period: usize,
    pub runs_per_player: usize,
    pub presses_per_player: usize,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            match_id: "synthetic-0001".to_string(),
            players_per_team: 11,
            periods: 2,
            period_frames: 3_000,
            fps: 10,
            sprints_per_player_period: 3,
            runs_per_player: 6,
            presses_per_player: 8,
            seed: 26,
        }
    }
}

impl SyntheticConfig {
    pub fn minutes_played(&self) -> f64 {
        (self.periods as i64 * self.period_frames) as f64 / self.fps as f64 / 60.0
    }
}

/// Generate a complete match batch: tracking with embedded sprint plateaus,
/// phase coverage with occasional unclassified gaps, vendor-style run and
/// pressing events, and a roster that includes one unused substitute per
/// team (zero minutes, no events).
pub fn generate_match(cfg: &SyntheticConfig) -> MatchInputs {
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut inputs = MatchInputs::default();

    let player_ids: Vec<(u32, u32)> = team_players(cfg);
    for &(player_id, _team) in &player_ids {
        for period in 1..=cfg.periods {
            generate_tracking(cfg, &mut rng, player_id, period, &mut inputs.tracking);
        }
        generate_runs(cfg, &mut rng, player_id, &mut inputs.runs);
        generate_pressing(cfg, &mut rng, player_id, &mut inputs.pressing);
    }

    for period in 1..=cfg.periods {
        generate_phases(cfg, &mut rng, period, &mut inputs.phases);
    }

    inputs.roster = generate_roster(cfg, &player_ids);
    inputs
}

fn team_players(cfg: &SyntheticConfig) -> Vec<(u32, u32)> {
    let mut out = Vec::with_capacity(cfg.players_per_team * 2);
    for i in 0..cfg.players_per_team as u32 {
        out.push((1 + i, HOME_TEAM_ID));
    }
    for i in 0..cfg.players_per_team as u32 {
        out.push((51 + i, AWAY_TEAM_ID));
    }
    out
}

fn period_frame_range(cfg: &SyntheticConfig, period: u8) -> (i64, i64) {
    let start = (period as i64 - 1) * cfg.period_frames;
    (start, start + cfg.period_frames)
}

fn generate_tracking(
    cfg: &SyntheticConfig,
    rng: &mut StdRng,
    player_id: u32,
    period: u8,
    out: &mut Vec<TrackingSample>,
) {
    let (frame_start, _) = period_frame_range(cfg, period);
    let n = cfg.period_frames as usize;

    // Speed profile: a jog with jitter, plus sprint plateaus long enough to
    // survive the detector's validation bands.
    let mut speeds = vec![0.0; n];
    let base = rng.gen_range(5.0..8.0);
    for s in speeds.iter_mut() {
        *s = base + rng.gen_range(-0.8..0.8);
    }
    for _ in 0..cfg.sprints_per_player_period {
        let duration = rng.gen_range(15..30usize);
        if n <= duration + 2 {
            break;
        }
        let start = rng.gen_range(1..n - duration - 1);
        let plateau = rng.gen_range(26.5..28.5);
        for s in &mut speeds[start..start + duration] {
            *s = plateau + rng.gen_range(-0.3..0.3);
        }
    }

    // Integrate into positions, reflecting off the pitch bounds.
    let mut x = rng.gen_range(10.0..PITCH_X_M - 10.0);
    let mut y = rng.gen_range(10.0..PITCH_Y_M - 10.0);
    let mut heading: f64 = rng.gen_range(0.0..std::f64::consts::TAU);

    for (i, speed_kmh) in speeds.iter().enumerate() {
        let frame = frame_start + i as i64;
        out.push(TrackingSample {
            match_id: cfg.match_id.clone(),
            player_id,
            period,
            frame,
            timestamp_s: frame as f64 / cfg.fps as f64,
            x,
            y,
        });

        heading += rng.gen_range(-0.15..0.15);
        let step = speed_kmh / 3.6 / cfg.fps as f64;
        x += heading.cos() * step;
        y += heading.sin() * step;
        if x < 0.0 || x > PITCH_X_M {
            x = x.clamp(0.0, PITCH_X_M);
            heading = std::f64::consts::PI - heading;
        }
        if y < 0.0 || y > PITCH_Y_M {
            y = y.clamp(0.0, PITCH_Y_M);
            heading = -heading;
        }
    }
}

fn generate_phases(
    cfg: &SyntheticConfig,
    rng: &mut StdRng,
    period: u8,
    out: &mut Vec<PhaseInterval>,
) {
    let (mut cursor, frame_end) = period_frame_range(cfg, period);
    while cursor < frame_end {
        let len = rng.gen_range(150..600i64).min(frame_end - cursor);
        // Roughly one interval in ten stays unclassified.
        if rng.gen_bool(0.1) {
            cursor += len;
            continue;
        }
        let team = if rng.gen_bool(0.5) {
            HOME_TEAM_ID
        } else {
            AWAY_TEAM_ID
        };
        let leads_to_shot = rng.gen_bool(0.15);
        out.push(PhaseInterval {
            match_id: cfg.match_id.clone(),
            period,
            frame_start: cursor,
            frame_end: cursor + len - 1,
            in_possession_phase: Some(
                IN_POSSESSION_PHASES[rng.gen_range(0..IN_POSSESSION_PHASES.len())].to_string(),
            ),
            out_of_possession_phase: Some(
                OUT_OF_POSSESSION_PHASES[rng.gen_range(0..OUT_OF_POSSESSION_PHASES.len())]
                    .to_string(),
            ),
            team_in_possession_id: Some(team),
            leads_to_shot,
            leads_to_goal: leads_to_shot && rng.gen_bool(0.2),
            third_end: Some(THIRDS[rng.gen_range(0..THIRDS.len())].to_string()),
        });
        cursor += len;
    }
}

fn generate_runs(
    cfg: &SyntheticConfig,
    rng: &mut StdRng,
    player_id: u32,
    out: &mut Vec<OffBallRun>,
) {
    for i in 0..cfg.runs_per_player {
        let period = rng.gen_range(1..=cfg.periods);
        let (frame_start, frame_end) = period_frame_range(cfg, period);
        let xthreat = rng.gen_range(0.0..0.25);
        out.push(OffBallRun {
            event_id: format!("run-{player_id}-{i}"),
            match_id: cfg.match_id.clone(),
            player_id,
            period,
            frame: rng.gen_range(frame_start..frame_end),
            xthreat,
            dangerous: xthreat > 0.12,
            speed_avg_kmh: rng.gen_range(18.0..30.0),
            opponents_overtaken: rng.gen_range(0..5) as f64,
            subtype: Some(RUN_SUBTYPES[rng.gen_range(0..RUN_SUBTYPES.len())].to_string()),
        });
    }
}

fn generate_pressing(
    cfg: &SyntheticConfig,
    rng: &mut StdRng,
    player_id: u32,
    out: &mut Vec<PressingAction>,
) {
    for i in 0..cfg.presses_per_player {
        let period = rng.gen_range(1..=cfg.periods);
        let (frame_start, frame_end) = period_frame_range(cfg, period);
        let direct_regain = rng.gen_bool(0.15);
        let lead_to_shot = rng.gen_bool(0.08);
        out.push(PressingAction {
            event_id: format!("press-{player_id}-{i}"),
            match_id: cfg.match_id.clone(),
            player_id,
            period,
            frame: rng.gen_range(frame_start..frame_end),
            direct_regain,
            indirect_regain: !direct_regain && rng.gen_bool(0.15),
            direct_disruption: rng.gen_bool(0.1),
            indirect_disruption: rng.gen_bool(0.1),
            lead_to_shot,
            lead_to_goal: lead_to_shot && rng.gen_bool(0.15),
            subtype: rng.gen_bool(0.25).then(|| "counter_press".to_string()),
        });
    }
}

fn generate_roster(cfg: &SyntheticConfig, player_ids: &[(u32, u32)]) -> Vec<PlayerMatchMeta> {
    let positions = ["Goalkeeper", "Defender", "Midfielder", "Forward"];
    let minutes = cfg.minutes_played();
    let mut roster: Vec<PlayerMatchMeta> = player_ids
        .iter()
        .enumerate()
        .map(|(idx, &(player_id, team_id))| PlayerMatchMeta {
            match_id: cfg.match_id.clone(),
            player_id,
            player_name: format!("{} {}", team_label(team_id), player_id),
            team_id,
            team_name: team_name(team_id).to_string(),
            position_group: Some(positions[idx % positions.len()].to_string()),
            minutes_played: minutes,
        })
        .collect();

    // Unused substitutes: on the team sheet with zero minutes and no events.
    for (player_id, team_id) in [(49, HOME_TEAM_ID), (99, AWAY_TEAM_ID)] {
        roster.push(PlayerMatchMeta {
            match_id: cfg.match_id.clone(),
            player_id,
            player_name: format!("{} {}", team_label(team_id), player_id),
            team_id,
            team_name: team_name(team_id).to_string(),
            position_group: Some("Substitute".to_string()),
            minutes_played: 0.0,
        });
    }
    roster
}

fn team_label(team_id: u32) -> &'static str {
    if team_id == HOME_TEAM_ID { "Alpha" } else { "Omega" }
}

fn team_name(team_id: u32) -> &'static str {
    if team_id == HOME_TEAM_ID {
        "Alpha FC"
    } else {
        "Omega SC"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic_for_a_seed() {
        let cfg = SyntheticConfig {
            players_per_team: 3,
            period_frames: 600,
            ..SyntheticConfig::default()
        };
        let a = generate_match(&cfg);
        let b = generate_match(&cfg);
        assert_eq!(
            serde_json::to_string(&a.tracking).unwrap(),
            serde_json::to_string(&b.tracking).unwrap()
        );
        assert_eq!(a.phases.len(), b.phases.len());
    }

    #[test]
    fn phases_never_overlap() {
        let cfg = SyntheticConfig::default();
        let inputs = generate_match(&cfg);
        assert!(crate::phase::PhaseIndex::build(inputs.phases).is_ok());
    }

    #[test]
    fn roster_includes_zero_minute_subs() {
        let cfg = SyntheticConfig::default();
        let inputs = generate_match(&cfg);
        let subs: Vec<_> = inputs
            .roster
            .iter()
            .filter(|m| m.minutes_played == 0.0)
            .collect();
        assert_eq!(subs.len(), 2);
        assert_eq!(inputs.roster.len(), cfg.players_per_team * 2 + 2);
    }

    #[test]
    fn tracking_frames_are_strictly_increasing_per_player_period() {
        let cfg = SyntheticConfig {
            players_per_team: 2,
            period_frames: 500,
            ..SyntheticConfig::default()
        };
        let inputs = generate_match(&cfg);
        let mut last: std::collections::HashMap<(u32, u8), i64> = std::collections::HashMap::new();
        for s in &inputs.tracking {
            if let Some(prev) = last.insert((s.player_id, s.period), s.frame) {
                assert!(s.frame > prev, "frames must increase per player/period");
            }
        }
    }
}
