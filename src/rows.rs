use serde::{Deserialize, Serialize};

/// One positional sample for one player. Frames are evenly spaced at the
/// tracking provider's fixed sampling rate and strictly increasing per
/// (match_id, player_id, period).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingSample {
    pub match_id: String,
    pub player_id: u32,
    pub period: u8,
    pub frame: i64,
    pub timestamp_s: f64,
    pub x: f64,
    pub y: f64,
}

/// A validated sprint. Immutable once emitted; never spans a period boundary
/// because detection runs per player/period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintEvent {
    pub match_id: String,
    pub player_id: u32,
    pub period: u8,
    pub start_frame: i64,
    pub end_frame: i64,
    pub mid_frame: i64,
    pub duration_s: f64,
    pub distance_m: f64,
    pub avg_speed_kmh: f64,
    pub max_speed_kmh: f64,
}

/// A phase-of-play segment. Intervals within one match/period are
/// non-overlapping; gaps between them are allowed and yield no match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseInterval {
    pub match_id: String,
    pub period: u8,
    pub frame_start: i64,
    pub frame_end: i64,
    pub in_possession_phase: Option<String>,
    pub out_of_possession_phase: Option<String>,
    pub team_in_possession_id: Option<u32>,
    #[serde(default)]
    pub leads_to_shot: bool,
    #[serde(default)]
    pub leads_to_goal: bool,
    pub third_end: Option<String>,
}

/// Tactical context copied onto an event from the phase interval containing
/// its representative frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseContext {
    pub in_possession_phase: Option<String>,
    pub out_of_possession_phase: Option<String>,
    pub team_in_possession_id: Option<u32>,
    pub leads_to_shot: bool,
    pub leads_to_goal: bool,
    pub third_end: Option<String>,
}

impl PhaseContext {
    pub fn from_interval(interval: &PhaseInterval) -> Self {
        Self {
            in_possession_phase: interval.in_possession_phase.clone(),
            out_of_possession_phase: interval.out_of_possession_phase.clone(),
            team_in_possession_id: interval.team_in_possession_id,
            leads_to_shot: interval.leads_to_shot,
            leads_to_goal: interval.leads_to_goal,
            third_end: interval.third_end.clone(),
        }
    }

    /// Whether the in-possession phase belongs to the supplied high-value set.
    /// The set is configuration and must be named explicitly by the caller.
    pub fn is_high_value(&self, high_value_phases: &[String]) -> bool {
        self.in_possession_phase
            .as_deref()
            .map(|p| high_value_phases.iter().any(|h| h.as_str() == p))
            .unwrap_or(false)
    }
}

/// Vendor-supplied off-ball run record. Value fields (xthreat, dangerous,
/// subtype) arrive already computed and are consumed as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffBallRun {
    pub event_id: String,
    pub match_id: String,
    pub player_id: u32,
    pub period: u8,
    pub frame: i64,
    pub xthreat: f64,
    #[serde(default)]
    pub dangerous: bool,
    pub speed_avg_kmh: f64,
    pub opponents_overtaken: f64,
    pub subtype: Option<String>,
}

/// Vendor-supplied pressing action with possession-outcome labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressingAction {
    pub event_id: String,
    pub match_id: String,
    pub player_id: u32,
    pub period: u8,
    pub frame: i64,
    #[serde(default)]
    pub direct_regain: bool,
    #[serde(default)]
    pub indirect_regain: bool,
    #[serde(default)]
    pub direct_disruption: bool,
    #[serde(default)]
    pub indirect_disruption: bool,
    #[serde(default)]
    pub lead_to_shot: bool,
    #[serde(default)]
    pub lead_to_goal: bool,
    pub subtype: Option<String>,
}

impl PressingAction {
    pub fn any_regain(&self) -> bool {
        self.direct_regain || self.indirect_regain
    }

    pub fn any_disruption(&self) -> bool {
        self.direct_disruption || self.indirect_disruption
    }

    pub fn successful(&self) -> bool {
        self.any_regain() || self.any_disruption()
    }
}

/// Roster metadata, one row per player-match. minutes_played comes from the
/// official team sheet, not from tracking coverage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerMatchMeta {
    pub match_id: String,
    pub player_id: u32,
    pub player_name: String,
    pub team_id: u32,
    pub team_name: String,
    pub position_group: Option<String>,
    pub minutes_played: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintMetricsRow {
    pub match_id: String,
    pub player_id: u32,
    pub minutes_played: f64,
    pub sprint_count: u32,
    pub sprints_per_90: f64,
    pub sprint_distance_m: f64,
    pub sprint_distance_per_90: f64,
    pub avg_sprint_speed_kmh: f64,
    pub max_sprint_speed_kmh: f64,
    pub high_value_sprint_pct: f64,
    pub attacking_sprint_pct: f64,
    pub defensive_sprint_pct: f64,
    pub shot_possession_pct: f64,
    pub goal_possession_pct: f64,
    pub attacking_third_pct: f64,
    pub high_value_sprints_per_90: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetricsRow {
    pub match_id: String,
    pub player_id: u32,
    pub minutes_played: f64,
    pub run_count: u32,
    pub runs_per_90: f64,
    pub avg_xthreat: f64,
    pub max_xthreat: f64,
    pub threat_per_90: f64,
    pub dangerous_run_pct: f64,
    pub dangerous_runs_per_90: f64,
    pub avg_run_speed_kmh: f64,
    pub avg_opponents_overtaken: f64,
    pub run_ahead_pct: f64,
    pub run_behind_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressingMetricsRow {
    pub match_id: String,
    pub player_id: u32,
    pub minutes_played: f64,
    pub pressing_action_count: u32,
    pub pressing_actions_per_90: f64,
    pub direct_regain_count: u32,
    pub indirect_regain_count: u32,
    pub total_regain_count: u32,
    pub regain_rate: f64,
    pub regains_per_90: f64,
    pub direct_disruption_count: u32,
    pub indirect_disruption_count: u32,
    pub total_disruption_count: u32,
    pub disruption_rate: f64,
    pub successful_press_count: u32,
    pub press_success_rate: f64,
    pub successful_presses_per_90: f64,
    pub presses_leading_to_shot: u32,
    pub presses_leading_to_goal: u32,
    pub shot_creation_rate: f64,
    pub high_block_press_count: u32,
    pub medium_block_press_count: u32,
    pub low_block_press_count: u32,
    pub counter_press_count: u32,
    pub counter_presses_per_90: f64,
}

/// Final wide row, one per roster entry. A family the player has no
/// qualifying events in stays None rather than dropping the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerMatchRow {
    pub match_id: String,
    pub player_id: u32,
    pub player_name: String,
    pub team_id: u32,
    pub team_name: String,
    pub position_group: Option<String>,
    pub minutes_played: f64,
    pub sprints: Option<SprintMetricsRow>,
    pub runs: Option<RunMetricsRow>,
    pub pressing: Option<PressingMetricsRow>,
}
