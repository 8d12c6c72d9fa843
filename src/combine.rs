use std::collections::HashMap;

use crate::rows::{
    PlayerMatchMeta, PlayerMatchRow, PressingMetricsRow, RunMetricsRow, SprintMetricsRow,
};

fn key(match_id: &str, player_id: u32) -> String {
    format!("{match_id}|{player_id}")
}

/// Outer-join the three family tables onto the roster. The roster drives the
/// iteration, so the output has exactly one row per roster entry: a player
/// with no qualifying events in a family gets None there instead of being
/// dropped.
pub fn combine_tables(
    roster: &[PlayerMatchMeta],
    sprints: Vec<SprintMetricsRow>,
    runs: Vec<RunMetricsRow>,
    pressing: Vec<PressingMetricsRow>,
) -> Vec<PlayerMatchRow> {
    let mut sprint_map: HashMap<String, SprintMetricsRow> = sprints
        .into_iter()
        .map(|row| (key(&row.match_id, row.player_id), row))
        .collect();
    let mut run_map: HashMap<String, RunMetricsRow> = runs
        .into_iter()
        .map(|row| (key(&row.match_id, row.player_id), row))
        .collect();
    let mut pressing_map: HashMap<String, PressingMetricsRow> = pressing
        .into_iter()
        .map(|row| (key(&row.match_id, row.player_id), row))
        .collect();

    roster
        .iter()
        .map(|meta| {
            let k = key(&meta.match_id, meta.player_id);
            PlayerMatchRow {
                match_id: meta.match_id.clone(),
                player_id: meta.player_id,
                player_name: meta.player_name.clone(),
                team_id: meta.team_id,
                team_name: meta.team_name.clone(),
                position_group: meta.position_group.clone(),
                minutes_played: meta.minutes_played,
                sprints: sprint_map.remove(&k),
                runs: run_map.remove(&k),
                pressing: pressing_map.remove(&k),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(player_id: u32, minutes: f64) -> PlayerMatchMeta {
        PlayerMatchMeta {
            match_id: "m1".to_string(),
            player_id,
            player_name: format!("P{player_id}"),
            team_id: 100,
            team_name: "Alpha".to_string(),
            position_group: None,
            minutes_played: minutes,
        }
    }

    fn sprint_row(player_id: u32) -> SprintMetricsRow {
        SprintMetricsRow {
            match_id: "m1".to_string(),
            player_id,
            minutes_played: 90.0,
            sprint_count: 5,
            sprints_per_90: 5.0,
            sprint_distance_m: 100.0,
            sprint_distance_per_90: 100.0,
            avg_sprint_speed_kmh: 27.0,
            max_sprint_speed_kmh: 30.0,
            high_value_sprint_pct: 0.4,
            attacking_sprint_pct: 0.6,
            defensive_sprint_pct: 0.4,
            shot_possession_pct: 0.2,
            goal_possession_pct: 0.0,
            attacking_third_pct: 0.4,
            high_value_sprints_per_90: 2.0,
        }
    }

    #[test]
    fn row_count_matches_roster_exactly() {
        let roster = vec![meta(1, 90.0), meta(2, 90.0), meta(3, 0.0)];
        let combined = combine_tables(&roster, vec![sprint_row(1)], Vec::new(), Vec::new());
        assert_eq!(combined.len(), roster.len());
        assert!(combined[0].sprints.is_some());
        assert!(combined[1].sprints.is_none());
        // Zero-minute player is present with empty families, not dropped.
        assert_eq!(combined[2].player_id, 3);
        assert!(combined[2].sprints.is_none());
        assert!(combined[2].runs.is_none());
        assert!(combined[2].pressing.is_none());
    }

    #[test]
    fn family_rows_without_roster_entry_are_ignored() {
        let roster = vec![meta(1, 90.0)];
        let combined = combine_tables(&roster, vec![sprint_row(99)], Vec::new(), Vec::new());
        assert_eq!(combined.len(), 1);
        assert!(combined[0].sprints.is_none());
    }
}
