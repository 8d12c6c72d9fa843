use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rust_xlsxwriter::{Workbook, Worksheet};
use serde::{Deserialize, Serialize};

use crate::pipeline::MatchMetrics;
use crate::rows::{PlayerMatchRow, PressingMetricsRow, RunMetricsRow, SprintMetricsRow};

pub const ARTIFACT_VERSION: u32 = 1;

/// Versioned envelope for the combined table. Downstream consumers key on
/// `version` staying stable for a given column set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsArtifact {
    pub version: u32,
    pub generated_at: String,
    pub rows: Vec<PlayerMatchRow>,
}

pub fn write_artifact(path: &Path, metrics: &MatchMetrics) -> Result<()> {
    let artifact = MetricsArtifact {
        version: ARTIFACT_VERSION,
        generated_at: Utc::now().to_rfc3339(),
        rows: metrics.combined.clone(),
    };
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let json = serde_json::to_string_pretty(&artifact).context("serialize metrics artifact")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}

pub fn load_artifact(path: &Path) -> Result<MetricsArtifact> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read artifact {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse artifact {}", path.display()))
}

/// One workbook: a headline Combined sheet plus the full column set per
/// family.
pub fn export_workbook(path: &Path, metrics: &MatchMetrics) -> Result<()> {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Combined")?;
        write_rows(sheet, &combined_rows(&metrics.combined))?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Sprints")?;
        write_rows(sheet, &sprint_rows(&metrics.sprint_rows))?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Runs")?;
        write_rows(sheet, &run_rows(&metrics.run_rows))?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Pressing")?;
        write_rows(sheet, &pressing_rows(&metrics.pressing_rows))?;
    }
    workbook
        .save(path)
        .with_context(|| format!("save workbook {}", path.display()))?;
    Ok(())
}

fn num(value: f64) -> String {
    format!("{value:.3}")
}

fn opt_num(value: Option<f64>) -> String {
    value.map(num).unwrap_or_default()
}

fn combined_rows(rows: &[PlayerMatchRow]) -> Vec<Vec<String>> {
    let mut out = vec![vec![
        "Match".to_string(),
        "Player ID".to_string(),
        "Player".to_string(),
        "Team".to_string(),
        "Position".to_string(),
        "Minutes".to_string(),
        "Sprints/90".to_string(),
        "Sprint Distance/90".to_string(),
        "Runs/90".to_string(),
        "Threat/90".to_string(),
        "Presses/90".to_string(),
        "Press Success %".to_string(),
    ]];
    for row in rows {
        out.push(vec![
            row.match_id.clone(),
            row.player_id.to_string(),
            row.player_name.clone(),
            row.team_name.clone(),
            row.position_group.clone().unwrap_or_default(),
            num(row.minutes_played),
            opt_num(row.sprints.as_ref().map(|s| s.sprints_per_90)),
            opt_num(row.sprints.as_ref().map(|s| s.sprint_distance_per_90)),
            opt_num(row.runs.as_ref().map(|r| r.runs_per_90)),
            opt_num(row.runs.as_ref().map(|r| r.threat_per_90)),
            opt_num(row.pressing.as_ref().map(|p| p.pressing_actions_per_90)),
            opt_num(row.pressing.as_ref().map(|p| p.press_success_rate)),
        ]);
    }
    out
}

fn sprint_rows(rows: &[SprintMetricsRow]) -> Vec<Vec<String>> {
    let mut out = vec![vec![
        "Match".to_string(),
        "Player ID".to_string(),
        "Minutes".to_string(),
        "Sprint Count".to_string(),
        "Sprints/90".to_string(),
        "Distance (m)".to_string(),
        "Distance/90".to_string(),
        "Avg Speed".to_string(),
        "Peak Speed".to_string(),
        "High Value %".to_string(),
        "Attacking %".to_string(),
        "Defensive %".to_string(),
        "Shot Possession %".to_string(),
        "Goal Possession %".to_string(),
        "Attacking Third %".to_string(),
        "High Value/90".to_string(),
    ]];
    for row in rows {
        out.push(vec![
            row.match_id.clone(),
            row.player_id.to_string(),
            num(row.minutes_played),
            row.sprint_count.to_string(),
            num(row.sprints_per_90),
            num(row.sprint_distance_m),
            num(row.sprint_distance_per_90),
            num(row.avg_sprint_speed_kmh),
            num(row.max_sprint_speed_kmh),
            num(row.high_value_sprint_pct),
            num(row.attacking_sprint_pct),
            num(row.defensive_sprint_pct),
            num(row.shot_possession_pct),
            num(row.goal_possession_pct),
            num(row.attacking_third_pct),
            num(row.high_value_sprints_per_90),
        ]);
    }
    out
}

fn run_rows(rows: &[RunMetricsRow]) -> Vec<Vec<String>> {
    let mut out = vec![vec![
        "Match".to_string(),
        "Player ID".to_string(),
        "Minutes".to_string(),
        "Run Count".to_string(),
        "Runs/90".to_string(),
        "Avg xThreat".to_string(),
        "Max xThreat".to_string(),
        "Threat/90".to_string(),
        "Dangerous %".to_string(),
        "Dangerous/90".to_string(),
        "Avg Speed".to_string(),
        "Avg Overtaken".to_string(),
        "Ahead %".to_string(),
        "Behind %".to_string(),
    ]];
    for row in rows {
        out.push(vec![
            row.match_id.clone(),
            row.player_id.to_string(),
            num(row.minutes_played),
            row.run_count.to_string(),
            num(row.runs_per_90),
            num(row.avg_xthreat),
            num(row.max_xthreat),
            num(row.threat_per_90),
            num(row.dangerous_run_pct),
            num(row.dangerous_runs_per_90),
            num(row.avg_run_speed_kmh),
            num(row.avg_opponents_overtaken),
            num(row.run_ahead_pct),
            num(row.run_behind_pct),
        ]);
    }
    out
}

fn pressing_rows(rows: &[PressingMetricsRow]) -> Vec<Vec<String>> {
    let mut out = vec![vec![
        "Match".to_string(),
        "Player ID".to_string(),
        "Minutes".to_string(),
        "Actions".to_string(),
        "Actions/90".to_string(),
        "Regains".to_string(),
        "Regain Rate".to_string(),
        "Regains/90".to_string(),
        "Disruptions".to_string(),
        "Disruption Rate".to_string(),
        "Successful".to_string(),
        "Success Rate".to_string(),
        "Successful/90".to_string(),
        "To Shot".to_string(),
        "To Goal".to_string(),
        "Shot Creation Rate".to_string(),
        "High Block".to_string(),
        "Medium Block".to_string(),
        "Low Block".to_string(),
        "Counter Presses".to_string(),
        "Counter/90".to_string(),
    ]];
    for row in rows {
        out.push(vec![
            row.match_id.clone(),
            row.player_id.to_string(),
            num(row.minutes_played),
            row.pressing_action_count.to_string(),
            num(row.pressing_actions_per_90),
            row.total_regain_count.to_string(),
            num(row.regain_rate),
            num(row.regains_per_90),
            row.total_disruption_count.to_string(),
            num(row.disruption_rate),
            row.successful_press_count.to_string(),
            num(row.press_success_rate),
            num(row.successful_presses_per_90),
            row.presses_leading_to_shot.to_string(),
            row.presses_leading_to_goal.to_string(),
            num(row.shot_creation_rate),
            row.high_block_press_count.to_string(),
            row.medium_block_press_count.to_string(),
            row.low_block_press_count.to_string(),
            row.counter_press_count.to_string(),
            num(row.counter_presses_per_90),
        ]);
    }
    out
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_sheet_blanks_missing_families() {
        let rows = vec![PlayerMatchRow {
            match_id: "m1".to_string(),
            player_id: 49,
            player_name: "Alpha 49".to_string(),
            team_id: 100,
            team_name: "Alpha FC".to_string(),
            position_group: Some("Substitute".to_string()),
            minutes_played: 0.0,
            sprints: None,
            runs: None,
            pressing: None,
        }];
        let sheet = combined_rows(&rows);
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet[1][6], "");
        assert_eq!(sheet[1][8], "");
        assert_eq!(sheet[1][10], "");
    }

    #[test]
    fn headers_and_rows_have_matching_widths() {
        let sheet = combined_rows(&[]);
        assert_eq!(sheet.len(), 1);
        for family in [
            sprint_rows(&[]).remove(0),
            run_rows(&[]).remove(0),
            pressing_rows(&[]).remove(0),
        ] {
            assert!(!family.is_empty());
        }
    }
}
