use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::{Row, RowAccessor};
use serde::Deserialize;

use crate::rows::{OffBallRun, PhaseInterval, PlayerMatchMeta, PressingAction, TrackingSample};

// Tracking arrives in the vendor's nested per-frame shape: one JSON object
// per line with a player_data array. Everything else is flat JSON arrays,
// with Parquet alternatives for the event and roster tables.

#[derive(Debug, Deserialize)]
struct FrameRecord {
    frame: i64,
    #[serde(default)]
    timestamp: Option<f64>,
    period: u8,
    player_data: Vec<PlayerFrame>,
}

#[derive(Debug, Deserialize)]
struct PlayerFrame {
    player_id: Option<u32>,
    x: Option<f64>,
    y: Option<f64>,
    #[serde(default)]
    #[allow(dead_code)]
    is_detected: Option<bool>,
}

/// Flatten nested frame records to one sample per player per frame. Players
/// without an id or position in a frame simply have no sample there; the
/// preprocessor treats the resulting frame gap as masked.
pub fn parse_tracking_jsonl(raw: &str, match_id: &str, fps: u32) -> Result<Vec<TrackingSample>> {
    let mut out = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: FrameRecord = serde_json::from_str(line)
            .with_context(|| format!("match {match_id}: tracking line {}", line_no + 1))?;
        let timestamp_s = record
            .timestamp
            .unwrap_or(record.frame as f64 / fps as f64);
        for player in &record.player_data {
            let (Some(player_id), Some(x), Some(y)) = (player.player_id, player.x, player.y)
            else {
                continue;
            };
            out.push(TrackingSample {
                match_id: match_id.to_string(),
                player_id,
                period: record.period,
                frame: record.frame,
                timestamp_s,
                x,
                y,
            });
        }
    }
    Ok(out)
}

pub fn load_tracking_jsonl(path: &Path, match_id: &str, fps: u32) -> Result<Vec<TrackingSample>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read tracking {}", path.display()))?;
    parse_tracking_jsonl(&raw, match_id, fps)
        .with_context(|| format!("parse tracking {}", path.display()))
}

pub fn parse_phases_json(raw: &str) -> Result<Vec<PhaseInterval>> {
    serde_json::from_str(raw).context("parse phase intervals")
}

pub fn load_phases_json(path: &Path) -> Result<Vec<PhaseInterval>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read phases {}", path.display()))?;
    parse_phases_json(&raw).with_context(|| format!("parse phases {}", path.display()))
}

pub fn parse_runs_json(raw: &str) -> Result<Vec<OffBallRun>> {
    serde_json::from_str(raw).context("parse off-ball runs")
}

pub fn load_runs_json(path: &Path) -> Result<Vec<OffBallRun>> {
    let raw = fs::read_to_string(path).with_context(|| format!("read runs {}", path.display()))?;
    parse_runs_json(&raw).with_context(|| format!("parse runs {}", path.display()))
}

pub fn parse_pressing_json(raw: &str) -> Result<Vec<PressingAction>> {
    serde_json::from_str(raw).context("parse pressing actions")
}

pub fn load_pressing_json(path: &Path) -> Result<Vec<PressingAction>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read pressing {}", path.display()))?;
    parse_pressing_json(&raw).with_context(|| format!("parse pressing {}", path.display()))
}

pub fn parse_roster_json(raw: &str) -> Result<Vec<PlayerMatchMeta>> {
    serde_json::from_str(raw).context("parse roster")
}

pub fn load_roster_json(path: &Path) -> Result<Vec<PlayerMatchMeta>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read roster {}", path.display()))?;
    parse_roster_json(&raw).with_context(|| format!("parse roster {}", path.display()))
}

// Parquet column orders. Fixed by the upstream extraction jobs; a file that
// does not match is a schema violation and rejects the whole batch.
//
// roster:   match_id, player_id, player_name, team_id, team_name,
//           position_group, minutes_played
// runs:     event_id, match_id, player_id, period, frame, xthreat,
//           dangerous, speed_avg_kmh, opponents_overtaken, subtype
// pressing: event_id, match_id, player_id, period, frame, direct_regain,
//           indirect_regain, direct_disruption, indirect_disruption,
//           lead_to_shot, lead_to_goal, subtype

pub fn load_roster_parquet(path: &Path) -> Result<Vec<PlayerMatchMeta>> {
    let file =
        fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = SerializedFileReader::new(file)
        .with_context(|| format!("open parquet reader {}", path.display()))?;
    let iter = reader
        .get_row_iter(None)
        .with_context(|| format!("iterate roster rows {}", path.display()))?;

    let mut out = Vec::new();
    for (idx, row) in iter.enumerate() {
        let row = row.with_context(|| format!("decode roster row {idx}"))?;
        out.push(PlayerMatchMeta {
            match_id: req_string(&row, 0, idx, "match_id")?,
            player_id: req_i64(&row, 1, idx, "player_id")? as u32,
            player_name: req_string(&row, 2, idx, "player_name")?,
            team_id: req_i64(&row, 3, idx, "team_id")? as u32,
            team_name: req_string(&row, 4, idx, "team_name")?,
            position_group: opt_string(&row, 5),
            minutes_played: req_f64(&row, 6, idx, "minutes_played")?,
        });
    }
    Ok(out)
}

pub fn load_runs_parquet(path: &Path) -> Result<Vec<OffBallRun>> {
    let file =
        fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = SerializedFileReader::new(file)
        .with_context(|| format!("open parquet reader {}", path.display()))?;
    let iter = reader
        .get_row_iter(None)
        .with_context(|| format!("iterate run rows {}", path.display()))?;

    let mut out = Vec::new();
    for (idx, row) in iter.enumerate() {
        let row = row.with_context(|| format!("decode run row {idx}"))?;
        out.push(OffBallRun {
            event_id: req_string(&row, 0, idx, "event_id")?,
            match_id: req_string(&row, 1, idx, "match_id")?,
            player_id: req_i64(&row, 2, idx, "player_id")? as u32,
            period: req_i64(&row, 3, idx, "period")? as u8,
            frame: req_i64(&row, 4, idx, "frame")?,
            xthreat: req_f64(&row, 5, idx, "xthreat")?,
            dangerous: row.get_bool(6).unwrap_or(false),
            speed_avg_kmh: req_f64(&row, 7, idx, "speed_avg_kmh")?,
            opponents_overtaken: req_f64(&row, 8, idx, "opponents_overtaken")?,
            subtype: opt_string(&row, 9),
        });
    }
    Ok(out)
}

pub fn load_pressing_parquet(path: &Path) -> Result<Vec<PressingAction>> {
    let file =
        fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = SerializedFileReader::new(file)
        .with_context(|| format!("open parquet reader {}", path.display()))?;
    let iter = reader
        .get_row_iter(None)
        .with_context(|| format!("iterate pressing rows {}", path.display()))?;

    let mut out = Vec::new();
    for (idx, row) in iter.enumerate() {
        let row = row.with_context(|| format!("decode pressing row {idx}"))?;
        out.push(PressingAction {
            event_id: req_string(&row, 0, idx, "event_id")?,
            match_id: req_string(&row, 1, idx, "match_id")?,
            player_id: req_i64(&row, 2, idx, "player_id")? as u32,
            period: req_i64(&row, 3, idx, "period")? as u8,
            frame: req_i64(&row, 4, idx, "frame")?,
            direct_regain: row.get_bool(5).unwrap_or(false),
            indirect_regain: row.get_bool(6).unwrap_or(false),
            direct_disruption: row.get_bool(7).unwrap_or(false),
            indirect_disruption: row.get_bool(8).unwrap_or(false),
            lead_to_shot: row.get_bool(9).unwrap_or(false),
            lead_to_goal: row.get_bool(10).unwrap_or(false),
            subtype: opt_string(&row, 11),
        });
    }
    Ok(out)
}

fn req_string(row: &Row, col: usize, row_idx: usize, name: &str) -> Result<String> {
    row.get_string(col)
        .map(|s| s.to_string())
        .map_err(|err| anyhow!("row {row_idx}: required column {name}: {err}"))
}

fn opt_string(row: &Row, col: usize) -> Option<String> {
    row.get_string(col)
        .ok()
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
}

fn req_i64(row: &Row, col: usize, row_idx: usize, name: &str) -> Result<i64> {
    row.get_long(col)
        .or_else(|_| row.get_int(col).map(i64::from))
        .map_err(|err| anyhow!("row {row_idx}: required column {name}: {err}"))
}

fn req_f64(row: &Row, col: usize, row_idx: usize, name: &str) -> Result<f64> {
    row.get_double(col)
        .or_else(|_| row.get_float(col).map(f64::from))
        .map_err(|err| anyhow!("row {row_idx}: required column {name}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_lines_flatten_per_player() {
        let raw = concat!(
            r#"{"frame":0,"timestamp":0.0,"period":1,"player_data":[{"player_id":1,"x":10.0,"y":5.0},{"player_id":2,"x":40.0,"y":30.0}]}"#,
            "\n",
            r#"{"frame":1,"timestamp":0.1,"period":1,"player_data":[{"player_id":1,"x":10.2,"y":5.0},{"player_id":null,"x":1.0,"y":1.0}]}"#,
            "\n",
        );
        let samples = parse_tracking_jsonl(raw, "m1", 10).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].player_id, 1);
        assert_eq!(samples[1].player_id, 2);
        assert_eq!(samples[2].frame, 1);
        assert_eq!(samples[2].match_id, "m1");
    }

    #[test]
    fn missing_timestamp_falls_back_to_frame_clock() {
        let raw = r#"{"frame":25,"period":1,"player_data":[{"player_id":1,"x":0.0,"y":0.0}]}"#;
        let samples = parse_tracking_jsonl(raw, "m1", 10).unwrap();
        assert!((samples[0].timestamp_s - 2.5).abs() < 1e-12);
    }

    #[test]
    fn malformed_tracking_line_names_the_line() {
        let raw = "{\"frame\":0,\"period\":1,\"player_data\":[]}\nnot json\n";
        let err = parse_tracking_jsonl(raw, "m1", 10).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn missing_required_column_is_a_hard_failure() {
        // frame_end absent: the batch is rejected, not partially parsed.
        let raw = r#"[{"match_id":"m1","period":1,"frame_start":0}]"#;
        assert!(parse_phases_json(raw).is_err());
    }

    #[test]
    fn vendor_flags_default_when_absent() {
        let raw = r#"[{"event_id":"e1","match_id":"m1","player_id":3,"period":1,"frame":100,
            "xthreat":0.12,"speed_avg_kmh":22.0,"opponents_overtaken":1.0,"subtype":"run_ahead"}]"#;
        let runs = parse_runs_json(raw).unwrap();
        assert_eq!(runs.len(), 1);
        assert!(!runs[0].dangerous);
    }

    #[test]
    fn roster_rows_parse() {
        let raw = r#"[{"match_id":"m1","player_id":7,"player_name":"Alpha Seven",
            "team_id":100,"team_name":"Alpha","position_group":"Forward","minutes_played":90.0}]"#;
        let roster = parse_roster_json(raw).unwrap();
        assert_eq!(roster[0].player_id, 7);
        assert!((roster[0].minutes_played - 90.0).abs() < 1e-12);
    }
}
