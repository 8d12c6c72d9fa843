use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use matchpulse::export;
use matchpulse::loaders;
use matchpulse::pipeline::{self, EngineConfig, MatchInputs, run_match};
use matchpulse::rows::{OffBallRun, PlayerMatchMeta, PressingAction};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || has_flag(&args, "--help") {
        print_usage();
        return Ok(());
    }

    let match_id = arg_value(&args, "--match-id").context("--match-id is required")?;
    let tracking_path = arg_value(&args, "--tracking")
        .map(PathBuf::from)
        .context("--tracking is required")?;
    let roster_path = arg_value(&args, "--roster")
        .map(PathBuf::from)
        .context("--roster is required")?;
    let phases_path = arg_value(&args, "--phases").map(PathBuf::from);
    let runs_path = arg_value(&args, "--runs").map(PathBuf::from);
    let pressing_path = arg_value(&args, "--pressing").map(PathBuf::from);
    let out_dir = arg_value(&args, "--out-dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("out"));

    let cfg = resolve_config(&args)?;

    let inputs = MatchInputs {
        tracking: loaders::load_tracking_jsonl(&tracking_path, &match_id, cfg.signal.fps)?,
        phases: phases_path
            .map(|p| loaders::load_phases_json(&p))
            .transpose()?
            .unwrap_or_default(),
        runs: load_runs(runs_path.as_deref())?,
        pressing: load_pressing(pressing_path.as_deref())?,
        roster: load_roster(&roster_path)?,
    };
    if inputs.roster.is_empty() {
        bail!("match {match_id}: roster is empty, nothing to combine onto");
    }

    let metrics = run_match(&inputs, &cfg)
        .with_context(|| format!("compute metrics for match {match_id}"))?;

    let artifact_path = out_dir.join(format!("{match_id}_metrics.json"));
    let workbook_path = out_dir.join(format!("{match_id}_metrics.xlsx"));
    export::write_artifact(&artifact_path, &metrics)?;
    export::export_workbook(&workbook_path, &metrics)?;

    println!("Match metrics complete");
    println!("Match: {match_id}");
    println!("Tracking samples: {}", inputs.tracking.len());
    println!("Phase intervals: {}", inputs.phases.len());
    println!("Sprints detected: {}", metrics.sprint_events.len());
    println!(
        "Rows: {} sprint / {} run / {} pressing",
        metrics.sprint_rows.len(),
        metrics.run_rows.len(),
        metrics.pressing_rows.len()
    );
    println!("Combined rows: {}", metrics.combined.len());
    println!("Artifact: {}", artifact_path.display());
    println!("Workbook: {}", workbook_path.display());

    Ok(())
}

fn resolve_config(args: &[String]) -> Result<EngineConfig> {
    if let Some(path) = arg_value(args, "--config") {
        return pipeline::load_config(Path::new(&path));
    }
    if let Ok(path) = std::env::var("MATCHPULSE_CONFIG") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return pipeline::load_config(Path::new(trimmed));
        }
    }
    Ok(EngineConfig::default())
}

fn load_runs(path: Option<&Path>) -> Result<Vec<OffBallRun>> {
    match path {
        None => Ok(Vec::new()),
        Some(p) if is_parquet(p) => loaders::load_runs_parquet(p),
        Some(p) => loaders::load_runs_json(p),
    }
}

fn load_pressing(path: Option<&Path>) -> Result<Vec<PressingAction>> {
    match path {
        None => Ok(Vec::new()),
        Some(p) if is_parquet(p) => loaders::load_pressing_parquet(p),
        Some(p) => loaders::load_pressing_json(p),
    }
}

fn load_roster(path: &Path) -> Result<Vec<PlayerMatchMeta>> {
    if is_parquet(path) {
        loaders::load_roster_parquet(path)
    } else {
        loaders::load_roster_json(path)
    }
}

fn is_parquet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"))
}

fn arg_value(args: &[String], name: &str) -> Option<String> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&format!("{name}=")) {
            if !value.trim().is_empty() {
                return Some(value.trim().to_string());
            }
        }
        if arg == name {
            if let Some(next) = args.get(idx + 1) {
                if !next.trim().is_empty() {
                    return Some(next.trim().to_string());
                }
            }
        }
    }
    None
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|arg| arg == name)
}

fn print_usage() {
    println!("matchpulse - player-match metrics from tracking and event data");
    println!();
    println!("Usage:");
    println!("  matchpulse --match-id ID --tracking FILE --roster FILE [options]");
    println!();
    println!("Options:");
    println!("  --match-id ID       Match identifier stamped onto every row");
    println!("  --tracking FILE     Tracking frames (JSONL, vendor nested shape)");
    println!("  --roster FILE       Player-match roster (.json or .parquet)");
    println!("  --phases FILE       Phase-of-play intervals (.json)");
    println!("  --runs FILE         Off-ball run events (.json or .parquet)");
    println!("  --pressing FILE     Pressing actions (.json or .parquet)");
    println!("  --config FILE       Engine config (JSON); MATCHPULSE_CONFIG works too");
    println!("  --out-dir DIR       Output directory (default: out)");
}
