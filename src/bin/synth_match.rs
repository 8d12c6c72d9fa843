use std::path::PathBuf;

use anyhow::Result;

use matchpulse::export;
use matchpulse::pipeline::{EngineConfig, run_match};
use matchpulse::synthetic::{SyntheticConfig, generate_match};

/// Generate a seeded synthetic match and run the full pipeline over it.
/// Useful as a smoke test when no vendor data is at hand.
fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let seed = arg_value(&args, "--seed")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(26);
    let out_dir = arg_value(&args, "--out-dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("out"));

    let synth = SyntheticConfig {
        seed,
        ..SyntheticConfig::default()
    };
    let inputs = generate_match(&synth);
    let metrics = run_match(&inputs, &EngineConfig::default())?;

    let artifact_path = out_dir.join(format!("{}_metrics.json", synth.match_id));
    let workbook_path = out_dir.join(format!("{}_metrics.xlsx", synth.match_id));
    export::write_artifact(&artifact_path, &metrics)?;
    export::export_workbook(&workbook_path, &metrics)?;

    println!("Synthetic match complete");
    println!("Match: {} (seed {seed})", synth.match_id);
    println!("Tracking samples: {}", inputs.tracking.len());
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
