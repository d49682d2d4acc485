use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use ncaa_max::calibration;
use ncaa_max::config::RatingConfig;
use ncaa_max::tables;
use ncaa_max::team_strength::estimate_team_strength;

const DEFAULT_BINS: usize = 10;
const USAGE: &str =
    "usage: backtest --matches=<csv> [--teams=<csv>] [--bins=N] [--derive-league-avg]";

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let matches_path = parse_path_arg("--matches")
        .or_else(|| std::env::args().nth(1).filter(|a| !a.starts_with("--")).map(PathBuf::from))
        .context(USAGE)?;
    let cfg = RatingConfig::from_env()?;
    let bins = parse_usize_arg("--bins").unwrap_or(DEFAULT_BINS).clamp(2, 50);

    let matches = tables::load_matches(&matches_path)?;
    let strength = estimate_team_strength(&matches, &cfg.strength);
    // Without --teams the strengths come from the same matches: an in-sample check.
    let teams = match parse_path_arg("--teams") {
        Some(path) => tables::load_teams(&path)?,
        None => strength.teams,
    };
    let predictor = if has_flag("--derive-league-avg") {
        cfg.predictor.calibrated_to(&strength.league)
    } else {
        cfg.predictor.clone()
    };

    let report = calibration::backtest(&matches, &teams, &predictor, bins);

    println!("Samples:   {} (skipped {})", report.model.samples, report.skipped);
    println!(
        "Brier:     {:.4} (baseline {:.4})",
        report.model.brier, report.baseline.brier
    );
    println!(
        "Log loss:  {:.4} (baseline {:.4})",
        report.model.log_loss, report.baseline.log_loss
    );
    println!(
        "Accuracy:  {:.1}% (baseline {:.1}%)",
        report.model.accuracy * 100.0,
        report.baseline.accuracy * 100.0
    );
    println!("\nHome-win calibration");
    for bin in report.home_bins.iter().filter(|b| b.count > 0) {
        println!(
            "  {:>4.0}-{:<4.0}% n={:<5} predicted {:>5.1}% actual {:>5.1}%",
            bin.bucket_start * 100.0,
            bin.bucket_end * 100.0,
            bin.count,
            bin.avg_pred * 100.0,
            bin.actual_rate * 100.0
        );
    }

    Ok(())
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&format!("{name}=")) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(PathBuf::from(next));
        }
    }
    None
}

fn parse_usize_arg(name: &str) -> Option<usize> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && let Ok(v) = raw.trim().parse::<usize>()
        {
            return Some(v);
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && let Ok(v) = next.trim().parse::<usize>()
        {
            return Some(v);
        }
    }
    None
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
