use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ncaa_max::config::RatingConfig;
use ncaa_max::draft_analysis::{analyze_draft, parse_drafted};
use ncaa_max::error::{DataIssue, PredictionError, RunReport};
use ncaa_max::export::export_workbook;
use ncaa_max::player_ratings::{rate_players, top_by_position};
use ncaa_max::provider::{RatingsProvider, TableRatings};
use ncaa_max::records::{PlayerRating, Position, TeamStrengthRecord};
use ncaa_max::synthetic::{SeasonSpec, generate_season};
use ncaa_max::tables;
use ncaa_max::team_strength::{LeagueAverages, estimate_team_strength};
use ncaa_max::win_prob::PredictorConfig;

const USAGE: &str = "\
usage: ncaa_max <command> [options]

commands:
  rate     --players=<csv> (--matches=<csv> | --teams=<csv>)
           [--out=<csv>] [--xlsx=<path>] [--top=N]
  teams    --matches=<csv> [--out=<csv>] [--xlsx=<path>]
  predict  (--matches=<csv> | --teams=<csv>) --home=<team> --away=<team>
  draft    --players=<csv> (--matches=<csv> | --teams=<csv>) --drafted=<txt> [--top=N]
  demo     [--seed=N]

options:
  --config=<json>       rating config (default: $NCAA_MAX_CONFIG, else built-in)
  --derive-league-avg   take the predictor's league goal average from the match table
";

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = Args::from_env();
    let result = match args.command.as_deref() {
        Some("rate") => cmd_rate(&args),
        Some("teams") => cmd_teams(&args),
        Some("predict") => cmd_predict(&args),
        Some("draft") => cmd_draft(&args),
        Some("demo") => cmd_demo(&args),
        _ => {
            eprint!("{USAGE}");
            return ExitCode::from(64);
        }
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct Args {
    command: Option<String>,
    rest: Vec<String>,
}

impl Args {
    fn from_env() -> Self {
        let mut all = std::env::args().skip(1);
        let command = all.next();
        Self {
            command,
            rest: all.collect(),
        }
    }

    fn value(&self, name: &str) -> Option<String> {
        for (idx, arg) in self.rest.iter().enumerate() {
            if let Some(raw) = arg.strip_prefix(&format!("{name}="))
                && !raw.trim().is_empty()
            {
                return Some(raw.trim().to_string());
            }
            if arg == name
                && let Some(next) = self.rest.get(idx + 1)
                && !next.trim().is_empty()
            {
                return Some(next.trim().to_string());
            }
        }
        None
    }

    fn path(&self, name: &str) -> Option<PathBuf> {
        self.value(name).map(PathBuf::from)
    }

    fn require_path(&self, name: &str) -> Result<PathBuf> {
        self.path(name)
            .with_context(|| format!("missing {name}=<path>"))
    }

    fn parsed<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        self.value(name).and_then(|v| v.parse::<T>().ok())
    }

    fn has_flag(&self, name: &str) -> bool {
        self.rest.iter().any(|arg| arg == name)
    }
}

fn load_config(args: &Args) -> Result<RatingConfig> {
    match args.path("--config") {
        Some(path) => RatingConfig::load(&path).context("loading --config"),
        None => RatingConfig::from_env().context("loading config from environment"),
    }
}

struct TeamSource {
    teams: Vec<TeamStrengthRecord>,
    league: Option<LeagueAverages>,
    issues: Vec<DataIssue>,
}

/// Team strengths from a match table when given, else a precomputed table.
fn load_team_source(args: &Args, cfg: &RatingConfig) -> Result<TeamSource> {
    if let Some(path) = args.path("--matches") {
        let matches = tables::load_matches(&path)?;
        let run = estimate_team_strength(&matches, &cfg.strength);
        return Ok(TeamSource {
            teams: run.teams,
            league: Some(run.league),
            issues: run.issues,
        });
    }
    if let Some(path) = args.path("--teams") {
        return Ok(TeamSource {
            teams: tables::load_teams(&path)?,
            league: None,
            issues: Vec::new(),
        });
    }
    bail!("either --matches=<csv> or --teams=<csv> is required")
}

fn predictor_config(args: &Args, cfg: &RatingConfig, source: &TeamSource) -> PredictorConfig {
    match (&source.league, args.has_flag("--derive-league-avg")) {
        (Some(league), true) => cfg.predictor.calibrated_to(league),
        _ => cfg.predictor.clone(),
    }
}

fn cmd_rate(args: &Args) -> Result<ExitCode> {
    let cfg = load_config(args)?;
    let players = tables::load_players(&args.require_path("--players")?)?;
    let source = load_team_source(args, &cfg)?;
    let mut run = rate_players(&players, &source.teams, &cfg.rating_params()?);
    run.report.absorb(source.issues);

    let top = args.parsed::<usize>("--top").unwrap_or(25);
    print_players(&run.ratings[..top.min(run.ratings.len())]);

    if let Some(path) = args.path("--out") {
        tables::save_ratings(&path, &run.ratings)?;
        info!(path = %path.display(), rows = run.ratings.len(), "ratings written");
    }
    if let Some(path) = args.path("--xlsx") {
        export_workbook(&path, &run.ratings, &source.teams, Some(&run.report))?;
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_teams(args: &Args) -> Result<ExitCode> {
    let cfg = load_config(args)?;
    let matches = tables::load_matches(&args.require_path("--matches")?)?;
    let run = estimate_team_strength(&matches, &cfg.strength);
    print_teams(&run.teams);
    if let Some(path) = args.path("--out") {
        tables::save_teams(&path, &run.teams)?;
        info!(path = %path.display(), rows = run.teams.len(), "team table written");
    }
    if let Some(path) = args.path("--xlsx") {
        let mut report = RunReport::default();
        report.absorb(run.issues);
        export_workbook(&path, &[], &run.teams, Some(&report))?;
    }
    Ok(ExitCode::SUCCESS)
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    error: &'a PredictionError,
    message: String,
    input_validation: bool,
}

fn cmd_predict(args: &Args) -> Result<ExitCode> {
    let cfg = load_config(args)?;
    let home = args.value("--home").context("missing --home=<team>")?;
    let away = args.value("--away").context("missing --away=<team>")?;
    let source = load_team_source(args, &cfg)?;
    let predictor = predictor_config(args, &cfg, &source);
    let provider = TableRatings::new(Vec::new(), source.teams);

    match provider.predict(&home, &away, &predictor) {
        Ok(prediction) => {
            println!("{}", serde_json::to_string_pretty(&prediction.payload())?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            let payload = ErrorPayload {
                error: &err,
                message: err.to_string(),
                input_validation: err.is_input_validation(),
            };
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(if err.is_input_validation() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn cmd_draft(args: &Args) -> Result<ExitCode> {
    let cfg = load_config(args)?;
    let players = tables::load_players(&args.require_path("--players")?)?;
    let source = load_team_source(args, &cfg)?;
    let run = rate_players(&players, &source.teams, &cfg.rating_params()?);

    let drafted_path = args.require_path("--drafted")?;
    let raw = fs::read_to_string(&drafted_path)
        .with_context(|| format!("failed to read {}", drafted_path.display()))?;
    let drafted = parse_drafted(&raw);
    let report = analyze_draft(&run.ratings, &drafted, args.parsed("--top").unwrap_or(5));
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::SUCCESS)
}

fn cmd_demo(args: &Args) -> Result<ExitCode> {
    let cfg = load_config(args)?;
    let seed = args.parsed::<u64>("--seed").unwrap_or(2024);
    let season = generate_season(&SeasonSpec::default(), seed);
    info!(
        seed,
        players = season.players.len(),
        matches = season.matches.len(),
        "synthetic season generated"
    );

    let strength = estimate_team_strength(&season.matches, &cfg.strength);
    let run = rate_players(&season.players, &strength.teams, &cfg.rating_params()?);
    let source = TeamSource {
        teams: strength.teams,
        league: Some(strength.league),
        issues: strength.issues,
    };
    if !source.issues.is_empty() {
        info!(issues = source.issues.len(), "team strength issues");
    }

    println!("Top teams");
    print_teams(&source.teams[..source.teams.len().min(8)]);
    for position in Position::OUTFIELD {
        println!("\nTop {position}s");
        let best: Vec<PlayerRating> = top_by_position(&run.ratings, position, 5)
            .into_iter()
            .cloned()
            .collect();
        print_players(&best);
    }

    if let [first, second, ..] = source.teams.as_slice() {
        let predictor = predictor_config(args, &cfg, &source);
        let provider = TableRatings::from_run(run, source.teams.clone());
        let prediction = provider.predict(&second.team, &first.team, &predictor)?;
        println!("\n{}", serde_json::to_string_pretty(&prediction.payload())?);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_players(rows: &[PlayerRating]) {
    println!(
        "{:>4}  {:<30} {:<22} {:<11} {:>7} {:>8} {:>4}",
        "#", "Name", "Team", "Position", "Minutes", "Rating", "MAX"
    );
    for (idx, r) in rows.iter().enumerate() {
        println!(
            "{:>4}  {:<30} {:<22} {:<11} {:>7.0} {:>8.2} {:>4}",
            idx + 1,
            r.name,
            r.team,
            r.position,
            r.minutes,
            r.overall_rating,
            r.max
        );
    }
}

fn print_teams(rows: &[TeamStrengthRecord]) {
    println!(
        "{:>4}  {:<24} {:<18} {:>3} {:>4} {:>4} {:>6} {:>6} {:>6}",
        "#", "Team", "Conference", "MP", "GF", "GA", "ATT", "DEF", "MAX"
    );
    for (idx, t) in rows.iter().enumerate() {
        println!(
            "{:>4}  {:<24} {:<18} {:>3} {:>4} {:>4} {:>6.3} {:>6.3} {:>6.1}",
            idx + 1,
            t.team,
            t.conference,
            t.matches_played,
            t.goals_for,
            t.goals_against,
            t.att,
            t.def,
            t.max
        );
    }
}
