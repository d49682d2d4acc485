use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::records::Venue;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{position} weights sum to {sum:.3}, expected 1.0 ± 0.01")]
    WeightSum { position: &'static str, sum: f64 },

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Failures the prediction surface reports to its caller. Input validation
/// (`UnknownTeam`, `IdenticalTeams`) is kept apart from computation failures.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionError {
    #[error("team not found in strength table: {team}")]
    UnknownTeam { team: String },

    #[error("home and away team are the same: {team}")]
    IdenticalTeams { team: String },

    #[error("degenerate expected goals for {home} vs {away}")]
    Degenerate { home: String, away: String },
}

impl PredictionError {
    pub fn is_input_validation(&self) -> bool {
        matches!(
            self,
            PredictionError::UnknownTeam { .. } | PredictionError::IdenticalTeams { .. }
        )
    }
}

/// Recoverable problems met during a run. These never abort a batch; they are
/// collected into a [`RunReport`] and logged.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataIssue {
    #[error("data quality: {player}: {detail}")]
    DataQuality { player: String, detail: String },

    #[error("zero variance in {metric}, using fallback {fallback}")]
    DegenerateDistribution { metric: String, fallback: f64 },

    #[error("no team strength for {team} (player {player}), excluded")]
    MissingTeamStrength { player: String, team: String },

    #[error("{team} has no {venue} matches, {venue} contribution is zero")]
    InvalidMatchInput { team: String, venue: Venue },

    #[error("{table} table is empty")]
    EmptyInput { table: String },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub input_rows: usize,
    pub rated: usize,
    pub excluded_goalkeepers: usize,
    pub below_minutes_floor: usize,
    pub missing_team_strength: usize,
    pub issues: Vec<DataIssue>,
}

impl RunReport {
    pub fn push(&mut self, issue: DataIssue) {
        if let DataIssue::MissingTeamStrength { .. } = issue {
            self.missing_team_strength += 1;
        }
        self.issues.push(issue);
    }

    /// Fold in issues raised by an earlier stage, such as team strength
    /// estimation, so one report covers the whole run.
    pub fn absorb(&mut self, issues: impl IntoIterator<Item = DataIssue>) {
        for issue in issues {
            self.push(issue);
        }
    }

    pub fn count_where(&self, pred: impl Fn(&DataIssue) -> bool) -> usize {
        self.issues.iter().filter(|issue| pred(issue)).count()
    }

    pub fn data_quality_count(&self) -> usize {
        self.count_where(|i| matches!(i, DataIssue::DataQuality { .. }))
    }

    pub fn degenerate_count(&self) -> usize {
        self.count_where(|i| matches!(i, DataIssue::DegenerateDistribution { .. }))
    }
}
