use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, PredictionError};
use crate::records::{Score, TeamStrengthRecord};
use crate::scaling::round_to;
use crate::scoregrid::ScoreGrid;
use crate::team_strength::{LeagueAverages, find_team};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Goals per team per match at an average fixture.
    pub league_avg_goals: f64,
    /// Multiplier on the home side's expected goals.
    pub home_advantage: f64,
    pub min_expected_goals: f64,
    pub max_expected_goals: f64,
    /// Grid covers 0..=max_goals per side.
    pub max_goals: u8,
    pub goals_line: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            league_avg_goals: 1.5,
            home_advantage: 1.2,
            min_expected_goals: 0.1,
            max_expected_goals: 5.0,
            max_goals: 5,
            goals_line: 2.5,
        }
    }
}

impl PredictorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |field: &'static str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be positive, got {v}"),
                })
            }
        };
        positive("predictor.league_avg_goals", self.league_avg_goals)?;
        positive("predictor.home_advantage", self.home_advantage)?;
        positive("predictor.min_expected_goals", self.min_expected_goals)?;
        positive("predictor.goals_line", self.goals_line)?;
        if !(self.max_expected_goals > self.min_expected_goals) {
            return Err(ConfigError::Invalid {
                field: "predictor.max_expected_goals",
                reason: format!(
                    "must exceed min_expected_goals ({}), got {}",
                    self.min_expected_goals, self.max_expected_goals
                ),
            });
        }
        if !(1..=15).contains(&self.max_goals) {
            return Err(ConfigError::Invalid {
                field: "predictor.max_goals",
                reason: format!("must be in 1..=15, got {}", self.max_goals),
            });
        }
        Ok(())
    }

    /// Same config with the league goal average taken from observed results.
    /// Left unchanged when there are no matches.
    pub fn calibrated_to(&self, league: &LeagueAverages) -> Self {
        let mut out = self.clone();
        if let Some(avg) = league.per_team().filter(|v| *v > 0.0) {
            out.league_avg_goals = avg;
        }
        out
    }

    /// Expected goals for each side, clamped to the configured band.
    pub fn expected_goals(
        &self,
        home: &TeamStrengthRecord,
        away: &TeamStrengthRecord,
    ) -> (f64, f64) {
        let h = home.att * away.def * self.league_avg_goals * self.home_advantage;
        let a = away.att * home.def * self.league_avg_goals;
        (
            clamp(h, self.min_expected_goals, self.max_expected_goals),
            clamp(a, self.min_expected_goals, self.max_expected_goals),
        )
    }
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    if v.is_nan() { lo } else { v.max(lo).min(hi) }
}

/// A side's strength as it went into a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamRating {
    pub att: f64,
    pub def: f64,
    pub max: f64,
}

impl From<&TeamStrengthRecord> for TeamRating {
    fn from(t: &TeamStrengthRecord) -> Self {
        Self {
            att: t.att,
            def: t.def,
            max: t.max,
        }
    }
}

/// Outcome probabilities for one fixture, all as fractions of 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub home_team: String,
    pub away_team: String,
    pub home_rating: TeamRating,
    pub away_rating: TeamRating,
    pub home_expected_goals: f64,
    pub away_expected_goals: f64,
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
    pub goals_line: f64,
    pub over: f64,
    pub under: f64,
    pub most_likely: Score,
    pub most_likely_prob: f64,
    pub grid: ScoreGrid,
}

impl Prediction {
    pub fn payload(&self) -> PredictionPayload {
        let pct = |p: f64| round_to(p * 100.0, 1);
        let size = self.grid.max_goals() as usize + 1;
        let matrix = (0..size)
            .map(|h| (0..size).map(|a| pct(self.grid[(h, a)])).collect())
            .collect();
        PredictionPayload {
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            home_rating: self.home_rating,
            away_rating: self.away_rating,
            home_expected_goals: round_to(self.home_expected_goals, 2),
            away_expected_goals: round_to(self.away_expected_goals, 2),
            home_win_pct: pct(self.home_win),
            draw_pct: pct(self.draw),
            away_win_pct: pct(self.away_win),
            goals_line: self.goals_line,
            over_pct: pct(self.over),
            under_pct: pct(self.under),
            most_likely_score: self.most_likely.to_string(),
            most_likely_pct: pct(self.most_likely_prob),
            matrix,
        }
    }
}

/// Wire form of a [`Prediction`]: percentages rounded to one decimal.
/// `matrix[h][a]` is the chance of an `h`-`a` final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionPayload {
    pub home_team: String,
    pub away_team: String,
    pub home_rating: TeamRating,
    pub away_rating: TeamRating,
    pub home_expected_goals: f64,
    pub away_expected_goals: f64,
    pub home_win_pct: f64,
    pub draw_pct: f64,
    pub away_win_pct: f64,
    pub goals_line: f64,
    pub over_pct: f64,
    pub under_pct: f64,
    pub most_likely_score: String,
    pub most_likely_pct: f64,
    pub matrix: Vec<Vec<f64>>,
}

/// Predict a fixture between two rated teams. Teams are assumed to score
/// independently.
pub fn predict_match(
    home: &TeamStrengthRecord,
    away: &TeamStrengthRecord,
    cfg: &PredictorConfig,
) -> Result<Prediction, PredictionError> {
    if home.team == away.team {
        return Err(PredictionError::IdenticalTeams {
            team: home.team.clone(),
        });
    }
    let degenerate = || PredictionError::Degenerate {
        home: home.team.clone(),
        away: away.team.clone(),
    };
    let inputs = [home.att, home.def, away.att, away.def];
    if inputs.iter().any(|v| !v.is_finite()) {
        return Err(degenerate());
    }

    let (home_xg, away_xg) = cfg.expected_goals(home, away);
    let mut grid = ScoreGrid::from_univariate_poisson(home_xg, away_xg, cfg.max_goals);
    if !grid.normalize() {
        return Err(degenerate());
    }

    let home_win = grid.gather_home_win();
    let draw = grid.gather_draw();
    let away_win = grid.gather_away_win();
    let over = grid.gather_goals_over(cfg.goals_line);
    let (most_likely, most_likely_prob) = grid.most_likely();
    debug!(
        home = %home.team,
        away = %away.team,
        home_xg,
        away_xg,
        home_win,
        draw,
        away_win,
        "match predicted"
    );

    Ok(Prediction {
        home_team: home.team.clone(),
        away_team: away.team.clone(),
        home_rating: TeamRating::from(home),
        away_rating: TeamRating::from(away),
        home_expected_goals: home_xg,
        away_expected_goals: away_xg,
        home_win,
        draw,
        away_win,
        goals_line: cfg.goals_line,
        over,
        under: 1.0 - over,
        most_likely,
        most_likely_prob,
        grid,
    })
}

/// Look both teams up by exact name and predict. Identical names are
/// rejected before lookup.
pub fn predict_by_name(
    teams: &[TeamStrengthRecord],
    home: &str,
    away: &str,
    cfg: &PredictorConfig,
) -> Result<Prediction, PredictionError> {
    if home == away {
        return Err(PredictionError::IdenticalTeams {
            team: home.to_string(),
        });
    }
    let lookup = |name: &str| {
        find_team(teams, name).ok_or_else(|| PredictionError::UnknownTeam {
            team: name.to_string(),
        })
    };
    predict_match(lookup(home)?, lookup(away)?, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_float_eq::*;

    fn team(name: &str, att: f64, def: f64) -> TeamStrengthRecord {
        TeamStrengthRecord {
            team: name.to_string(),
            conference: "Conf".to_string(),
            matches_played: 10,
            goals_for: 15,
            goals_against: 15,
            att,
            def,
            max: 50.0,
        }
    }

    #[test]
    fn expected_goals_follow_the_multiplicative_model() {
        let cfg = PredictorConfig::default();
        let (h, a) = cfg.expected_goals(&team("A", 1.5, 0.7), &team("B", 0.8, 1.3));
        assert_float_absolute_eq!(h, 3.51, 1e-9);
        assert_float_absolute_eq!(a, 0.84, 1e-9);
    }

    #[test]
    fn expected_goals_are_clamped() {
        let cfg = PredictorConfig::default();
        let (h, a) = cfg.expected_goals(&team("A", 9.0, 0.0), &team("B", 0.0, 9.0));
        assert_eq!(h, 5.0);
        assert_eq!(a, 0.1);
    }

    #[test]
    fn equal_teams_favor_home_side() {
        let cfg = PredictorConfig::default();
        let p = predict_match(&team("A", 1.0, 1.0), &team("B", 1.0, 1.0), &cfg).unwrap();
        assert!(p.home_win > p.away_win);
        assert_float_absolute_eq!(p.home_win + p.draw + p.away_win, 1.0, 1e-9);
        assert_float_absolute_eq!(p.over + p.under, 1.0, 1e-12);
    }

    #[test]
    fn payload_rounds_to_one_decimal() {
        let cfg = PredictorConfig::default();
        let p = predict_match(&team("A", 1.2, 0.9), &team("B", 0.9, 1.1), &cfg).unwrap();
        let payload = p.payload();
        for v in [payload.home_win_pct, payload.draw_pct, payload.away_win_pct] {
            assert_eq!(round_to(v, 1), v);
            assert!((0.0..=100.0).contains(&v));
        }
        assert_eq!(payload.most_likely_score, p.most_likely.to_string());
    }

    #[test]
    fn payload_carries_ratings_and_full_matrix() {
        let cfg = PredictorConfig::default();
        let p = predict_match(&team("A", 1.5, 0.7), &team("B", 0.8, 1.3), &cfg).unwrap();
        let payload = p.payload();
        assert_eq!(payload.home_rating, TeamRating { att: 1.5, def: 0.7, max: 50.0 });
        assert_eq!(payload.away_rating.def, 1.3);

        let size = cfg.max_goals as usize + 1;
        assert_eq!(payload.matrix.len(), size);
        assert!(payload.matrix.iter().all(|row| row.len() == size));
        for (h, row) in payload.matrix.iter().enumerate() {
            for (a, v) in row.iter().enumerate() {
                assert_eq!(*v, round_to(p.grid[(h, a)] * 100.0, 1));
            }
        }
        let (mh, ma) = (p.most_likely.home as usize, p.most_likely.away as usize);
        assert_eq!(payload.matrix[mh][ma], payload.most_likely_pct);
        let total: f64 = payload.matrix.iter().flatten().sum();
        assert!((total - 100.0).abs() < 0.05 * (size * size) as f64);

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("matrix").is_some());
        assert_eq!(json["home_rating"]["att"], 1.5);
        assert_eq!(json["away_rating"]["max"], 50.0);
    }

    #[test]
    fn calibration_uses_observed_average() {
        let league = LeagueAverages {
            matches: 10,
            home_goals: 1.8,
            away_goals: 1.2,
        };
        let cfg = PredictorConfig::default().calibrated_to(&league);
        assert_float_relative_eq!(cfg.league_avg_goals, 1.5);
        let cfg = PredictorConfig::default().calibrated_to(&LeagueAverages::default());
        assert_eq!(cfg.league_avg_goals, 1.5);
    }

    #[test]
    fn non_finite_strength_is_a_computation_failure() {
        let err = predict_match(
            &team("A", f64::NAN, 1.0),
            &team("B", 1.0, 1.0),
            &PredictorConfig::default(),
        )
        .unwrap_err();
        assert!(!err.is_input_validation());
    }

    #[test]
    fn config_validation() {
        assert!(PredictorConfig::default().validate().is_ok());
        let cfg = PredictorConfig {
            max_goals: 0,
            ..PredictorConfig::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = PredictorConfig {
            home_advantage: -1.0,
            ..PredictorConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
