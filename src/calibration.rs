use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::records::{MatchRecord, TeamStrengthRecord};
use crate::win_prob::{Prediction, PredictorConfig, predict_by_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prob3 {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationBin {
    pub bucket_start: f64,
    pub bucket_end: f64,
    pub count: usize,
    pub avg_pred: f64,
    pub actual_rate: f64,
}

impl Prob3 {
    pub fn uniform() -> Self {
        Self {
            home: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away: 1.0 / 3.0,
        }
    }

    fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }
}

impl From<&Prediction> for Prob3 {
    fn from(p: &Prediction) -> Self {
        Self {
            home: p.home_win,
            draw: p.draw,
            away: p.away_win,
        }
    }
}

pub fn classify_outcome(home_goals: u32, away_goals: u32) -> Outcome {
    if home_goals > away_goals {
        Outcome::Home
    } else if home_goals < away_goals {
        Outcome::Away
    } else {
        Outcome::Draw
    }
}

/// Observed outcome frequencies, the no-skill baseline.
pub fn empirical_outcome_probs(outcomes: &[Outcome]) -> Prob3 {
    if outcomes.is_empty() {
        return Prob3::uniform();
    }

    let mut home = 0usize;
    let mut draw = 0usize;
    let mut away = 0usize;
    for outcome in outcomes {
        match outcome {
            Outcome::Home => home += 1,
            Outcome::Draw => draw += 1,
            Outcome::Away => away += 1,
        }
    }
    let n = outcomes.len() as f64;
    Prob3 {
        home: home as f64 / n,
        draw: draw as f64 / n,
        away: away as f64 / n,
    }
}

pub fn evaluate_probs(predictions: &[Prob3], outcomes: &[Outcome]) -> Metrics {
    if predictions.is_empty() || predictions.len() != outcomes.len() {
        return Metrics::default();
    }

    let mut brier_sum = 0.0_f64;
    let mut log_loss_sum = 0.0_f64;
    let mut correct = 0usize;

    for (p, outcome) in predictions.iter().zip(outcomes) {
        let y = one_hot(*outcome);
        brier_sum +=
            (p.home - y.home).powi(2) + (p.draw - y.draw).powi(2) + (p.away - y.away).powi(2);
        log_loss_sum += -p.get(*outcome).clamp(1e-12, 1.0).ln();
        if argmax(*p) == *outcome {
            correct += 1;
        }
    }

    let n = predictions.len() as f64;
    Metrics {
        samples: predictions.len(),
        brier: brier_sum / n,
        log_loss: log_loss_sum / n,
        accuracy: correct as f64 / n,
    }
}

/// Reliability table for one outcome class over `bins` equal-width buckets.
pub fn calibration_bins(
    predictions: &[Prob3],
    outcomes: &[Outcome],
    class: Outcome,
    bins: usize,
) -> Vec<CalibrationBin> {
    let bins = bins.max(2);
    let mut counts = vec![0usize; bins];
    let mut pred_sum = vec![0.0_f64; bins];
    let mut actual_sum = vec![0.0_f64; bins];

    for (p, outcome) in predictions.iter().zip(outcomes) {
        let class_prob = p.get(class).clamp(0.0, 1.0);
        let idx = ((class_prob * bins as f64).floor() as usize).min(bins - 1);
        counts[idx] += 1;
        pred_sum[idx] += class_prob;
        if *outcome == class {
            actual_sum[idx] += 1.0;
        }
    }

    (0..bins)
        .map(|i| {
            let count = counts[i];
            let (avg_pred, actual_rate) = if count > 0 {
                (pred_sum[i] / count as f64, actual_sum[i] / count as f64)
            } else {
                (0.0, 0.0)
            };
            CalibrationBin {
                bucket_start: i as f64 / bins as f64,
                bucket_end: (i + 1) as f64 / bins as f64,
                count,
                avg_pred,
                actual_rate,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub model: Metrics,
    /// Same matches scored against the observed outcome frequencies.
    pub baseline: Metrics,
    /// Matches skipped because a team had no strength row.
    pub skipped: usize,
    pub home_bins: Vec<CalibrationBin>,
}

/// Score the predictor against played results. When `teams` was estimated
/// from the same `matches` this is an in-sample fit check.
pub fn backtest(
    matches: &[MatchRecord],
    teams: &[TeamStrengthRecord],
    cfg: &PredictorConfig,
    bins: usize,
) -> BacktestReport {
    let scored: Vec<Option<(Prob3, Outcome)>> = matches
        .par_iter()
        .map(|m| {
            let prediction = predict_by_name(teams, &m.home_team, &m.away_team, cfg).ok()?;
            Some((
                Prob3::from(&prediction),
                classify_outcome(m.home_score, m.away_score),
            ))
        })
        .collect();

    let skipped = scored.iter().filter(|s| s.is_none()).count();
    let (predictions, outcomes): (Vec<Prob3>, Vec<Outcome>) = scored.into_iter().flatten().unzip();

    let base = empirical_outcome_probs(&outcomes);
    let baseline = evaluate_probs(&vec![base; outcomes.len()], &outcomes);
    let model = evaluate_probs(&predictions, &outcomes);
    let home_bins = calibration_bins(&predictions, &outcomes, Outcome::Home, bins);

    info!(
        samples = model.samples,
        skipped,
        brier = model.brier,
        baseline_brier = baseline.brier,
        accuracy = model.accuracy,
        "backtest complete"
    );

    BacktestReport {
        model,
        baseline,
        skipped,
        home_bins,
    }
}

fn argmax(p: Prob3) -> Outcome {
    if p.home >= p.draw && p.home >= p.away {
        Outcome::Home
    } else if p.draw >= p.away {
        Outcome::Draw
    } else {
        Outcome::Away
    }
}

fn one_hot(outcome: Outcome) -> Prob3 {
    let mut p = Prob3 {
        home: 0.0,
        draw: 0.0,
        away: 0.0,
    };
    match outcome {
        Outcome::Home => p.home = 1.0,
        Outcome::Draw => p.draw = 1.0,
        Outcome::Away => p.away = 1.0,
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions_have_zero_brier() {
        let preds = vec![one_hot(Outcome::Home), one_hot(Outcome::Draw), one_hot(Outcome::Away)];
        let outcomes = vec![Outcome::Home, Outcome::Draw, Outcome::Away];
        let m = evaluate_probs(&preds, &outcomes);
        assert_eq!(m.samples, 3);
        assert!(m.brier < 1e-12);
        assert_eq!(m.accuracy, 1.0);
    }

    #[test]
    fn mismatched_lengths_score_nothing() {
        let m = evaluate_probs(&[Prob3::uniform()], &[]);
        assert_eq!(m, Metrics::default());
    }

    #[test]
    fn bins_cover_unit_interval() {
        let preds = [
            Prob3 {
                home: 0.05,
                draw: 0.5,
                away: 0.45,
            },
            Prob3 {
                home: 0.95,
                draw: 0.03,
                away: 0.02,
            },
        ];
        let outcomes = [Outcome::Draw, Outcome::Home];
        let bins = calibration_bins(&preds, &outcomes, Outcome::Home, 10);
        assert_eq!(bins.len(), 10);
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[0].actual_rate, 0.0);
        assert_eq!(bins[9].count, 1);
        assert_eq!(bins[9].actual_rate, 1.0);
    }

    #[test]
    fn backtest_skips_unrated_teams() {
        let team = |name: &str| TeamStrengthRecord {
            team: name.to_string(),
            conference: "C".to_string(),
            matches_played: 2,
            goals_for: 2,
            goals_against: 2,
            att: 1.0,
            def: 1.0,
            max: 50.0,
        };
        let teams = vec![team("A"), team("B")];
        let game = |h: &str, hs: u32, a: &str, aws: u32| MatchRecord {
            home_team: h.to_string(),
            away_team: a.to_string(),
            home_score: hs,
            away_score: aws,
            home_conference: "C".to_string(),
            away_conference: "C".to_string(),
        };
        let matches = vec![game("A", 2, "B", 1), game("B", 0, "A", 0), game("A", 1, "Z", 3)];
        let report = backtest(&matches, &teams, &PredictorConfig::default(), 5);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.model.samples, 2);
        assert_eq!(report.baseline.samples, 2);
    }
}
