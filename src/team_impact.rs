use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Parameters of the logistic team-impact curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticImpact {
    pub k: f64,
    pub center: f64,
    pub soft_floor: f64,
    pub soft_penalty: f64,
    pub hard_floor: f64,
    pub hard_penalty: f64,
}

impl Default for LogisticImpact {
    fn default() -> Self {
        Self {
            k: 0.003,
            center: 1200.0,
            soft_floor: 600.0,
            soft_penalty: 0.6,
            hard_floor: 400.0,
            hard_penalty: 0.5,
        }
    }
}

impl LogisticImpact {
    /// Share of team strength credited to a player with `minutes` played.
    /// Penalties compound: under `hard_floor` both apply.
    pub fn factor(&self, minutes: f64) -> f64 {
        let mut factor = 1.0 / (1.0 + (-self.k * (minutes - self.center)).exp());
        if minutes < self.soft_floor {
            factor *= self.soft_penalty;
        }
        if minutes < self.hard_floor {
            factor *= self.hard_penalty;
        }
        factor
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| {
            Err(ConfigError::Invalid {
                field: "team_credit",
                reason,
            })
        };
        if !self.k.is_finite() || self.k <= 0.0 {
            return invalid(format!("k must be positive, got {}", self.k));
        }
        if !self.center.is_finite() {
            return invalid(format!("center must be finite, got {}", self.center));
        }
        for (name, penalty) in [
            ("soft_penalty", self.soft_penalty),
            ("hard_penalty", self.hard_penalty),
        ] {
            if !(penalty > 0.0 && penalty <= 1.0) {
                return invalid(format!("{name} must be in (0, 1], got {penalty}"));
            }
        }
        if !self.soft_floor.is_finite() || !self.hard_floor.is_finite() {
            return invalid("floors must be finite".to_string());
        }
        if self.hard_floor > self.soft_floor {
            return invalid(format!(
                "hard_floor {} is above soft_floor {}",
                self.hard_floor, self.soft_floor
            ));
        }
        Ok(())
    }
}

/// How team strength is apportioned to individual players.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TeamCredit {
    Logistic(LogisticImpact),
    MinutesShare,
}

impl Default for TeamCredit {
    fn default() -> Self {
        TeamCredit::Logistic(LogisticImpact::default())
    }
}

impl TeamCredit {
    pub fn credit(&self, minutes: f64, minutes_share: f64) -> f64 {
        match self {
            TeamCredit::Logistic(curve) => curve.factor(minutes),
            TeamCredit::MinutesShare => minutes_share,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            TeamCredit::Logistic(curve) => curve.validate(),
            TeamCredit::MinutesShare => Ok(()),
        }
    }
}

/// Total minutes per team over the rated population.
pub fn team_minutes<'a, I>(rows: I) -> HashMap<&'a str, f64>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for (team, minutes) in rows {
        *totals.entry(team).or_insert(0.0) += minutes;
    }
    totals
}

pub fn minutes_share(player_minutes: f64, team_total: f64) -> f64 {
    if team_total > 0.0 {
        player_minutes / team_total
    } else {
        0.0
    }
}
