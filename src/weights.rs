//! Position weight vectors for the composite rating.
//!
//! Weights are configuration, not logic: two historical tunings ship as
//! presets and any other set can be supplied as JSON.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::records::Position;

const SUM_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionWeights {
    pub goals: f64,
    pub assists: f64,
    pub shots: f64,
    pub fouls_won: f64,
    /// Weight of the position's team component (attack, defense, or their mean).
    pub team: f64,
}

impl PositionWeights {
    pub const fn new(goals: f64, assists: f64, shots: f64, fouls_won: f64, team: f64) -> Self {
        Self {
            goals,
            assists,
            shots,
            fouls_won,
            team,
        }
    }

    pub fn sum(&self) -> f64 {
        self.goals + self.assists + self.shots + self.fouls_won + self.team
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightSet {
    pub forward: PositionWeights,
    pub midfielder: PositionWeights,
    pub defender: PositionWeights,
    pub unknown: PositionWeights,
}

/// Current tuning, used after the DEF normalization fix.
pub static TUNED: Lazy<WeightSet> = Lazy::new(|| WeightSet {
    forward: PositionWeights::new(0.312, 0.126, 0.211, 0.127, 0.224),
    midfielder: PositionWeights::new(0.145, 0.210, 0.158, 0.147, 0.340),
    defender: PositionWeights::new(0.002, 0.048, 0.076, 0.120, 0.754),
    unknown: PositionWeights::new(0.200, 0.150, 0.150, 0.150, 0.350),
});

/// Earlier tuning. It never had an Unknown vector; the tuned one is borrowed.
pub static LEGACY: Lazy<WeightSet> = Lazy::new(|| WeightSet {
    forward: PositionWeights::new(0.35, 0.20, 0.25, 0.05, 0.15),
    midfielder: PositionWeights::new(0.20, 0.30, 0.15, 0.10, 0.25),
    defender: PositionWeights::new(0.05, 0.15, 0.10, 0.10, 0.60),
    unknown: PositionWeights::new(0.200, 0.150, 0.150, 0.150, 0.350),
});

impl Default for WeightSet {
    fn default() -> Self {
        TUNED.clone()
    }
}

impl WeightSet {
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "tuned" | "current" => Some(TUNED.clone()),
            "legacy" | "original" => Some(LEGACY.clone()),
            _ => None,
        }
    }

    /// Weight vector for a position. Goalkeepers and anything unclassified
    /// fall through to the Unknown vector.
    pub fn for_position(&self, position: Position) -> &PositionWeights {
        match position {
            Position::Forward => &self.forward,
            Position::Midfielder => &self.midfielder,
            Position::Defender => &self.defender,
            Position::Goalkeeper | Position::Unknown => &self.unknown,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (position, weights) in [
            ("Forward", &self.forward),
            ("Midfielder", &self.midfielder),
            ("Defender", &self.defender),
            ("Unknown", &self.unknown),
        ] {
            let sum = weights.sum();
            if !sum.is_finite() || (sum - 1.0).abs() > SUM_TOLERANCE {
                return Err(ConfigError::WeightSum { position, sum });
            }
            let parts = [
                weights.goals,
                weights.assists,
                weights.shots,
                weights.fouls_won,
                weights.team,
            ];
            if parts.iter().any(|w| *w < 0.0) {
                return Err(ConfigError::Invalid {
                    field: "weights",
                    reason: format!("{position} has a negative weight"),
                });
            }
        }
        Ok(())
    }
}

/// A weight set as written in config: either a preset name or explicit vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeightSpec {
    Preset(String),
    Custom(WeightSet),
}

impl Default for WeightSpec {
    fn default() -> Self {
        WeightSpec::Preset("tuned".to_string())
    }
}

impl WeightSpec {
    pub fn resolve(&self) -> Result<WeightSet, ConfigError> {
        let set = match self {
            WeightSpec::Preset(name) => {
                WeightSet::preset(name).ok_or_else(|| ConfigError::Invalid {
                    field: "weights",
                    reason: format!("unknown preset '{name}'"),
                })?
            }
            WeightSpec::Custom(set) => set.clone(),
        };
        set.validate()?;
        Ok(set)
    }
}
