use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::player_ratings::{DisplayRange, RatingParams};
use crate::team_impact::TeamCredit;
use crate::team_strength::StrengthConfig;
use crate::weights::WeightSpec;
use crate::win_prob::PredictorConfig;

pub const CONFIG_PATH_ENV: &str = "NCAA_MAX_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    pub min_minutes: f64,
    pub exclude_goalkeepers: bool,
    pub team_credit: TeamCredit,
    pub display_range: DisplayRange,
    pub weights: WeightSpec,
    pub predictor: PredictorConfig,
    pub strength: StrengthConfig,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            min_minutes: 300.0,
            exclude_goalkeepers: true,
            team_credit: TeamCredit::default(),
            display_range: DisplayRange::default(),
            weights: WeightSpec::default(),
            predictor: PredictorConfig::default(),
            strength: StrengthConfig::default(),
        }
    }
}

impl RatingConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: RatingConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        cfg.validate()?;
        debug!(path = %path.display(), "loaded rating config");
        Ok(cfg)
    }

    /// Config file named by `NCAA_MAX_CONFIG` (defaults when unset), then scalar
    /// overrides from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = match env::var(CONFIG_PATH_ENV).ok().filter(|s| !s.trim().is_empty()) {
            Some(path) => Self::load(PathBuf::from(path.trim()))?,
            None => Self::default(),
        };
        if let Some(v) = env_f64("NCAA_MAX_MIN_MINUTES")? {
            cfg.min_minutes = v;
        }
        if let Some(v) = env_f64("NCAA_MAX_HOME_ADVANTAGE")? {
            cfg.predictor.home_advantage = v;
        }
        if let Some(v) = env_f64("NCAA_MAX_LEAGUE_AVG_GOALS")? {
            cfg.predictor.league_avg_goals = v;
        }
        cfg.validate()?;
        info!(
            min_minutes = cfg.min_minutes,
            lo = cfg.display_range.lo,
            hi = cfg.display_range.hi,
            "rating config ready"
        );
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_minutes.is_finite() || self.min_minutes <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "min_minutes",
                reason: format!("must be positive, got {}", self.min_minutes),
            });
        }
        self.display_range.validate()?;
        self.team_credit.validate()?;
        self.predictor.validate()?;
        self.weights.resolve()?;
        Ok(())
    }

    pub fn rating_params(&self) -> Result<RatingParams, ConfigError> {
        Ok(RatingParams {
            min_minutes: self.min_minutes,
            exclude_goalkeepers: self.exclude_goalkeepers,
            team_credit: self.team_credit,
            display_range: self.display_range,
            weights: self.weights.resolve()?,
        })
    }
}

fn env_f64(key: &'static str) -> Result<Option<f64>, ConfigError> {
    let Ok(raw) = env::var(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|err| ConfigError::Invalid {
            field: key,
            reason: err.to_string(),
        })
}
