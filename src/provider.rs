use std::collections::HashMap;

use crate::error::PredictionError;
use crate::player_ratings::RatingRun;
use crate::records::{PlayerRating, TeamStrengthRecord};
use crate::win_prob::{Prediction, PredictorConfig, predict_by_name};

/// Read side of the rating tables for presentation layers. Callers check
/// [`RatingsProvider::is_available`] instead of probing for failures.
pub trait RatingsProvider {
    fn is_available(&self) -> bool;
    fn player(&self, name: &str) -> Option<&PlayerRating>;
    fn team(&self, name: &str) -> Option<&TeamStrengthRecord>;
    fn teams(&self) -> &[TeamStrengthRecord];

    fn predict(
        &self,
        home: &str,
        away: &str,
        cfg: &PredictorConfig,
    ) -> Result<Prediction, PredictionError> {
        predict_by_name(self.teams(), home, away, cfg)
    }
}

/// Ratings held in memory, indexed by exact name.
#[derive(Debug, Clone, Default)]
pub struct TableRatings {
    players: Vec<PlayerRating>,
    teams: Vec<TeamStrengthRecord>,
    player_index: HashMap<String, usize>,
    team_index: HashMap<String, usize>,
}

impl TableRatings {
    pub fn new(players: Vec<PlayerRating>, teams: Vec<TeamStrengthRecord>) -> Self {
        // First occurrence wins on duplicate names.
        let mut player_index = HashMap::new();
        for (i, p) in players.iter().enumerate() {
            player_index.entry(p.name.clone()).or_insert(i);
        }
        let mut team_index = HashMap::new();
        for (i, t) in teams.iter().enumerate() {
            team_index.entry(t.team.clone()).or_insert(i);
        }
        Self {
            players,
            teams,
            player_index,
            team_index,
        }
    }

    pub fn from_run(run: RatingRun, teams: Vec<TeamStrengthRecord>) -> Self {
        Self::new(run.ratings, teams)
    }
}

impl RatingsProvider for TableRatings {
    fn is_available(&self) -> bool {
        !self.players.is_empty() || !self.teams.is_empty()
    }

    fn player(&self, name: &str) -> Option<&PlayerRating> {
        self.player_index.get(name).map(|&i| &self.players[i])
    }

    fn team(&self, name: &str) -> Option<&TeamStrengthRecord> {
        self.team_index.get(name).map(|&i| &self.teams[i])
    }

    fn teams(&self) -> &[TeamStrengthRecord] {
        &self.teams
    }
}

/// Stand-in when no rating tables could be produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRatings;

impl RatingsProvider for NullRatings {
    fn is_available(&self) -> bool {
        false
    }

    fn player(&self, _name: &str) -> Option<&PlayerRating> {
        None
    }

    fn team(&self, _name: &str) -> Option<&TeamStrengthRecord> {
        None
    }

    fn teams(&self) -> &[TeamStrengthRecord] {
        &[]
    }
}
