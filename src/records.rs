use std::fmt;

use serde::{Deserialize, Serialize};

/// Playing position as used by the rating engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    Forward,
    Midfielder,
    Defender,
    Goalkeeper,
    Unknown,
}

/// Which compression distribution a position is rescaled within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionGroup {
    Known,
    Unknown,
}

impl Position {
    pub const OUTFIELD: [Position; 3] =
        [Position::Forward, Position::Midfielder, Position::Defender];

    /// Strict label parse. Anything outside the five canonical labels is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.eq_ignore_ascii_case("forward") {
            Some(Position::Forward)
        } else if s.eq_ignore_ascii_case("midfielder") {
            Some(Position::Midfielder)
        } else if s.eq_ignore_ascii_case("defender") {
            Some(Position::Defender)
        } else if s.eq_ignore_ascii_case("goalkeeper") {
            Some(Position::Goalkeeper)
        } else if s.eq_ignore_ascii_case("unknown") {
            Some(Position::Unknown)
        } else {
            None
        }
    }

    pub fn group(self) -> PositionGroup {
        match self {
            Position::Forward | Position::Midfielder | Position::Defender => PositionGroup::Known,
            Position::Goalkeeper | Position::Unknown => PositionGroup::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Position::Forward => "Forward",
            Position::Midfielder => "Midfielder",
            Position::Defender => "Defender",
            Position::Goalkeeper => "Goalkeeper",
            Position::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// One row of the player stats table. `position` is the raw label as supplied
/// by the classifier upstream; the engine decides what to do with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub team: String,
    pub position: String,
    pub minutes: f64,
    pub goals: u32,
    pub assists: u32,
    pub shots: u32,
    pub shots_on_target: u32,
    pub fouls_won: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStrengthRecord {
    pub team: String,
    pub conference: String,
    pub matches_played: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    /// Attack index, 1.0 = league average.
    pub att: f64,
    /// Defense index, 1.0 = league average. Lower is better.
    pub def: f64,
    /// Overall team rating on [0, 100].
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    pub home_conference: String,
    pub away_conference: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Per90Stats {
    pub goals: f64,
    pub assists: f64,
    pub shots: f64,
    pub shots_on_target: f64,
    pub fouls_won: f64,
}

/// Population-relative metrics for a single player, all on [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMetrics {
    pub goals: f64,
    pub assists: f64,
    pub shots: f64,
    pub shots_on_target: f64,
    pub fouls_won: f64,
    pub team_attack: f64,
    /// Already inverted: 1.0 is the best defense in the population.
    pub team_defense: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PercentileRanks {
    pub goals: f64,
    pub assists: f64,
    pub shots: f64,
    pub shots_on_target: f64,
    pub fouls_won: f64,
}

/// A fully derived rating row, one per rated player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRating {
    pub name: String,
    pub team: String,
    pub conference: String,
    pub position: Position,
    pub minutes: f64,
    pub goals: u32,
    pub assists: u32,
    pub shots: u32,
    pub shots_on_target: u32,
    pub fouls_won: u32,
    pub shot_accuracy: f64,
    pub per90: Per90Stats,
    pub normalized: NormalizedMetrics,
    pub team_impact: f64,
    pub team_minutes_share: f64,
    pub overall_rating: f64,
    pub max: u8,
    pub percentiles: Option<PercentileRanks>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Score {
    pub home: u8,
    pub away: u8,
}

impl Score {
    pub fn new(home: u8, away: u8) -> Self {
        Self { home, away }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.home, self.away)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    Home,
    Away,
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::Home => f.write_str("home"),
            Venue::Away => f.write_str("away"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_parse_is_case_insensitive_and_strict() {
        assert_eq!(Position::parse(" forward "), Some(Position::Forward));
        assert_eq!(Position::parse("Midfielder"), Some(Position::Midfielder));
        assert_eq!(Position::parse("DEFENDER"), Some(Position::Defender));
        assert_eq!(Position::parse("Unknown"), Some(Position::Unknown));
        assert_eq!(Position::parse("Wing-back"), None);
        assert_eq!(Position::parse(""), None);
    }

    #[test]
    fn groups_split_known_from_unknown() {
        for p in Position::OUTFIELD {
            assert_eq!(p.group(), PositionGroup::Known);
        }
        assert_eq!(Position::Unknown.group(), PositionGroup::Unknown);
    }

    #[test]
    fn score_displays_as_scoreline() {
        assert_eq!(Score::new(2, 1).to_string(), "2-1");
    }
}
