//! Seeded synthetic seasons for demos, benchmarks and tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::records::{MatchRecord, PlayerRecord};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeasonSpec {
    pub conferences: usize,
    pub teams_per_conference: usize,
    pub players_per_team: usize,
    /// Extra home games per team against a random non-conference opponent.
    pub cross_conference_games: usize,
    /// Home games per team against a side outside the division.
    pub non_division_games: usize,
}

impl Default for SeasonSpec {
    fn default() -> Self {
        Self {
            conferences: 6,
            teams_per_conference: 10,
            players_per_team: 24,
            cross_conference_games: 3,
            non_division_games: 1,
        }
    }
}

impl SeasonSpec {
    pub fn small() -> Self {
        Self {
            conferences: 2,
            teams_per_conference: 5,
            players_per_team: 16,
            cross_conference_games: 2,
            non_division_games: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Season {
    pub players: Vec<PlayerRecord>,
    pub matches: Vec<MatchRecord>,
}

struct Team {
    name: String,
    conference: String,
    attack: f64,
    defense: f64,
}

const POSITIONS: [&str; 8] = [
    "Goalkeeper",
    "Defender",
    "Defender",
    "Midfielder",
    "Midfielder",
    "Forward",
    "Defender",
    "Midfielder",
];

pub fn generate_season(spec: &SeasonSpec, seed: u64) -> Season {
    let mut rng = StdRng::seed_from_u64(seed);
    let teams = make_teams(spec, &mut rng);
    let matches = make_matches(spec, &teams, &mut rng);
    let players = make_players(spec, &teams, &mut rng);
    Season { players, matches }
}

fn make_teams(spec: &SeasonSpec, rng: &mut StdRng) -> Vec<Team> {
    let mut teams = Vec::with_capacity(spec.conferences * spec.teams_per_conference);
    for c in 0..spec.conferences {
        // Conferences differ in overall level.
        let level = rng.gen_range(0.85..1.15);
        for t in 0..spec.teams_per_conference {
            teams.push(Team {
                name: format!("Team {}-{:02}", conference_letter(c), t + 1),
                conference: format!("Conference {}", conference_letter(c)),
                attack: level * rng.gen_range(0.6..1.5),
                defense: rng.gen_range(0.6..1.5) / level,
            });
        }
    }
    teams
}

fn conference_letter(idx: usize) -> char {
    (b'A' + (idx % 26) as u8) as char
}

fn make_matches(spec: &SeasonSpec, teams: &[Team], rng: &mut StdRng) -> Vec<MatchRecord> {
    let mut out = Vec::new();
    let mut play = |home: &Team, away: &Team, rng: &mut StdRng| {
        let hs = poisson(rng, 1.35 * home.attack * away.defense * 1.15);
        let aws = poisson(rng, 1.35 * away.attack * home.defense);
        out.push(MatchRecord {
            home_team: home.name.clone(),
            away_team: away.name.clone(),
            home_score: hs,
            away_score: aws,
            home_conference: home.conference.clone(),
            away_conference: away.conference.clone(),
        });
    };

    for (i, home) in teams.iter().enumerate() {
        for (j, away) in teams.iter().enumerate() {
            if i != j && home.conference == away.conference {
                play(home, away, rng);
            }
        }
    }
    if spec.conferences > 1 {
        for home in teams {
            for _ in 0..spec.cross_conference_games {
                let away = loop {
                    let candidate = &teams[rng.gen_range(0..teams.len())];
                    if candidate.conference != home.conference {
                        break candidate;
                    }
                };
                play(home, away, rng);
            }
        }
    }
    for (idx, home) in teams.iter().enumerate() {
        for g in 0..spec.non_division_games {
            let visitor = Team {
                name: format!("Visitor {}-{}", idx + 1, g + 1),
                conference: "Not D1".to_string(),
                attack: 0.5,
                defense: 1.8,
            };
            play(home, &visitor, rng);
        }
    }
    out
}

fn make_players(spec: &SeasonSpec, teams: &[Team], rng: &mut StdRng) -> Vec<PlayerRecord> {
    let mut out = Vec::with_capacity(teams.len() * spec.players_per_team);
    for team in teams {
        for n in 0..spec.players_per_team {
            let position = if n == spec.players_per_team - 1 {
                // One row per team with a label the classifier could not resolve.
                "Utility"
            } else {
                POSITIONS[n % POSITIONS.len()]
            };
            let starter = n < 11;
            let minutes = if starter {
                rng.gen_range(900.0..1800.0_f64)
            } else {
                rng.gen_range(50.0..900.0_f64)
            }
            .round();
            let games = minutes / 90.0;
            let (goal_rate, assist_rate, shot_rate) = match position {
                "Forward" => (0.45, 0.2, 3.0),
                "Midfielder" => (0.18, 0.25, 1.6),
                "Defender" => (0.05, 0.08, 0.6),
                "Goalkeeper" => (0.0, 0.01, 0.02),
                _ => (0.15, 0.15, 1.2),
            };
            let skill = rng.gen_range(0.5..1.6) * team.attack.sqrt();
            let shots = poisson(rng, shot_rate * skill * games);
            let on_target = (0..shots).filter(|_| rng.gen_bool(0.42)).count() as u32;
            out.push(PlayerRecord {
                name: format!("{} #{}", team.name, n + 1),
                team: team.name.clone(),
                position: position.to_string(),
                minutes,
                goals: poisson(rng, goal_rate * skill * games).min(on_target.max(1)),
                assists: poisson(rng, assist_rate * skill * games),
                shots,
                shots_on_target: on_target,
                fouls_won: poisson(rng, 0.9 * games),
            });
        }
    }
    out
}

/// Knuth's method; fine for the small rates used here.
fn poisson(rng: &mut StdRng, lambda: f64) -> u32 {
    if !(lambda > 0.0) {
        return 0;
    }
    // Split large rates to keep exp(-lambda) away from underflow.
    if lambda > 30.0 {
        let half = lambda / 2.0;
        return poisson(rng, half) + poisson(rng, lambda - half);
    }
    let limit = (-lambda).exp();
    let mut k = 0u32;
    let mut p = 1.0;
    loop {
        p *= rng.gen_range(0.0..1.0_f64);
        if p <= limit {
            return k;
        }
        k += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_season() {
        let a = generate_season(&SeasonSpec::small(), 42);
        let b = generate_season(&SeasonSpec::small(), 42);
        assert_eq!(a.players, b.players);
        assert_eq!(a.matches, b.matches);
    }

    #[test]
    fn season_shape() {
        let spec = SeasonSpec::small();
        let season = generate_season(&spec, 1);
        let teams = spec.conferences * spec.teams_per_conference;
        assert_eq!(season.players.len(), teams * spec.players_per_team);
        let conference_games =
            spec.conferences * spec.teams_per_conference * (spec.teams_per_conference - 1);
        let expected = conference_games
            + teams * spec.cross_conference_games
            + teams * spec.non_division_games;
        assert_eq!(season.matches.len(), expected);
        assert!(season.matches.iter().any(|m| m.away_conference == "Not D1"));
        assert!(season
            .players
            .iter()
            .all(|p| p.shots_on_target <= p.shots));
    }
}
