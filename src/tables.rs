//! CSV adapters for the input and output tables.
//!
//! Column names follow the tables the scrapers and dashboard already use.
//! Malformed rows are skipped with a warning rather than failing the load.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::TableError;
use crate::records::{MatchRecord, PlayerRating, PlayerRecord, TeamStrengthRecord};
use crate::scaling::round_to;

#[derive(Debug, Deserialize)]
struct RawPlayer {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Team")]
    team: String,
    #[serde(rename = "Position", default)]
    position: String,
    #[serde(rename = "Minutes Played")]
    minutes: f64,
    #[serde(rename = "Goals")]
    goals: f64,
    #[serde(rename = "Assists")]
    assists: f64,
    #[serde(rename = "Shots")]
    shots: f64,
    #[serde(rename = "Shots On Target")]
    shots_on_target: f64,
    #[serde(rename = "Fouls Won")]
    fouls_won: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawTeam {
    #[serde(rename = "Team")]
    team: String,
    #[serde(rename = "Conference", default)]
    conference: String,
    #[serde(rename = "MP", default)]
    matches_played: u32,
    #[serde(rename = "GF", default)]
    goals_for: u32,
    #[serde(rename = "GA", default)]
    goals_against: u32,
    #[serde(rename = "ATT")]
    att: f64,
    #[serde(rename = "DEF")]
    def: f64,
    #[serde(rename = "MAX")]
    max: f64,
}

#[derive(Debug, Deserialize)]
struct RawMatch {
    home_team: String,
    home_team_score: f64,
    away_team: String,
    away_team_score: f64,
    #[serde(default)]
    home_team_conference: String,
    #[serde(default)]
    away_team_conference: String,
}

#[derive(Debug, Serialize)]
struct PlayerRow<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Team")]
    team: &'a str,
    #[serde(rename = "Conference")]
    conference: &'a str,
    #[serde(rename = "Position")]
    position: &'a str,
    #[serde(rename = "Minutes Played")]
    minutes: f64,
    #[serde(rename = "Goals")]
    goals: u32,
    #[serde(rename = "Assists")]
    assists: u32,
    #[serde(rename = "Shots")]
    shots: u32,
    #[serde(rename = "Shots On Target")]
    shots_on_target: u32,
    #[serde(rename = "Fouls Won")]
    fouls_won: u32,
    #[serde(rename = "Shot Accuracy")]
    shot_accuracy: f64,
    #[serde(rename = "Goals/90")]
    goals_per90: f64,
    #[serde(rename = "Assists/90")]
    assists_per90: f64,
    #[serde(rename = "Shots/90")]
    shots_per90: f64,
    #[serde(rename = "Fouls Won/90")]
    fouls_won_per90: f64,
    #[serde(rename = "Team Impact")]
    team_impact: f64,
    #[serde(rename = "Overall_Rating")]
    overall_rating: f64,
    #[serde(rename = "MAX")]
    max: u8,
    // Within-position percentiles; blank for Unknown rows.
    #[serde(rename = "Goals Pct")]
    goals_pct: Option<f64>,
    #[serde(rename = "Assists Pct")]
    assists_pct: Option<f64>,
    #[serde(rename = "Shots Pct")]
    shots_pct: Option<f64>,
    #[serde(rename = "Shots On Target Pct")]
    shots_on_target_pct: Option<f64>,
    #[serde(rename = "Fouls Won Pct")]
    fouls_won_pct: Option<f64>,
}

/// Whole non-negative count, tolerating the `12.0` spelling spreadsheets emit.
fn count(value: f64) -> Option<u32> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}

pub fn read_players_from<R: Read>(rdr: R) -> Result<Vec<PlayerRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut out = Vec::new();
    for result in reader.deserialize::<RawPlayer>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed player row: {e}");
                continue;
            }
        };
        let counts = (
            count(raw.goals),
            count(raw.assists),
            count(raw.shots),
            count(raw.shots_on_target),
            count(raw.fouls_won),
        );
        let (Some(goals), Some(assists), Some(shots), Some(shots_on_target), Some(fouls_won)) =
            counts
        else {
            warn!(player = %raw.name.trim(), "skipping player row with invalid counting stats");
            continue;
        };
        out.push(PlayerRecord {
            name: raw.name.trim().to_string(),
            team: raw.team.trim().to_string(),
            position: raw.position.trim().to_string(),
            minutes: raw.minutes,
            goals,
            assists,
            shots,
            shots_on_target,
            fouls_won,
        });
    }
    Ok(out)
}

pub fn read_teams_from<R: Read>(rdr: R) -> Result<Vec<TeamStrengthRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut out = Vec::new();
    for result in reader.deserialize::<RawTeam>() {
        match result {
            Ok(raw) => {
                if !(raw.att.is_finite() && raw.def.is_finite()) {
                    warn!(team = %raw.team.trim(), "skipping team row with non-finite ATT/DEF");
                    continue;
                }
                out.push(TeamStrengthRecord {
                    team: raw.team.trim().to_string(),
                    conference: raw.conference.trim().to_string(),
                    matches_played: raw.matches_played,
                    goals_for: raw.goals_for,
                    goals_against: raw.goals_against,
                    att: raw.att,
                    def: raw.def,
                    max: raw.max,
                });
            }
            Err(e) => warn!("skipping malformed team row: {e}"),
        }
    }
    Ok(out)
}

pub fn read_matches_from<R: Read>(rdr: R) -> Result<Vec<MatchRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut out = Vec::new();
    for result in reader.deserialize::<RawMatch>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed match row: {e}");
                continue;
            }
        };
        let (Some(home_score), Some(away_score)) =
            (count(raw.home_team_score), count(raw.away_team_score))
        else {
            warn!(
                home = %raw.home_team.trim(),
                away = %raw.away_team.trim(),
                "skipping match row with invalid score"
            );
            continue;
        };
        out.push(MatchRecord {
            home_team: raw.home_team.trim().to_string(),
            away_team: raw.away_team.trim().to_string(),
            home_score,
            away_score,
            home_conference: raw.home_team_conference.trim().to_string(),
            away_conference: raw.away_team_conference.trim().to_string(),
        });
    }
    Ok(out)
}

pub fn write_ratings_to<W: Write>(w: W, ratings: &[PlayerRating]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(w);
    for r in ratings {
        writer.serialize(PlayerRow {
            name: &r.name,
            team: &r.team,
            conference: &r.conference,
            position: r.position.label(),
            minutes: r.minutes,
            goals: r.goals,
            assists: r.assists,
            shots: r.shots,
            shots_on_target: r.shots_on_target,
            fouls_won: r.fouls_won,
            shot_accuracy: round_to(r.shot_accuracy, 3),
            goals_per90: round_to(r.per90.goals, 3),
            assists_per90: round_to(r.per90.assists, 3),
            shots_per90: round_to(r.per90.shots, 3),
            fouls_won_per90: round_to(r.per90.fouls_won, 3),
            team_impact: round_to(r.team_impact, 3),
            overall_rating: round_to(r.overall_rating, 3),
            max: r.max,
            goals_pct: r.percentiles.map(|p| p.goals),
            assists_pct: r.percentiles.map(|p| p.assists),
            shots_pct: r.percentiles.map(|p| p.shots),
            shots_on_target_pct: r.percentiles.map(|p| p.shots_on_target),
            fouls_won_pct: r.percentiles.map(|p| p.fouls_won),
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_teams_to<W: Write>(w: W, teams: &[TeamStrengthRecord]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(w);
    for t in teams {
        writer.serialize(RawTeam {
            team: t.team.clone(),
            conference: t.conference.clone(),
            matches_played: t.matches_played,
            goals_for: t.goals_for,
            goals_against: t.goals_against,
            att: round_to(t.att, 4),
            def: round_to(t.def, 4),
            max: round_to(t.max, 1),
        })?;
    }
    writer.flush()?;
    Ok(())
}

fn open(path: &Path) -> Result<File, TableError> {
    File::open(path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn create(path: &Path) -> Result<File, TableError> {
    File::create(path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn csv_err(path: &Path) -> impl FnOnce(csv::Error) -> TableError + '_ {
    move |source| TableError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

pub fn load_players(path: &Path) -> Result<Vec<PlayerRecord>, TableError> {
    let rows = read_players_from(open(path)?).map_err(csv_err(path))?;
    debug!(path = %path.display(), rows = rows.len(), "loaded player table");
    Ok(rows)
}

pub fn load_teams(path: &Path) -> Result<Vec<TeamStrengthRecord>, TableError> {
    let rows = read_teams_from(open(path)?).map_err(csv_err(path))?;
    debug!(path = %path.display(), rows = rows.len(), "loaded team table");
    Ok(rows)
}

pub fn load_matches(path: &Path) -> Result<Vec<MatchRecord>, TableError> {
    let rows = read_matches_from(open(path)?).map_err(csv_err(path))?;
    debug!(path = %path.display(), rows = rows.len(), "loaded match table");
    Ok(rows)
}

pub fn save_ratings(path: &Path, ratings: &[PlayerRating]) -> Result<(), TableError> {
    write_ratings_to(create(path)?, ratings).map_err(csv_err(path))
}

pub fn save_teams(path: &Path, teams: &[TeamStrengthRecord]) -> Result<(), TableError> {
    write_teams_to(create(path)?, teams).map_err(csv_err(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_rows_accept_float_counts_and_skip_bad_rows() {
        let data = "\
Name,Team,Position,Minutes Played,Goals,Assists,Shots,Shots On Target,Fouls Won
 Ada Lane ,Akron,Forward,1200,7.0,3,40,18,12
Bad Row,Akron,Forward,900,-1,0,0,0,0
Short,Akron
Cy Moss,Butler,Defender,1500.5,0,1,5,2,9
";
        let rows = read_players_from(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Ada Lane");
        assert_eq!(rows[0].goals, 7);
        assert_eq!(rows[1].minutes, 1500.5);
    }

    #[test]
    fn team_table_round_trips_through_writer() {
        let teams = vec![TeamStrengthRecord {
            team: "Akron".to_string(),
            conference: "Big East".to_string(),
            matches_played: 18,
            goals_for: 30,
            goals_against: 14,
            att: 1.2345,
            def: 0.8765,
            max: 71.2,
        }];
        let mut buf = Vec::new();
        write_teams_to(&mut buf, &teams).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("Team,Conference,MP,GF,GA,ATT,DEF,MAX"));
        let back = read_teams_from(buf.as_slice()).unwrap();
        assert_eq!(back, teams);
    }

    #[test]
    fn minimal_team_table_is_accepted() {
        let data = "Team,Conference,ATT,DEF,MAX\nAkron,MAC,1.1,0.9,64\n";
        let teams = read_teams_from(data.as_bytes()).unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].matches_played, 0);
    }

    #[test]
    fn match_rows_parse_conferences() {
        let data = "\
home_team,home_team_score,away_team,away_team_score,home_team_conference,away_team_conference
Akron,2,Butler,1,MAC,Big East
";
        let rows = read_matches_from(data.as_bytes()).unwrap();
        assert_eq!(rows[0].home_score, 2);
        assert_eq!(rows[0].away_conference, "Big East");
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_players(Path::new("/no/such/players.csv")).unwrap_err();
        assert!(err.to_string().contains("/no/such/players.csv"));
    }
}
