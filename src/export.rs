use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};
use tracing::info;

use crate::error::RunReport;
use crate::records::{PlayerRating, TeamStrengthRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportReport {
    pub players: usize,
    pub teams: usize,
    pub issues: usize,
}

enum Cell {
    Text(String),
    Number(f64),
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<u32> for Cell {
    fn from(value: u32) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<u8> for Cell {
    fn from(value: u8) -> Self {
        Cell::Number(value as f64)
    }
}

const PLAYER_HEADER: [&str; 23] = [
    "Name",
    "Team",
    "Conference",
    "Position",
    "Minutes Played",
    "Goals",
    "Assists",
    "Shots",
    "Shots On Target",
    "Fouls Won",
    "Shot Accuracy",
    "Goals/90",
    "Assists/90",
    "Shots/90",
    "Fouls Won/90",
    "Team Impact",
    "Overall_Rating",
    "MAX",
    "Goals Pct",
    "Assists Pct",
    "Shots Pct",
    "Shots On Target Pct",
    "Fouls Won Pct",
];

const TEAM_HEADER: [&str; 8] = ["Team", "Conference", "MP", "GF", "GA", "ATT", "DEF", "MAX"];

/// Workbook with `Players`, `Teams` and, when a report is given, `Issues`.
pub fn export_workbook(
    path: &Path,
    ratings: &[PlayerRating],
    teams: &[TeamStrengthRecord],
    report: Option<&RunReport>,
) -> Result<ExportReport> {
    let player_rows: Vec<Vec<Cell>> = ratings.iter().map(player_row).collect();
    let team_rows: Vec<Vec<Cell>> = teams.iter().map(team_row).collect();
    let issue_rows: Vec<Vec<Cell>> = report
        .map(|r| {
            r.issues
                .iter()
                .map(|issue| vec![Cell::from(issue.to_string())])
                .collect()
        })
        .unwrap_or_default();

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Players")?;
        write_sheet(sheet, &PLAYER_HEADER, &player_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Teams")?;
        write_sheet(sheet, &TEAM_HEADER, &team_rows)?;
    }
    if report.is_some() {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Issues")?;
        write_sheet(sheet, &["Issue"], &issue_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    let out = ExportReport {
        players: player_rows.len(),
        teams: team_rows.len(),
        issues: issue_rows.len(),
    };
    info!(path = %path.display(), players = out.players, teams = out.teams, "workbook written");
    Ok(out)
}

fn player_row(r: &PlayerRating) -> Vec<Cell> {
    let mut row: Vec<Cell> = vec![
        r.name.as_str().into(),
        r.team.as_str().into(),
        r.conference.as_str().into(),
        r.position.label().into(),
        r.minutes.into(),
        r.goals.into(),
        r.assists.into(),
        r.shots.into(),
        r.shots_on_target.into(),
        r.fouls_won.into(),
        r.shot_accuracy.into(),
        r.per90.goals.into(),
        r.per90.assists.into(),
        r.per90.shots.into(),
        r.per90.fouls_won.into(),
        r.team_impact.into(),
        r.overall_rating.into(),
        r.max.into(),
    ];
    match r.percentiles {
        Some(p) => row.extend(
            [p.goals, p.assists, p.shots, p.shots_on_target, p.fouls_won].map(Cell::from),
        ),
        None => row.extend((0..5).map(|_| Cell::from(""))),
    }
    row
}

fn team_row(t: &TeamStrengthRecord) -> Vec<Cell> {
    vec![
        t.team.as_str().into(),
        t.conference.as_str().into(),
        t.matches_played.into(),
        t.goals_for.into(),
        t.goals_against.into(),
        t.att.into(),
        t.def.into(),
        t.max.into(),
    ]
}

fn write_sheet(worksheet: &mut Worksheet, header: &[&str], rows: &[Vec<Cell>]) -> Result<()> {
    for (col_idx, title) in header.iter().enumerate() {
        worksheet
            .write_string(0, col_idx as u16, *title)
            .with_context(|| format!("write header ({col_idx})"))?;
    }
    for (idx, row) in rows.iter().enumerate() {
        let row_idx = idx as u32 + 1;
        for (col_idx, cell) in row.iter().enumerate() {
            let col = col_idx as u16;
            match cell {
                Cell::Text(s) => worksheet.write_string(row_idx, col, s),
                Cell::Number(n) => worksheet.write_number(row_idx, col, *n),
            }
            .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataIssue;
    use crate::player_ratings::{RatingParams, rate_players};
    use crate::records::Venue;
    use crate::synthetic::{SeasonSpec, generate_season};
    use crate::team_strength::{StrengthConfig, estimate_team_strength};

    #[test]
    fn workbook_is_written_with_all_rows() {
        let season = generate_season(&SeasonSpec::small(), 7);
        let strength = estimate_team_strength(&season.matches, &StrengthConfig::default());
        let mut run = rate_players(&season.players, &strength.teams, &RatingParams::default());
        let rating_issues = run.report.issues.len();
        run.report.absorb(strength.issues.iter().cloned());
        run.report.absorb([DataIssue::InvalidMatchInput {
            team: "Team A-01".to_string(),
            venue: Venue::Home,
        }]);

        let path =
            std::env::temp_dir().join(format!("ncaa_max_export_{}.xlsx", std::process::id()));
        let report =
            export_workbook(&path, &run.ratings, &strength.teams, Some(&run.report)).unwrap();
        assert_eq!(report.players, run.ratings.len());
        assert_eq!(report.teams, strength.teams.len());
        assert_eq!(report.issues, rating_issues + strength.issues.len() + 1);
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn player_rows_carry_every_percentile_or_blanks() {
        let season = generate_season(&SeasonSpec::small(), 3);
        let strength = estimate_team_strength(&season.matches, &StrengthConfig::default());
        let run = rate_players(&season.players, &strength.teams, &RatingParams::default());
        for r in &run.ratings {
            let row = player_row(r);
            assert_eq!(row.len(), PLAYER_HEADER.len());
            let tail = &row[PLAYER_HEADER.len() - 5..];
            match r.percentiles {
                Some(p) => {
                    let values: Vec<f64> = tail
                        .iter()
                        .map(|c| match c {
                            Cell::Number(n) => *n,
                            Cell::Text(t) => panic!("unexpected text {t}"),
                        })
                        .collect();
                    assert_eq!(
                        values,
                        vec![p.goals, p.assists, p.shots, p.shots_on_target, p.fouls_won]
                    );
                }
                None => assert!(tail.iter().all(|c| matches!(c, Cell::Text(t) if t.is_empty()))),
            }
        }
    }
}
