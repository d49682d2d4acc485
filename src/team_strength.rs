use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::DataIssue;
use crate::records::{MatchRecord, TeamStrengthRecord, Venue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrengthConfig {
    /// A side's score counts at most `opponent + goal_cap`.
    pub goal_cap: u32,
    /// Conference label left out of team sets and conference baselines.
    pub excluded_conference: String,
    /// Drop teams that only appear at one venue. When off, such teams are
    /// averaged over the venue they have.
    pub require_both_venues: bool,
}

impl Default for StrengthConfig {
    fn default() -> Self {
        Self {
            goal_cap: 5,
            excluded_conference: "Not D1".to_string(),
            require_both_venues: true,
        }
    }
}

/// Raw (uncapped) league scoring rates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LeagueAverages {
    pub matches: usize,
    pub home_goals: f64,
    pub away_goals: f64,
}

impl LeagueAverages {
    pub fn from_matches(matches: &[MatchRecord]) -> Self {
        if matches.is_empty() {
            return Self::default();
        }
        let n = matches.len() as f64;
        let home: f64 = matches.iter().map(|m| m.home_score as f64).sum();
        let away: f64 = matches.iter().map(|m| m.away_score as f64).sum();
        Self {
            matches: matches.len(),
            home_goals: home / n,
            away_goals: away / n,
        }
    }

    /// Goals per team per match, the baseline the predictor scales by.
    pub fn per_team(&self) -> Option<f64> {
        if self.matches == 0 {
            None
        } else {
            Some((self.home_goals + self.away_goals) / 2.0)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StrengthRun {
    pub teams: Vec<TeamStrengthRecord>,
    pub league: LeagueAverages,
    pub issues: Vec<DataIssue>,
}

#[derive(Debug, Clone, Copy)]
struct Capped {
    home: f64,
    away: f64,
}

fn cap_scores(m: &MatchRecord, cap: u32) -> Capped {
    Capped {
        home: m.home_score.min(m.away_score.saturating_add(cap)) as f64,
        away: m.away_score.min(m.home_score.saturating_add(cap)) as f64,
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Mean {
    sum: f64,
    n: usize,
}

impl Mean {
    fn add(&mut self, v: f64) {
        self.sum += v;
        self.n += 1;
    }

    fn value(&self) -> f64 {
        if self.n == 0 { 0.0 } else { self.sum / self.n as f64 }
    }
}

/// Conference scoring baselines, always from capped scores.
#[derive(Debug, Default)]
struct ConferenceBaselines {
    /// Keyed by home conference: goals scored / conceded by its home sides.
    home_for: BTreeMap<String, Mean>,
    home_against: BTreeMap<String, Mean>,
    /// Keyed by away conference: goals scored / conceded by its away sides.
    away_for: BTreeMap<String, Mean>,
    away_against: BTreeMap<String, Mean>,
}

fn lookup(map: &BTreeMap<String, Mean>, conference: &str) -> f64 {
    map.get(conference).map(Mean::value).unwrap_or(0.0)
}

#[derive(Debug, Clone, Copy, Default)]
struct VenueTotals {
    mp: u32,
    gf: f64,
    ga: f64,
    // Raw goals for the output table.
    raw_gf: u32,
    raw_ga: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct VenueRating {
    att: f64,
    def: f64,
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 && num.is_finite() { num / den } else { 0.0 }
}

fn venue_rating(
    totals: &VenueTotals,
    for_baseline: f64,
    against_baseline: f64,
    league_for: f64,
    league_against: f64,
) -> VenueRating {
    if totals.mp == 0 {
        return VenueRating::default();
    }
    let mp = totals.mp as f64;
    VenueRating {
        att: ratio(totals.gf / mp, league_for) * ratio(for_baseline, league_for),
        def: ratio(totals.ga / mp, league_against) * ratio(against_baseline, league_against),
    }
}

/// Derive ATT/DEF/MAX for every team that appears in `matches`.
///
/// Home and away are rated separately against their own league baselines and
/// a conference strength-of-schedule factor, then averaged. The output is
/// sorted by MAX, strongest first.
pub fn estimate_team_strength(matches: &[MatchRecord], cfg: &StrengthConfig) -> StrengthRun {
    let mut issues = Vec::new();
    if matches.is_empty() {
        warn!("match table is empty, no team strengths derived");
        issues.push(DataIssue::EmptyInput {
            table: "match".to_string(),
        });
        return StrengthRun {
            issues,
            ..StrengthRun::default()
        };
    }

    let league = LeagueAverages::from_matches(matches);
    let excluded = cfg.excluded_conference.as_str();

    let mut baselines = ConferenceBaselines::default();
    let mut home: BTreeMap<(String, String), VenueTotals> = BTreeMap::new();
    let mut away: BTreeMap<(String, String), VenueTotals> = BTreeMap::new();

    for m in matches {
        let c = cap_scores(m, cfg.goal_cap);
        if m.home_conference != excluded {
            let conf = &m.home_conference;
            baselines.home_for.entry(conf.clone()).or_default().add(c.home);
            baselines.home_against.entry(conf.clone()).or_default().add(c.away);

            let t = home
                .entry((m.home_team.clone(), conf.clone()))
                .or_default();
            t.mp += 1;
            t.gf += c.home;
            t.ga += c.away;
            t.raw_gf += m.home_score;
            t.raw_ga += m.away_score;
        }
        if m.away_conference != excluded {
            let conf = &m.away_conference;
            baselines.away_for.entry(conf.clone()).or_default().add(c.away);
            baselines.away_against.entry(conf.clone()).or_default().add(c.home);

            let t = away
                .entry((m.away_team.clone(), conf.clone()))
                .or_default();
            t.mp += 1;
            t.gf += c.away;
            t.ga += c.home;
            t.raw_gf += m.away_score;
            t.raw_ga += m.home_score;
        }
    }

    let keys: BTreeSet<&(String, String)> = home.keys().chain(away.keys()).collect();
    let empty = VenueTotals::default();
    let mut rows = Vec::with_capacity(keys.len());

    for key in keys {
        let (team, conference) = key;
        let h = home.get(key).copied().unwrap_or(empty);
        let a = away.get(key).copied().unwrap_or(empty);

        for (totals, venue) in [(&h, Venue::Home), (&a, Venue::Away)] {
            if totals.mp == 0 {
                issues.push(DataIssue::InvalidMatchInput {
                    team: team.clone(),
                    venue,
                });
            }
        }
        let venues = (h.mp > 0) as u32 + (a.mp > 0) as u32;
        if cfg.require_both_venues && venues < 2 {
            continue;
        }

        let hr = venue_rating(
            &h,
            lookup(&baselines.home_for, conference),
            lookup(&baselines.home_against, conference),
            league.home_goals,
            league.away_goals,
        );
        let ar = venue_rating(
            &a,
            lookup(&baselines.away_for, conference),
            lookup(&baselines.away_against, conference),
            league.away_goals,
            league.home_goals,
        );
        let divisor = venues.max(1) as f64;

        rows.push(TeamStrengthRecord {
            team: team.clone(),
            conference: conference.clone(),
            matches_played: h.mp + a.mp,
            goals_for: h.raw_gf + a.raw_gf,
            goals_against: h.raw_ga + a.raw_ga,
            att: (hr.att + ar.att) / divisor,
            def: (hr.def + ar.def) / divisor,
            max: 0.0,
        });
    }

    if let Some(issue) = assign_team_max(&mut rows) {
        issues.push(issue);
    }
    rows.sort_by(|a, b| b.max.total_cmp(&a.max).then(a.team.cmp(&b.team)));

    let dropped = issues
        .iter()
        .filter(|i| matches!(i, DataIssue::InvalidMatchInput { .. }))
        .count();
    if dropped > 0 {
        warn!(venues = dropped, "teams missing a venue");
    }
    info!(
        matches = matches.len(),
        teams = rows.len(),
        league_home = league.home_goals,
        league_away = league.away_goals,
        "team strength estimated"
    );

    StrengthRun {
        teams: rows,
        league,
        issues,
    }
}

/// `STR = 0.5·ATT + 0.5·(max DEF − DEF)`, then min-max onto [0, 100].
fn assign_team_max(rows: &mut [TeamStrengthRecord]) -> Option<DataIssue> {
    if rows.is_empty() {
        return None;
    }
    let max_def = rows.iter().map(|r| r.def).fold(f64::MIN, f64::max);
    let strength: Vec<f64> = rows
        .iter()
        .map(|r| 0.5 * r.att + 0.5 * (max_def - r.def))
        .collect();
    let scaled = crate::scaling::rescale_to_range(&strength, 0.0, 100.0);
    for (row, max) in rows.iter_mut().zip(scaled.values) {
        row.max = max;
    }
    scaled.degenerate.then(|| DataIssue::DegenerateDistribution {
        metric: "team_strength".to_string(),
        fallback: 50.0,
    })
}

pub fn find_team<'a>(
    teams: &'a [TeamStrengthRecord],
    name: &str,
) -> Option<&'a TeamStrengthRecord> {
    teams.iter().find(|t| t.team == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_float_eq::*;

    fn m(home: &str, hs: u32, away: &str, aws: u32, hc: &str, ac: &str) -> MatchRecord {
        MatchRecord {
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_score: hs,
            away_score: aws,
            home_conference: hc.to_string(),
            away_conference: ac.to_string(),
        }
    }

    #[test]
    fn blowouts_are_capped_at_five() {
        let c = cap_scores(&m("A", 9, "B", 1, "X", "X"), 5);
        assert_eq!(c.home, 6.0);
        assert_eq!(c.away, 1.0);
        let c = cap_scores(&m("A", 0, "B", 7, "X", "X"), 5);
        assert_eq!(c.home, 0.0);
        assert_eq!(c.away, 5.0);
    }

    #[test]
    fn league_averages_are_split_by_venue() {
        let matches = [m("A", 2, "B", 1, "X", "X"), m("B", 0, "A", 1, "X", "X")];
        let league = LeagueAverages::from_matches(&matches);
        assert_float_relative_eq!(league.home_goals, 1.0);
        assert_float_relative_eq!(league.away_goals, 1.0);
        assert_float_relative_eq!(league.per_team().unwrap(), 1.0);
        assert!(LeagueAverages::from_matches(&[]).per_team().is_none());
    }

    #[test]
    fn symmetric_schedule_rates_everyone_average() {
        let matches = [
            m("A", 1, "B", 1, "X", "X"),
            m("B", 1, "A", 1, "X", "X"),
        ];
        let run = estimate_team_strength(&matches, &StrengthConfig::default());
        assert_eq!(run.teams.len(), 2);
        for t in &run.teams {
            assert_float_relative_eq!(t.att, 1.0);
            assert_float_relative_eq!(t.def, 1.0);
            assert_float_relative_eq!(t.max, 50.0);
        }
        assert!(run
            .issues
            .iter()
            .any(|i| matches!(i, DataIssue::DegenerateDistribution { .. })));
    }

    #[test]
    fn single_venue_teams_follow_the_join_setting() {
        let matches = [
            m("A", 2, "B", 0, "X", "X"),
            m("B", 1, "A", 1, "X", "X"),
            m("C", 3, "A", 0, "X", "X"),
        ];
        let run = estimate_team_strength(&matches, &StrengthConfig::default());
        assert!(find_team(&run.teams, "C").is_none());
        assert!(run.issues.contains(&DataIssue::InvalidMatchInput {
            team: "C".to_string(),
            venue: Venue::Away,
        }));

        let cfg = StrengthConfig {
            require_both_venues: false,
            ..StrengthConfig::default()
        };
        let run = estimate_team_strength(&matches, &cfg);
        let c = find_team(&run.teams, "C").unwrap();
        assert_eq!(c.matches_played, 1);
        assert!(c.att > 0.0);
    }

    #[test]
    fn excluded_conference_never_enters_the_table() {
        let matches = [
            m("A", 2, "Z", 0, "X", "Not D1"),
            m("Z", 1, "A", 1, "Not D1", "X"),
            m("A", 1, "B", 1, "X", "X"),
            m("B", 0, "A", 2, "X", "X"),
        ];
        let run = estimate_team_strength(&matches, &StrengthConfig::default());
        assert!(find_team(&run.teams, "Z").is_none());
        assert!(run.teams.iter().all(|t| t.conference != "Not D1"));
    }

    #[test]
    fn empty_table_reports_issue() {
        let run = estimate_team_strength(&[], &StrengthConfig::default());
        assert!(run.teams.is_empty());
        assert_eq!(
            run.issues,
            vec![DataIssue::EmptyInput {
                table: "match".to_string()
            }]
        );
    }
}
