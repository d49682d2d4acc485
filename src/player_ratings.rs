use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ConfigError, DataIssue, RunReport};
use crate::per90::{per90, shot_accuracy};
use crate::records::{
    NormalizedMetrics, Per90Stats, PercentileRanks, PlayerRating, PlayerRecord, Position,
    PositionGroup, TeamStrengthRecord,
};
use crate::scaling::{
    Scaled, percentile_ranks, rescale_to_range, round_to, scale_inverted, scale_to_max,
};
use crate::team_impact::{TeamCredit, minutes_share, team_minutes};
use crate::weights::WeightSet;

/// Target scale of the published MAX rating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayRange {
    pub lo: f64,
    pub hi: f64,
}

impl Default for DisplayRange {
    fn default() -> Self {
        // Keeps the extremes away from 0 and 100.
        Self { lo: 25.0, hi: 95.0 }
    }
}

impl DisplayRange {
    pub fn midpoint(&self) -> f64 {
        (self.lo + self.hi) / 2.0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ok = self.lo.is_finite()
            && self.hi.is_finite()
            && self.lo >= 0.0
            && self.hi <= 100.0
            && self.lo < self.hi;
        if !ok {
            return Err(ConfigError::Invalid {
                field: "display_range",
                reason: format!("need 0 <= lo < hi <= 100, got [{}, {}]", self.lo, self.hi),
            });
        }
        // MAX is an integer, so the bounds must be reachable by one.
        if self.lo.fract() != 0.0 || self.hi.fract() != 0.0 {
            return Err(ConfigError::Invalid {
                field: "display_range",
                reason: format!("bounds must be whole numbers, got [{}, {}]", self.lo, self.hi),
            });
        }
        Ok(())
    }
}

/// Resolved inputs for a rating run.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingParams {
    pub min_minutes: f64,
    pub exclude_goalkeepers: bool,
    pub team_credit: TeamCredit,
    pub display_range: DisplayRange,
    pub weights: WeightSet,
}

impl Default for RatingParams {
    fn default() -> Self {
        Self {
            min_minutes: 300.0,
            exclude_goalkeepers: true,
            team_credit: TeamCredit::default(),
            display_range: DisplayRange::default(),
            weights: WeightSet::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RatingRun {
    pub ratings: Vec<PlayerRating>,
    pub report: RunReport,
}

struct Candidate<'a> {
    record: &'a PlayerRecord,
    position: Position,
    team: &'a TeamStrengthRecord,
    per90: Per90Stats,
}

/// Rate every eligible player against the team strength table.
///
/// Goalkeepers and players under the minutes floor are filtered, the rest are
/// inner-joined to `teams` by exact team name. Rows that cannot be joined are
/// dropped and reported. The output is sorted by MAX, best first.
pub fn rate_players(
    players: &[PlayerRecord],
    teams: &[TeamStrengthRecord],
    params: &RatingParams,
) -> RatingRun {
    let mut report = RunReport {
        input_rows: players.len(),
        ..RunReport::default()
    };

    let team_index: HashMap<&str, &TeamStrengthRecord> =
        teams.iter().map(|t| (t.team.as_str(), t)).collect();
    let candidates = select_candidates(players, &team_index, params, &mut report);

    if candidates.is_empty() {
        info!(input = players.len(), "no players eligible for rating");
        return RatingRun {
            ratings: Vec::new(),
            report,
        };
    }

    let norm = normalize_population(&candidates, &mut report);
    let totals = team_minutes(
        candidates
            .iter()
            .map(|c| (c.record.team.as_str(), c.record.minutes)),
    );

    let mut ratings: Vec<PlayerRating> = candidates
        .par_iter()
        .enumerate()
        .map(|(idx, c)| {
            let normalized = norm.row(idx, c.team.team.as_str());
            let share = minutes_share(
                c.record.minutes,
                totals.get(c.record.team.as_str()).copied().unwrap_or(0.0),
            );
            let impact = params.team_credit.credit(c.record.minutes, share);
            let overall = composite_rating(&normalized, c.position, impact, &params.weights);
            PlayerRating {
                name: c.record.name.clone(),
                team: c.record.team.clone(),
                conference: c.team.conference.clone(),
                position: c.position,
                minutes: c.record.minutes,
                goals: c.record.goals,
                assists: c.record.assists,
                shots: c.record.shots,
                shots_on_target: c.record.shots_on_target,
                fouls_won: c.record.fouls_won,
                shot_accuracy: shot_accuracy(c.record),
                per90: c.per90,
                normalized,
                team_impact: impact,
                team_minutes_share: share,
                overall_rating: overall,
                max: 0,
                percentiles: None,
            }
        })
        .collect();

    let overall: Vec<f64> = ratings.iter().map(|r| r.overall_rating).collect();
    let groups: Vec<PositionGroup> = ratings.iter().map(|r| r.position.group()).collect();
    let compressed = compress_ratings(&overall, &groups, params.display_range);
    for group in &compressed.degenerate {
        let metric = format!("overall_rating[{group:?}]");
        warn!(%metric, "flat rating distribution, assigning midpoint");
        report.push(DataIssue::DegenerateDistribution {
            metric,
            fallback: params.display_range.midpoint(),
        });
    }
    for (row, max) in ratings.iter_mut().zip(compressed.max) {
        row.max = max;
    }

    assign_percentiles(&mut ratings);

    ratings.sort_by(|a, b| {
        b.max
            .cmp(&a.max)
            .then(b.overall_rating.total_cmp(&a.overall_rating))
            .then(a.name.cmp(&b.name))
    });

    report.rated = ratings.len();
    log_summary(&report);
    RatingRun { ratings, report }
}

fn select_candidates<'a>(
    players: &'a [PlayerRecord],
    team_index: &HashMap<&str, &'a TeamStrengthRecord>,
    params: &RatingParams,
    report: &mut RunReport,
) -> Vec<Candidate<'a>> {
    let mut out = Vec::with_capacity(players.len());
    for record in players {
        let parsed = Position::parse(&record.position);
        if params.exclude_goalkeepers && parsed == Some(Position::Goalkeeper) {
            report.excluded_goalkeepers += 1;
            continue;
        }
        // Written as a negation so NaN minutes are filtered too.
        if !(record.minutes >= params.min_minutes) {
            report.below_minutes_floor += 1;
            continue;
        }
        let Some(team) = team_index.get(record.team.as_str()).copied() else {
            report.push(DataIssue::MissingTeamStrength {
                player: record.name.clone(),
                team: record.team.clone(),
            });
            continue;
        };
        let Some(rates) = per90(record) else {
            report.push(DataIssue::DataQuality {
                player: record.name.clone(),
                detail: format!("unusable minutes value {}", record.minutes),
            });
            continue;
        };
        let position = match parsed {
            Some(p) => p,
            None => {
                debug!(player = %record.name, label = %record.position, "unrecognized position");
                report.push(DataIssue::DataQuality {
                    player: record.name.clone(),
                    detail: format!(
                        "unrecognized position '{}', using Unknown weights",
                        record.position
                    ),
                });
                Position::Unknown
            }
        };
        out.push(Candidate {
            record,
            position,
            team,
            per90: rates,
        });
    }
    out
}

struct PopulationNorms<'a> {
    goals: Vec<f64>,
    assists: Vec<f64>,
    shots: Vec<f64>,
    shots_on_target: Vec<f64>,
    fouls_won: Vec<f64>,
    teams: HashMap<&'a str, (f64, f64)>,
}

impl PopulationNorms<'_> {
    fn row(&self, idx: usize, team: &str) -> NormalizedMetrics {
        let (team_attack, team_defense) = self.teams.get(team).copied().unwrap_or((0.0, 0.0));
        NormalizedMetrics {
            goals: self.goals[idx],
            assists: self.assists[idx],
            shots: self.shots[idx],
            shots_on_target: self.shots_on_target[idx],
            fouls_won: self.fouls_won[idx],
            team_attack,
            team_defense,
        }
    }
}

fn normalize_population<'a>(
    candidates: &[Candidate<'a>],
    report: &mut RunReport,
) -> PopulationNorms<'a> {
    let column = |f: fn(&Per90Stats) -> f64| -> Vec<f64> {
        candidates.iter().map(|c| f(&c.per90)).collect()
    };
    let mut track = |metric: &str, scaled: Scaled| -> Vec<f64> {
        if scaled.degenerate {
            warn!(metric, "flat distribution, normalizing to 0");
            report.push(DataIssue::DegenerateDistribution {
                metric: metric.to_string(),
                fallback: 0.0,
            });
        }
        scaled.values
    };

    let goals = track("goals_per90", scale_to_max(&column(|p| p.goals)));
    let assists = track("assists_per90", scale_to_max(&column(|p| p.assists)));
    let shots = track("shots_per90", scale_to_max(&column(|p| p.shots)));
    let shots_on_target = track(
        "shots_on_target_per90",
        scale_to_max(&column(|p| p.shots_on_target)),
    );
    let fouls_won = track("fouls_won_per90", scale_to_max(&column(|p| p.fouls_won)));

    // Team metrics are scaled over the distinct teams that survived the join.
    let mut joined: Vec<&'a TeamStrengthRecord> = Vec::new();
    let mut seen: HashMap<&'a str, ()> = HashMap::new();
    for c in candidates {
        if seen.insert(c.team.team.as_str(), ()).is_none() {
            joined.push(c.team);
        }
    }
    let att = track(
        "team_att",
        scale_to_max(&joined.iter().map(|t| t.att).collect::<Vec<_>>()),
    );
    let def = track(
        "team_def",
        scale_inverted(&joined.iter().map(|t| t.def).collect::<Vec<_>>()),
    );
    let teams = joined
        .iter()
        .enumerate()
        .map(|(i, t)| (t.team.as_str(), (att[i], def[i])))
        .collect();

    PopulationNorms {
        goals,
        assists,
        shots,
        shots_on_target,
        fouls_won,
        teams,
    }
}

/// Team strength a position is credited with. Midfielders and unclassified
/// players take the mean of attack and (inverted) defense.
pub fn team_component(position: Position, n: &NormalizedMetrics) -> f64 {
    match position {
        Position::Forward => n.team_attack,
        Position::Defender => n.team_defense,
        Position::Midfielder | Position::Goalkeeper | Position::Unknown => {
            (n.team_attack + n.team_defense) / 2.0
        }
    }
}

/// `100 × Σ metric·weight`, with the team component scaled by `team_impact`.
pub fn composite_rating(
    n: &NormalizedMetrics,
    position: Position,
    team_impact: f64,
    weights: &WeightSet,
) -> f64 {
    let w = weights.for_position(position);
    100.0
        * (n.goals * w.goals
            + n.assists * w.assists
            + n.shots * w.shots
            + n.fouls_won * w.fouls_won
            + team_component(position, n) * team_impact * w.team)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Compressed {
    pub max: Vec<u8>,
    pub degenerate: Vec<PositionGroup>,
}

/// `log1p` then min-max onto the display range, separately per position group.
pub fn compress_ratings(
    overall: &[f64],
    groups: &[PositionGroup],
    range: DisplayRange,
) -> Compressed {
    debug_assert_eq!(overall.len(), groups.len());
    let mut max = vec![0u8; overall.len()];
    let mut degenerate = Vec::new();
    // Integer bounds inside the range, so rounding never escapes it.
    let lo = range.lo.max(0.0).ceil();
    let hi = range.hi.min(255.0).floor().max(lo);

    for group in [PositionGroup::Known, PositionGroup::Unknown] {
        let members: Vec<usize> = (0..overall.len()).filter(|&i| groups[i] == group).collect();
        if members.is_empty() {
            continue;
        }
        let logs: Vec<f64> = members.iter().map(|&i| overall[i].max(0.0).ln_1p()).collect();
        let scaled = rescale_to_range(&logs, range.lo, range.hi);
        if scaled.degenerate {
            degenerate.push(group);
        }
        for (&i, value) in members.iter().zip(scaled.values) {
            max[i] = value.round().clamp(lo, hi) as u8;
        }
    }

    Compressed { max, degenerate }
}

fn assign_percentiles(ratings: &mut [PlayerRating]) {
    for position in Position::OUTFIELD {
        let members: Vec<usize> = (0..ratings.len())
            .filter(|&i| ratings[i].position == position)
            .collect();
        if members.is_empty() {
            continue;
        }
        let ranks = |f: fn(&Per90Stats) -> f64| -> Vec<f64> {
            let values: Vec<f64> = members.iter().map(|&i| f(&ratings[i].per90)).collect();
            percentile_ranks(&values)
                .into_iter()
                .map(|p| round_to(p, 1))
                .collect()
        };
        let goals = ranks(|p| p.goals);
        let assists = ranks(|p| p.assists);
        let shots = ranks(|p| p.shots);
        let shots_on_target = ranks(|p| p.shots_on_target);
        let fouls_won = ranks(|p| p.fouls_won);
        for (k, &i) in members.iter().enumerate() {
            ratings[i].percentiles = Some(PercentileRanks {
                goals: goals[k],
                assists: assists[k],
                shots: shots[k],
                shots_on_target: shots_on_target[k],
                fouls_won: fouls_won[k],
            });
        }
    }
}

fn log_summary(report: &RunReport) {
    if report.missing_team_strength > 0 {
        let mut by_team: BTreeMap<&str, usize> = BTreeMap::new();
        for issue in &report.issues {
            if let DataIssue::MissingTeamStrength { team, .. } = issue {
                *by_team.entry(team.as_str()).or_insert(0) += 1;
            }
        }
        for (team, players) in &by_team {
            warn!(team, players, "players dropped: team missing from strength table");
        }
    }
    info!(
        input = report.input_rows,
        rated = report.rated,
        goalkeepers = report.excluded_goalkeepers,
        below_floor = report.below_minutes_floor,
        missing_team = report.missing_team_strength,
        data_quality = report.data_quality_count(),
        degenerate = report.degenerate_count(),
        "player rating run complete"
    );
}

pub fn find_player<'a>(ratings: &'a [PlayerRating], name: &str) -> Option<&'a PlayerRating> {
    ratings.iter().find(|r| r.name == name)
}

/// Best `n` players at a position, assuming `ratings` is sorted as returned by
/// [`rate_players`].
pub fn top_by_position(
    ratings: &[PlayerRating],
    position: Position,
    n: usize,
) -> Vec<&PlayerRating> {
    ratings
        .iter()
        .filter(|r| r.position == position)
        .take(n)
        .collect()
}
