//! How well MAX lines up with an externally supplied list of drafted players.
//! Names match exactly; cleaning them up is the caller's job.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{info, warn};

use crate::records::{PlayerRating, Position};

pub const THRESHOLDS: [u8; 4] = [80, 85, 90, 95];
const UNDRAFTED_MIN_MINUTES: f64 = 800.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftedPlayer {
    pub pick: usize,
    pub name: String,
    pub team: String,
    pub position: Position,
    pub max: u8,
    pub minutes: f64,
    pub goals: u32,
    pub assists: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdShare {
    pub threshold: u8,
    pub count: usize,
    pub share: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionSummary {
    pub position: Position,
    pub count: usize,
    pub mean: f64,
    pub min: u8,
    pub max: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftSummary {
    pub mean: f64,
    pub median: f64,
    pub min: u8,
    pub max: u8,
    /// Share of all rated players whose MAX is below the drafted mean, × 100.
    pub population_percentile: f64,
    pub thresholds: Vec<ThresholdShare>,
    pub by_position: Vec<PositionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftReport {
    pub matched: Vec<DraftedPlayer>,
    pub unmatched: Vec<String>,
    pub summary: Option<DraftSummary>,
    pub top_undrafted: Vec<PlayerRating>,
}

/// One drafted name per line, in pick order. Blank lines and `#` comments
/// are skipped.
pub fn parse_drafted(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn analyze_draft(ratings: &[PlayerRating], drafted: &[String], top_n: usize) -> DraftReport {
    let mut matched = Vec::new();
    let mut unmatched = Vec::new();
    for (idx, name) in drafted.iter().enumerate() {
        match ratings.iter().find(|r| &r.name == name) {
            Some(r) => matched.push(DraftedPlayer {
                pick: idx + 1,
                name: r.name.clone(),
                team: r.team.clone(),
                position: r.position,
                max: r.max,
                minutes: r.minutes,
                goals: r.goals,
                assists: r.assists,
            }),
            None => unmatched.push(name.clone()),
        }
    }
    if !unmatched.is_empty() {
        warn!(count = unmatched.len(), "drafted players without a rating");
    }

    let summary = summarize(ratings, &matched);
    let top_undrafted = match &summary {
        Some(s) => {
            let names: HashSet<&str> = drafted.iter().map(String::as_str).collect();
            let mut pool: Vec<&PlayerRating> = ratings
                .iter()
                .filter(|r| {
                    !names.contains(r.name.as_str())
                        && r.max >= s.min
                        && r.minutes >= UNDRAFTED_MIN_MINUTES
                })
                .collect();
            pool.sort_by(|a, b| b.max.cmp(&a.max).then(a.name.cmp(&b.name)));
            pool.into_iter().take(top_n).cloned().collect()
        }
        None => Vec::new(),
    };

    info!(
        drafted = drafted.len(),
        matched = matched.len(),
        percentile = summary.as_ref().map(|s| s.population_percentile),
        "draft analysis complete"
    );

    DraftReport {
        matched,
        unmatched,
        summary,
        top_undrafted,
    }
}

fn summarize(ratings: &[PlayerRating], matched: &[DraftedPlayer]) -> Option<DraftSummary> {
    if matched.is_empty() {
        return None;
    }
    let mut values: Vec<u8> = matched.iter().map(|p| p.max).collect();
    values.sort_unstable();
    let n = values.len();
    let mean = values.iter().map(|v| *v as f64).sum::<f64>() / n as f64;
    let median = if n % 2 == 1 {
        values[n / 2] as f64
    } else {
        (values[n / 2 - 1] as f64 + values[n / 2] as f64) / 2.0
    };

    let below = ratings.iter().filter(|r| (r.max as f64) < mean).count();
    let population_percentile = if ratings.is_empty() {
        0.0
    } else {
        below as f64 / ratings.len() as f64 * 100.0
    };

    let thresholds = THRESHOLDS
        .iter()
        .map(|&threshold| {
            let count = values.iter().filter(|v| **v >= threshold).count();
            ThresholdShare {
                threshold,
                count,
                share: count as f64 / n as f64,
            }
        })
        .collect();

    let mut groups: BTreeMap<Position, Vec<u8>> = BTreeMap::new();
    for p in matched {
        groups.entry(p.position).or_default().push(p.max);
    }
    let by_position = groups
        .into_iter()
        .map(|(position, v)| PositionSummary {
            position,
            count: v.len(),
            mean: v.iter().map(|x| *x as f64).sum::<f64>() / v.len() as f64,
            min: v.iter().copied().min().unwrap_or(0),
            max: v.iter().copied().max().unwrap_or(0),
        })
        .collect();

    Some(DraftSummary {
        mean,
        median,
        min: values[0],
        max: values[n - 1],
        population_percentile,
        thresholds,
        by_position,
    })
}
