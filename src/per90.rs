use crate::records::{Per90Stats, PlayerRecord};

/// Convert a player's counting stats into per-90-minute rates. Returns `None`
/// when the player has no positive, finite minutes.
pub fn per90(record: &PlayerRecord) -> Option<Per90Stats> {
    if !record.minutes.is_finite() || record.minutes <= 0.0 {
        return None;
    }
    let nineties = record.minutes / 90.0;
    let rate = |count: u32| count as f64 / nineties;
    Some(Per90Stats {
        goals: rate(record.goals),
        assists: rate(record.assists),
        shots: rate(record.shots),
        shots_on_target: rate(record.shots_on_target),
        fouls_won: rate(record.fouls_won),
    })
}

pub fn shot_accuracy(record: &PlayerRecord) -> f64 {
    if record.shots == 0 {
        0.0
    } else {
        record.shots_on_target as f64 / record.shots as f64
    }
}
