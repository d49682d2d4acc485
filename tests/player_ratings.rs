use std::path::PathBuf;

use assert_float_eq::*;

use ncaa_max::error::DataIssue;
use ncaa_max::per90::per90;
use ncaa_max::player_ratings::{RatingParams, find_player, rate_players};
use ncaa_max::records::{PlayerRecord, Position, TeamStrengthRecord};
use ncaa_max::tables;
use ncaa_max::team_impact::TeamCredit;
use ncaa_max::weights::WeightSet;

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn load() -> (Vec<PlayerRecord>, Vec<TeamStrengthRecord>) {
    let players = tables::load_players(&fixture("players.csv")).expect("players fixture");
    let teams = tables::load_teams(&fixture("teams.csv")).expect("teams fixture");
    (players, teams)
}

#[test]
fn fixture_run_filters_and_reports() {
    let (players, teams) = load();
    let run = rate_players(&players, &teams, &RatingParams::default());

    assert_eq!(run.report.input_rows, 19);
    assert_eq!(run.report.excluded_goalkeepers, 1);
    assert_eq!(run.report.below_minutes_floor, 1);
    assert_eq!(run.report.missing_team_strength, 1);
    assert_eq!(run.report.rated, 16);
    assert_eq!(run.ratings.len(), 16);
    assert!(run.report.issues.contains(&DataIssue::MissingTeamStrength {
        player: "Sam Toro".to_string(),
        team: "Evansville".to_string(),
    }));

    // Exactly one unresolvable label; "Unknown" itself is not a data problem.
    assert_eq!(run.report.data_quality_count(), 1);
    assert_eq!(find_player(&run.ratings, "Jo Marsh").unwrap().position, Position::Unknown);
    assert_eq!(find_player(&run.ratings, "Quin Dale").unwrap().position, Position::Unknown);
    assert!(find_player(&run.ratings, "Dee Park").is_none());
    assert!(find_player(&run.ratings, "Rue Blake").is_none());
}

#[test]
fn max_stays_in_display_range_and_output_is_sorted() {
    let (players, teams) = load();
    let params = RatingParams::default();
    let run = rate_players(&players, &teams, &params);
    for r in &run.ratings {
        assert!(
            (params.display_range.lo..=params.display_range.hi).contains(&(r.max as f64)),
            "{} has MAX {}",
            r.name,
            r.max
        );
    }
    assert!(run.ratings.windows(2).all(|w| w[0].max >= w[1].max));

    let known: Vec<u8> = run
        .ratings
        .iter()
        .filter(|r| r.position != Position::Unknown)
        .map(|r| r.max)
        .collect();
    assert_eq!(known.iter().copied().max(), Some(95));
    assert_eq!(known.iter().copied().min(), Some(25));
}

#[test]
fn per90_rates_recover_raw_counts() {
    let (players, _) = load();
    for p in &players {
        let rates = per90(p).unwrap();
        let nineties = p.minutes / 90.0;
        assert_float_absolute_eq!(rates.goals * nineties, p.goals as f64, 1e-9);
        assert_float_absolute_eq!(rates.assists * nineties, p.assists as f64, 1e-9);
        assert_float_absolute_eq!(rates.shots * nineties, p.shots as f64, 1e-9);
        assert_float_absolute_eq!(rates.fouls_won * nineties, p.fouls_won as f64, 1e-9);
    }
}

#[test]
fn normalized_metrics_are_bounded_with_top_at_one() {
    let (players, teams) = load();
    let run = rate_players(&players, &teams, &RatingParams::default());
    let mut top_goals = 0.0_f64;
    let mut top_attack = 0.0_f64;
    let mut top_defense = 0.0_f64;
    for r in &run.ratings {
        let n = r.normalized;
        let values = [
            n.goals,
            n.assists,
            n.shots,
            n.shots_on_target,
            n.fouls_won,
            n.team_attack,
            n.team_defense,
        ];
        for v in values {
            assert!((0.0..=1.0).contains(&v), "{} out of range: {v}", r.name);
        }
        top_goals = top_goals.max(n.goals);
        top_attack = top_attack.max(n.team_attack);
        top_defense = top_defense.max(n.team_defense);
    }
    assert_eq!(top_goals, 1.0);
    assert_eq!(top_attack, 1.0);
    assert_eq!(top_defense, 1.0);
}

#[test]
fn better_defense_gets_higher_normalized_defense() {
    let (players, teams) = load();
    let run = rate_players(&players, &teams, &RatingParams::default());
    let by_team = |team: &str| {
        run.ratings
            .iter()
            .find(|r| r.team == team)
            .map(|r| r.normalized.team_defense)
            .unwrap()
    };
    // DEF: Akron 0.7 < Bowling Green 1.0 < DePaul 1.2 < Creighton 1.3
    assert_eq!(by_team("Akron"), 1.0);
    assert!(by_team("Akron") > by_team("Bowling Green"));
    assert!(by_team("Bowling Green") > by_team("DePaul"));
    assert!(by_team("DePaul") > by_team("Creighton"));
    assert_eq!(by_team("Creighton"), 0.0);
}

#[test]
fn floor_player_without_output_does_not_outrate_productive_teammate() {
    let (players, teams) = load();
    let run = rate_players(&players, &teams, &RatingParams::default());
    let idle = find_player(&run.ratings, "Eli Shaw").unwrap();
    let busy = find_player(&run.ratings, "Fay Ruiz").unwrap();
    assert_eq!(idle.minutes, 300.0);
    assert_eq!(busy.minutes, 300.0);
    assert!(idle.overall_rating < busy.overall_rating);
    assert!(idle.max <= busy.max);
}

#[test]
fn more_goals_never_lowers_max() {
    let (mut players, teams) = load();
    let idx = players.iter().position(|p| p.name == "Kit Moss").unwrap();
    let mut prev = 0u8;
    for goals in 0..=20 {
        players[idx].goals = goals;
        let run = rate_players(&players, &teams, &RatingParams::default());
        let max = find_player(&run.ratings, "Kit Moss").unwrap().max;
        assert!(max >= prev, "MAX fell from {prev} to {max} at {goals} goals");
        prev = max;
    }
}

#[test]
fn identical_players_share_a_max() {
    let (mut players, teams) = load();
    let mut twin = players
        .iter()
        .find(|p| p.name == "Hal Voss")
        .cloned()
        .unwrap();
    twin.name = "Hal Voss II".to_string();
    players.push(twin);
    let run = rate_players(&players, &teams, &RatingParams::default());
    let a = find_player(&run.ratings, "Hal Voss").unwrap();
    let b = find_player(&run.ratings, "Hal Voss II").unwrap();
    assert_eq!(a.overall_rating, b.overall_rating);
    assert_eq!(a.max, b.max);
}

#[test]
fn percentiles_are_per_position_only() {
    let (players, teams) = load();
    let run = rate_players(&players, &teams, &RatingParams::default());
    for r in &run.ratings {
        match r.position {
            Position::Unknown => assert!(r.percentiles.is_none()),
            _ => {
                let p = r.percentiles.unwrap();
                assert!(p.goals > 0.0 && p.goals <= 100.0);
            }
        }
    }
    // Ada Lane leads forwards in goals per 90.
    let ada = find_player(&run.ratings, "Ada Lane").unwrap();
    assert_eq!(ada.percentiles.unwrap().goals, 100.0);
}

#[test]
fn alternative_configurations_still_hold_invariants() {
    let (players, teams) = load();
    let params = RatingParams {
        team_credit: TeamCredit::MinutesShare,
        weights: WeightSet::preset("legacy").unwrap(),
        display_range: ncaa_max::player_ratings::DisplayRange { lo: 0.0, hi: 100.0 },
        ..RatingParams::default()
    };
    let run = rate_players(&players, &teams, &params);
    assert_eq!(run.ratings.len(), 16);
    assert!(run.ratings.iter().all(|r| r.max <= 100));
    let akron_share: f64 = run
        .ratings
        .iter()
        .filter(|r| r.team == "Akron")
        .map(|r| r.team_minutes_share)
        .sum();
    assert_float_absolute_eq!(akron_share, 1.0, 1e-9);
}
