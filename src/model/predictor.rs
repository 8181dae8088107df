use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use super::factors::FACTORS;
use super::types::{ConfidenceLevel, GameInput, PredictionResult, SideScores};

/// Run the model against `input`, stamped with the current time.
pub fn predict_game(input: &GameInput) -> PredictionResult {
    predict_game_at(input, Utc::now())
}

/// Run the model with a caller-supplied timestamp.
///
/// Pure: identical `(input, timestamp)` pairs always produce identical results.
pub fn predict_game_at(input: &GameInput, timestamp: DateTime<Utc>) -> PredictionResult {
    let mut totals = SideScores::new(0.0, 0.0);
    let mut factor_breakdown = BTreeMap::new();

    for row in FACTORS.iter() {
        let scores = (row.score)(input);
        totals.home += scores.home * row.weight;
        totals.away += scores.away * row.weight;
        factor_breakdown.insert(row.factor, scores);
    }

    let combined = totals.home + totals.away;
    let home_share = if combined > 0.0 {
        // Negative factor scores (e.g. a save % under .850) can push the raw
        // share past either end.
        (totals.home / combined * 100.0).clamp(0.0, 100.0)
    } else {
        50.0
    };
    let away_share = 100.0 - home_share;

    // Winner and level come from the unrounded shares; only the stored
    // numbers are rounded. Ties go to the home team.
    let predicted_winner = if away_share > home_share {
        input.away_team.clone()
    } else {
        input.home_team.clone()
    };
    let spread = (home_share - away_share).abs();
    let level = confidence_level(spread);

    // The away side is the rounded complement so the pair always sums to 100.
    let home_probability = round2(home_share);
    let away_probability = round2(100.0 - home_probability);
    let confidence = round2(spread);

    debug!(
        "{} vs {}: raw {:.3}/{:.3} → {:.2}%/{:.2}% ({})",
        input.home_team,
        input.away_team,
        totals.home,
        totals.away,
        home_probability,
        away_probability,
        level
    );

    PredictionResult {
        timestamp,
        home_team: input.home_team.clone(),
        away_team: input.away_team.clone(),
        home_probability,
        away_probability,
        predicted_winner,
        confidence,
        confidence_level: level,
        factor_breakdown,
        raw_scores: totals,
    }
}

/// Bucket a probability spread. Lower bounds are inclusive.
pub fn confidence_level(confidence: f64) -> ConfidenceLevel {
    if confidence >= 20.0 {
        ConfidenceLevel::VeryHigh
    } else if confidence >= 15.0 {
        ConfidenceLevel::High
    } else if confidence >= 10.0 {
        ConfidenceLevel::Moderate
    } else if confidence >= 5.0 {
        ConfidenceLevel::Low
    } else {
        ConfidenceLevel::TossUp
    }
}

/// One row of the published weight table
#[derive(Debug, Clone, Serialize)]
pub struct WeightInfo {
    pub factor: &'static str,
    pub label: &'static str,
    pub weight: f64,
    pub description: &'static str,
}

/// The model weights with their human descriptions, in evaluation order.
pub fn weights_info() -> Vec<WeightInfo> {
    FACTORS
        .iter()
        .map(|row| WeightInfo {
            factor: row.factor.key(),
            label: row.factor.label(),
            weight: row.weight,
            description: row.description,
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::Factor;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use proptest::prelude::*;

    const HOME_ICE_POINTS: f64 = 100.0 * 0.05;

    fn frozen() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 19, 0, 0).unwrap()
    }

    fn even_matchup() -> GameInput {
        GameInput::with_defaults("Maple Leafs", "Bruins")
    }

    // ── Scenarios ────────────────────────────────────────────────────────────

    #[test]
    fn identical_stat_lines_home_ice_decides() {
        let result = predict_game_at(&even_matchup(), frozen());
        // Every factor but home ice is 50/50: 0.95 * 50 + 5 vs 0.95 * 50
        assert_relative_eq!(result.raw_scores.home, 52.5, epsilon = 1e-9);
        assert_relative_eq!(result.raw_scores.away, 47.5, epsilon = 1e-9);
        assert_relative_eq!(result.home_probability, 52.5, epsilon = 1e-9);
        assert_relative_eq!(result.away_probability, 47.5, epsilon = 1e-9);
        assert_eq!(result.predicted_winner, "Maple Leafs");
        assert_relative_eq!(result.confidence, 5.0, epsilon = 1e-9);
        assert_eq!(result.confidence_level, ConfidenceLevel::Low);
    }

    #[test]
    fn massey_edge_scenario_matches_reference() {
        let mut input = even_matchup();
        input.home_massey = 60.0;
        input.away_massey = 40.0;
        let result = predict_game_at(&input, frozen());

        let neutral_weight: f64 = FACTORS
            .iter()
            .filter(|s| s.factor != Factor::Massey && s.factor != Factor::HomeIce)
            .map(|s| s.weight)
            .sum();
        let home_total = 0.25 * 60.0 + neutral_weight * 50.0 + HOME_ICE_POINTS;
        let away_total = 0.25 * 40.0 + neutral_weight * 50.0;
        let expected_home = home_total / (home_total + away_total) * 100.0;

        assert!(result.home_probability > 50.0);
        assert_eq!(result.predicted_winner, input.home_team);
        assert_relative_eq!(result.home_probability, expected_home, epsilon = 0.005);
        assert_relative_eq!(
            result.confidence,
            (2.0 * expected_home - 100.0).abs(),
            epsilon = 0.02
        );
        assert_eq!(
            result.confidence_level,
            confidence_level(result.confidence)
        );
    }

    #[test]
    fn breakdown_has_exactly_the_nine_weighted_factors() {
        let result = predict_game_at(&even_matchup(), frozen());
        let keys: Vec<Factor> = result.factor_breakdown.keys().copied().collect();
        let table: Vec<Factor> = FACTORS.iter().map(|s| s.factor).collect();
        assert_eq!(keys, table);
        assert_eq!(
            result.factor_breakdown[&Factor::HomeIce],
            SideScores::new(100.0, 0.0)
        );
    }

    #[test]
    fn corsi_and_fenwick_do_not_move_the_model() {
        let base = predict_game_at(&even_matchup(), frozen());
        let mut input = even_matchup();
        input.home_corsi_pct = 70.0;
        input.away_corsi_pct = 30.0;
        input.home_fenwick_pct = 10.0;
        input.away_fenwick_pct = 90.0;
        assert_eq!(predict_game_at(&input, frozen()), base);
    }

    #[test]
    fn stronger_away_team_is_picked() {
        let mut input = even_matchup();
        input.away_massey = 75.0;
        input.away_xg_pct = 58.0;
        input.home_xg_pct = 42.0;
        input.away_last10_wins = 8;
        input.away_last10_losses = 2;
        let result = predict_game_at(&input, frozen());
        assert_eq!(result.predicted_winner, "Bruins");
        assert!(result.away_probability > result.home_probability);
    }

    #[test]
    fn swap_moves_the_edge_but_keeps_home_ice() {
        let mut input = even_matchup();
        input.home_massey = 65.0;
        input.away_massey = 45.0;
        input.home_xg_pct = 56.0;
        input.away_xg_pct = 44.0;
        let original = predict_game_at(&input, frozen());
        let swapped = predict_game_at(&input.swapped(), frozen());

        assert_eq!(original.predicted_winner, "Maple Leafs");
        assert_eq!(swapped.predicted_winner, "Maple Leafs");
        // Without the home-ice credit the totals mirror exactly; with it the
        // original home side keeps 5 extra points it loses after the swap.
        assert_relative_eq!(
            original.raw_scores.home - HOME_ICE_POINTS,
            swapped.raw_scores.away,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            original.raw_scores.away,
            swapped.raw_scores.home - HOME_ICE_POINTS,
            epsilon = 1e-9
        );
        assert!(original.home_probability > swapped.away_probability);
    }

    #[test]
    fn all_zero_inputs_fall_back_to_even_split() {
        let mut input = even_matchup();
        input.home_massey = 0.0;
        input.away_massey = 0.0;
        input.home_xg_pct = 0.0;
        input.away_xg_pct = 0.0;
        input.home_hd_pct = 0.0;
        input.away_hd_pct = 0.0;
        let result = predict_game_at(&input, frozen());
        assert_eq!(
            result.factor_breakdown[&Factor::Massey],
            SideScores::even()
        );
        assert_relative_eq!(
            result.home_probability + result.away_probability,
            100.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn input_is_left_untouched() {
        let input = even_matchup();
        let before = input.clone();
        let _ = predict_game(&input);
        assert_eq!(input, before);
    }

    #[test]
    fn timestamp_is_the_supplied_instant() {
        let result = predict_game_at(&even_matchup(), frozen());
        assert_eq!(result.timestamp, frozen());
    }

    /// Home share of the weighted totals before any rounding.
    fn raw_home_share(r: &PredictionResult) -> f64 {
        let combined = r.raw_scores.home + r.raw_scores.away;
        (r.raw_scores.home / combined * 100.0).clamp(0.0, 100.0)
    }

    /// Shift xG share from home to away by `shift` points. Every other factor
    /// stays even, so the home share is `52.5 - 0.2 * shift`.
    fn xg_tilted(shift: f64) -> GameInput {
        let mut input = even_matchup();
        input.home_xg_pct = 50.0 - shift;
        input.away_xg_pct = 50.0 + shift;
        input
    }

    #[test]
    fn near_even_split_goes_to_the_larger_unrounded_share() {
        // Raw 49.997 / 50.003: both round to 50.00 but the away side is ahead.
        let result = predict_game_at(&xg_tilted(12.515), frozen());
        assert_relative_eq!(raw_home_share(&result), 49.997, epsilon = 1e-9);
        assert_relative_eq!(result.home_probability, 50.0);
        assert_relative_eq!(result.away_probability, 50.0);
        assert_eq!(result.predicted_winner, "Bruins");
        assert_eq!(result.confidence_level, ConfidenceLevel::TossUp);
    }

    #[test]
    fn level_uses_unrounded_spread() {
        // Raw spread 4.996 is stored as 5.00 but still classifies as a toss-up.
        let result = predict_game_at(&xg_tilted(0.01), frozen());
        assert_relative_eq!(result.confidence, 5.0);
        assert_relative_eq!(result.home_probability, 52.5);
        assert_eq!(result.predicted_winner, "Maple Leafs");
        assert_eq!(result.confidence_level, ConfidenceLevel::TossUp);
    }

    #[test]
    fn out_of_range_share_is_clamped() {
        // A .500 save % drives the goalie score, and the home total, negative.
        let mut input = even_matchup();
        input.home_goalie_sv_pct = 0.5;
        let result = predict_game_at(&input, frozen());
        assert!(result.raw_scores.home < 0.0);
        assert_relative_eq!(result.home_probability, 0.0);
        assert_relative_eq!(result.away_probability, 100.0);
        assert_relative_eq!(result.confidence, 100.0);
        assert_eq!(result.predicted_winner, "Bruins");
        assert_eq!(result.confidence_level, ConfidenceLevel::VeryHigh);
    }

    // ── Confidence buckets ───────────────────────────────────────────────────

    #[test]
    fn confidence_thresholds_are_inclusive() {
        assert_eq!(confidence_level(20.0), ConfidenceLevel::VeryHigh);
        assert_eq!(confidence_level(19.99), ConfidenceLevel::High);
        assert_eq!(confidence_level(15.0), ConfidenceLevel::High);
        assert_eq!(confidence_level(10.0), ConfidenceLevel::Moderate);
        assert_eq!(confidence_level(5.0), ConfidenceLevel::Low);
        assert_eq!(confidence_level(4.999), ConfidenceLevel::TossUp);
        assert_eq!(confidence_level(0.0), ConfidenceLevel::TossUp);
        assert_eq!(confidence_level(100.0), ConfidenceLevel::VeryHigh);
    }

    #[test]
    fn weights_info_follows_table() {
        let info = weights_info();
        assert_eq!(info.len(), 9);
        assert_eq!(info[0].factor, "massey");
        assert_relative_eq!(info[0].weight, 0.25);
        assert_eq!(info[8].label, "Injuries");
    }

    #[test]
    fn round2_behaviour() {
        assert_relative_eq!(round2(52.504_9), 52.5);
        assert_relative_eq!(round2(47.126), 47.13);
    }

    // ── Properties ───────────────────────────────────────────────────────────

    fn game_input_strategy() -> impl Strategy<Value = GameInput> {
        let ratings = (1.0..100.0f64, 1.0..100.0f64);
        let shares = (0.0..100.0f64, 0.0..100.0f64, 0.0..100.0f64, 0.0..100.0f64);
        let dead = (0.0..100.0f64, 0.0..100.0f64, 0.0..100.0f64, 0.0..100.0f64);
        let form = (0..=10u32, 0..=10u32, 0..=10u32, 0..=10u32);
        let goalies = (0.85..0.95f64, 1.5..4.0f64, 0.85..0.95f64, 1.5..4.0f64);
        let special = (5.0..35.0f64, 65.0..95.0f64, 5.0..35.0f64, 65.0..95.0f64);
        let misc = (0..=6u32, 0..=6u32, 0..=12i32, 0..=12i32);

        (ratings, shares, dead, form, goalies, special, misc).prop_map(
            |(
                (home_massey, away_massey),
                (home_xg_pct, away_xg_pct, home_hd_pct, away_hd_pct),
                (home_corsi_pct, away_corsi_pct, home_fenwick_pct, away_fenwick_pct),
                (home_last10_wins, home_last10_losses, away_last10_wins, away_last10_losses),
                (home_goalie_sv_pct, home_goalie_gaa, away_goalie_sv_pct, away_goalie_gaa),
                (home_pp_pct, home_pk_pct, away_pp_pct, away_pk_pct),
                (home_days_rest, away_days_rest, home_injury_impact, away_injury_impact),
            )| GameInput {
                home_team: "Home".into(),
                away_team: "Away".into(),
                home_massey,
                away_massey,
                home_xg_pct,
                away_xg_pct,
                home_hd_pct,
                away_hd_pct,
                home_corsi_pct,
                away_corsi_pct,
                home_fenwick_pct,
                away_fenwick_pct,
                home_last10_wins,
                home_last10_losses,
                away_last10_wins,
                away_last10_losses,
                home_goalie_sv_pct,
                home_goalie_gaa,
                away_goalie_sv_pct,
                away_goalie_gaa,
                home_pp_pct,
                home_pk_pct,
                away_pp_pct,
                away_pk_pct,
                home_days_rest,
                away_days_rest,
                home_injury_impact,
                away_injury_impact,
            },
        )
    }

    proptest! {
        #[test]
        fn probabilities_sum_to_100(input in game_input_strategy()) {
            let r = predict_game_at(&input, frozen());
            prop_assert!((r.home_probability + r.away_probability - 100.0).abs() < 1e-6);
        }

        #[test]
        fn confidence_is_bounded_spread(input in game_input_strategy()) {
            let r = predict_game_at(&input, frozen());
            prop_assert!((0.0..=100.0).contains(&r.confidence));
            prop_assert!(
                (r.confidence - (r.home_probability - r.away_probability).abs()).abs() <= 0.02
            );
            let share = raw_home_share(&r);
            prop_assert_eq!(r.confidence_level, confidence_level((2.0 * share - 100.0).abs()));
        }

        #[test]
        fn winner_holds_the_larger_probability(input in game_input_strategy()) {
            let r = predict_game_at(&input, frozen());
            let share = raw_home_share(&r);
            if r.predicted_winner == input.home_team {
                prop_assert!(share >= 50.0);
                prop_assert!(r.home_probability >= r.away_probability);
            } else {
                prop_assert!(share < 50.0);
                prop_assert!(r.away_probability >= r.home_probability);
            }
        }

        #[test]
        fn normalized_factors_sum_to_100(input in game_input_strategy()) {
            let r = predict_game_at(&input, frozen());
            for (factor, pair) in &r.factor_breakdown {
                if matches!(factor, Factor::Xg | Factor::HighDanger) {
                    continue;
                }
                prop_assert!((pair.home + pair.away - 100.0).abs() < 1e-6, "{}", factor);
            }
        }

        #[test]
        fn deterministic_for_frozen_timestamp(input in game_input_strategy()) {
            prop_assert_eq!(predict_game_at(&input, frozen()), predict_game_at(&input, frozen()));
        }

        #[test]
        fn swap_differs_only_by_home_ice(input in game_input_strategy()) {
            let a = predict_game_at(&input, frozen());
            let b = predict_game_at(&input.swapped(), frozen());
            prop_assert!((a.raw_scores.home - HOME_ICE_POINTS - b.raw_scores.away).abs() < 1e-9);
            prop_assert!((a.raw_scores.away - (b.raw_scores.home - HOME_ICE_POINTS)).abs() < 1e-9);
        }
    }
}
