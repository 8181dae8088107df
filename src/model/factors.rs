//! The nine scoring factors of the matchup model.
//!
//! Each factor maps a `GameInput` onto a home/away pair on a comparable
//! 0–100 scale. The table below fixes the evaluation order and the weights;
//! the aggregation in `predictor` only ever walks this table, so adding a
//! factor means adding a row here.
//!
//! Corsi% and Fenwick% are deliberately absent: they are collected for the
//! report but no factor reads them.

use super::types::{Factor, GameInput, SideScores};

/// One row of the model: what is scored, how much it counts, and how.
#[derive(Debug, Clone, Copy)]
pub struct WeightedFactor {
    pub factor: Factor,
    pub weight: f64,
    pub description: &'static str,
    pub score: fn(&GameInput) -> SideScores,
}

pub static FACTORS: [WeightedFactor; 9] = [
    WeightedFactor {
        factor: Factor::Massey,
        weight: 0.25,
        description: "Comprehensive power rankings",
        score: massey,
    },
    WeightedFactor {
        factor: Factor::Xg,
        weight: 0.20,
        description: "Quality scoring chances",
        score: expected_goals,
    },
    WeightedFactor {
        factor: Factor::HighDanger,
        weight: 0.15,
        description: "Premium scoring opportunities",
        score: high_danger,
    },
    WeightedFactor {
        factor: Factor::Goalie,
        weight: 0.15,
        description: "Save % and GAA comparison",
        score: goalie,
    },
    WeightedFactor {
        factor: Factor::RecentForm,
        weight: 0.10,
        description: "Last 10 games performance",
        score: recent_form,
    },
    WeightedFactor {
        factor: Factor::HomeIce,
        weight: 0.05,
        description: "Historical home advantage",
        score: home_ice,
    },
    WeightedFactor {
        factor: Factor::SpecialTeams,
        weight: 0.05,
        description: "PP and PK efficiency",
        score: special_teams,
    },
    WeightedFactor {
        factor: Factor::Rest,
        weight: 0.03,
        description: "Days since last game",
        score: rest,
    },
    WeightedFactor {
        factor: Factor::Injuries,
        weight: 0.02,
        description: "Impact of key player availability",
        score: injuries,
    },
];

// ── Ratings and shot share ───────────────────────────────────────────────────

fn massey(input: &GameInput) -> SideScores {
    SideScores::new(input.home_massey, input.away_massey).normalized()
}

/// xG% is already each team's share of the matchup, so it passes through.
fn expected_goals(input: &GameInput) -> SideScores {
    SideScores::new(input.home_xg_pct, input.away_xg_pct)
}

fn high_danger(input: &GameInput) -> SideScores {
    SideScores::new(input.home_hd_pct, input.away_hd_pct)
}

// ── Goaltending ──────────────────────────────────────────────────────────────
//
// Save % is stretched so that .850 → 0 and .900 → 10; GAA is inverted so that
// 4.00 → 0 and 2.00 → 50. The two are averaged per goalie before the pair is
// normalized.

const SV_PCT_FLOOR: f64 = 0.850;
const SV_PCT_SCALE: f64 = 200.0;
const GAA_CEILING: f64 = 4.0;
const GAA_SCALE: f64 = 25.0;

fn goalie_rating(sv_pct: f64, gaa: f64) -> f64 {
    let sv_score = (sv_pct - SV_PCT_FLOOR) * SV_PCT_SCALE;
    let gaa_score = ((GAA_CEILING - gaa) * GAA_SCALE).max(0.0);
    (sv_score + gaa_score) / 2.0
}

fn goalie(input: &GameInput) -> SideScores {
    SideScores::new(
        goalie_rating(input.home_goalie_sv_pct, input.home_goalie_gaa),
        goalie_rating(input.away_goalie_sv_pct, input.away_goalie_gaa),
    )
    .normalized()
}

// ── Form ─────────────────────────────────────────────────────────────────────

const FORM_WINDOW: f64 = 10.0;

/// Win share over a fixed ten-game window; no games on record reads as .500.
fn form_pct(wins: u32, losses: u32) -> f64 {
    if wins + losses == 0 {
        return 50.0;
    }
    wins as f64 / FORM_WINDOW * 100.0
}

fn recent_form(input: &GameInput) -> SideScores {
    SideScores::new(
        form_pct(input.home_last10_wins, input.home_last10_losses),
        form_pct(input.away_last10_wins, input.away_last10_losses),
    )
    .normalized()
}

// ── Venue ────────────────────────────────────────────────────────────────────

/// Unconditional full credit to the home side. This is the only factor that
/// is not symmetric under a home/away swap.
fn home_ice(_input: &GameInput) -> SideScores {
    SideScores::new(100.0, 0.0)
}

fn special_teams(input: &GameInput) -> SideScores {
    SideScores::new(
        (input.home_pp_pct + input.home_pk_pct) / 2.0,
        (input.away_pp_pct + input.away_pk_pct) / 2.0,
    )
    .normalized()
}

// ── Schedule and roster ──────────────────────────────────────────────────────

const REST_CAP_DAYS: u32 = 3;
const REST_POINTS_PER_DAY: f64 = 25.0;
const REST_EDGE_BONUS: f64 = 25.0;

fn rest(input: &GameInput) -> SideScores {
    let mut home = input.home_days_rest.min(REST_CAP_DAYS) as f64 * REST_POINTS_PER_DAY;
    let mut away = input.away_days_rest.min(REST_CAP_DAYS) as f64 * REST_POINTS_PER_DAY;

    // The edge bonus compares uncapped days.
    match input.home_days_rest.cmp(&input.away_days_rest) {
        std::cmp::Ordering::Greater => home += REST_EDGE_BONUS,
        std::cmp::Ordering::Less => away += REST_EDGE_BONUS,
        std::cmp::Ordering::Equal => {
            home += REST_EDGE_BONUS / 2.0;
            away += REST_EDGE_BONUS / 2.0;
        }
    }

    SideScores::new(home, away).normalized()
}

const INJURY_SCALE_MAX: i32 = 10;

fn injury_health(impact: i32) -> f64 {
    (INJURY_SCALE_MAX - impact).max(0) as f64 * 10.0
}

fn injuries(input: &GameInput) -> SideScores {
    SideScores::new(
        injury_health(input.home_injury_impact),
        injury_health(input.away_injury_impact),
    )
    .normalized()
}
