use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Manually entered statistics for a single matchup.
///
/// Every field is required when deserialized; a missing key surfaces as a
/// serde `missing field` error to whoever is building the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameInput {
    pub home_team: String,
    pub away_team: String,

    /// Massey power ratings (no fixed range, usually near 50)
    pub home_massey: f64,
    pub away_massey: f64,

    /// Expected-goal share, 0–100
    pub home_xg_pct: f64,
    pub away_xg_pct: f64,
    /// High-danger chance share, 0–100
    pub home_hd_pct: f64,
    pub away_hd_pct: f64,
    /// Shot-attempt metrics. Carried for display only; not scored.
    pub home_corsi_pct: f64,
    pub away_corsi_pct: f64,
    pub home_fenwick_pct: f64,
    pub away_fenwick_pct: f64,

    pub home_last10_wins: u32,
    pub home_last10_losses: u32,
    pub away_last10_wins: u32,
    pub away_last10_losses: u32,

    /// Save rate as a fraction (e.g. 0.910)
    pub home_goalie_sv_pct: f64,
    pub home_goalie_gaa: f64,
    pub away_goalie_sv_pct: f64,
    pub away_goalie_gaa: f64,

    pub home_pp_pct: f64,
    pub home_pk_pct: f64,
    pub away_pp_pct: f64,
    pub away_pk_pct: f64,

    pub home_days_rest: u32,
    pub away_days_rest: u32,

    /// 0 = fully healthy, 10 = severe. Not clamped on input.
    pub home_injury_impact: i32,
    pub away_injury_impact: i32,
}

impl GameInput {
    /// A record pre-filled with the neutral defaults the input form starts from.
    pub fn with_defaults(home_team: impl Into<String>, away_team: impl Into<String>) -> Self {
        Self {
            home_team: home_team.into(),
            away_team: away_team.into(),
            home_massey: 50.0,
            away_massey: 50.0,
            home_xg_pct: 50.0,
            away_xg_pct: 50.0,
            home_hd_pct: 50.0,
            away_hd_pct: 50.0,
            home_corsi_pct: 50.0,
            away_corsi_pct: 50.0,
            home_fenwick_pct: 50.0,
            away_fenwick_pct: 50.0,
            home_last10_wins: 5,
            home_last10_losses: 5,
            away_last10_wins: 5,
            away_last10_losses: 5,
            home_goalie_sv_pct: 0.910,
            home_goalie_gaa: 2.75,
            away_goalie_sv_pct: 0.910,
            away_goalie_gaa: 2.75,
            home_pp_pct: 20.0,
            home_pk_pct: 80.0,
            away_pp_pct: 20.0,
            away_pk_pct: 80.0,
            home_days_rest: 1,
            away_days_rest: 1,
            home_injury_impact: 0,
            away_injury_impact: 0,
        }
    }

    /// Reject records the engine should never see.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.home_team.trim().is_empty() {
            return Err(InputError::MissingTeam { side: "home" });
        }
        if self.away_team.trim().is_empty() {
            return Err(InputError::MissingTeam { side: "away" });
        }
        Ok(())
    }

    /// The same matchup seen from the other bench: every home/away pair swapped.
    #[cfg(test)]
    pub fn swapped(&self) -> Self {
        Self {
            home_team: self.away_team.clone(),
            away_team: self.home_team.clone(),
            home_massey: self.away_massey,
            away_massey: self.home_massey,
            home_xg_pct: self.away_xg_pct,
            away_xg_pct: self.home_xg_pct,
            home_hd_pct: self.away_hd_pct,
            away_hd_pct: self.home_hd_pct,
            home_corsi_pct: self.away_corsi_pct,
            away_corsi_pct: self.home_corsi_pct,
            home_fenwick_pct: self.away_fenwick_pct,
            away_fenwick_pct: self.home_fenwick_pct,
            home_last10_wins: self.away_last10_wins,
            home_last10_losses: self.away_last10_losses,
            away_last10_wins: self.home_last10_wins,
            away_last10_losses: self.home_last10_losses,
            home_goalie_sv_pct: self.away_goalie_sv_pct,
            home_goalie_gaa: self.away_goalie_gaa,
            away_goalie_sv_pct: self.home_goalie_sv_pct,
            away_goalie_gaa: self.home_goalie_gaa,
            home_pp_pct: self.away_pp_pct,
            home_pk_pct: self.away_pk_pct,
            away_pp_pct: self.home_pp_pct,
            away_pk_pct: self.home_pk_pct,
            home_days_rest: self.away_days_rest,
            away_days_rest: self.home_days_rest,
            home_injury_impact: self.away_injury_impact,
            away_injury_impact: self.home_injury_impact,
        }
    }
}

/// Caller-side faults in a `GameInput`
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("{side} team name is required")]
    MissingTeam { side: &'static str },
}

/// A home/away pair of scores on a shared scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideScores {
    pub home: f64,
    pub away: f64,
}

impl SideScores {
    pub fn new(home: f64, away: f64) -> Self {
        Self { home, away }
    }

    pub fn even() -> Self {
        Self::new(50.0, 50.0)
    }

    /// Rescale so the pair sums to 100; an all-zero pair becomes 50/50.
    pub fn normalized(self) -> Self {
        let total = self.home + self.away;
        if total == 0.0 {
            return Self::even();
        }
        Self::new(self.home / total * 100.0, self.away / total * 100.0)
    }
}

/// The nine weighted model factors, declared in table order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Massey,
    Xg,
    HighDanger,
    Goalie,
    RecentForm,
    HomeIce,
    SpecialTeams,
    Rest,
    Injuries,
}

impl Factor {
    pub fn key(&self) -> &'static str {
        match self {
            Factor::Massey => "massey",
            Factor::Xg => "xg",
            Factor::HighDanger => "high_danger",
            Factor::Goalie => "goalie",
            Factor::RecentForm => "recent_form",
            Factor::HomeIce => "home_ice",
            Factor::SpecialTeams => "special_teams",
            Factor::Rest => "rest",
            Factor::Injuries => "injuries",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "massey" => Some(Factor::Massey),
            "xg" => Some(Factor::Xg),
            "high_danger" => Some(Factor::HighDanger),
            "goalie" => Some(Factor::Goalie),
            "recent_form" => Some(Factor::RecentForm),
            "home_ice" => Some(Factor::HomeIce),
            "special_teams" => Some(Factor::SpecialTeams),
            "rest" => Some(Factor::Rest),
            "injuries" => Some(Factor::Injuries),
            _ => None,
        }
    }

    /// Label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            Factor::Massey => "Massey Ratings",
            Factor::Xg => "Expected Goals",
            Factor::HighDanger => "High-Danger Chances",
            Factor::Goalie => "Goalie Matchup",
            Factor::RecentForm => "Recent Form",
            Factor::HomeIce => "Home Ice",
            Factor::SpecialTeams => "Special Teams",
            Factor::Rest => "Rest Factor",
            Factor::Injuries => "Injuries",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Certainty bucket derived from the probability spread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    #[serde(rename = "Very High")]
    VeryHigh,
    #[serde(rename = "High")]
    High,
    #[serde(rename = "Moderate")]
    Moderate,
    #[serde(rename = "Low")]
    Low,
    #[serde(rename = "Very Low (Toss-up)")]
    TossUp,
}

impl ConfidenceLevel {
    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceLevel::VeryHigh => "Very High",
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Moderate => "Moderate",
            ConfidenceLevel::Low => "Low",
            ConfidenceLevel::TossUp => "Very Low (Toss-up)",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Very High" => Some(ConfidenceLevel::VeryHigh),
            "High" => Some(ConfidenceLevel::High),
            "Moderate" => Some(ConfidenceLevel::Moderate),
            "Low" => Some(ConfidenceLevel::Low),
            "Very Low (Toss-up)" => Some(ConfidenceLevel::TossUp),
            _ => None,
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Output of a single model run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub timestamp: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    /// Rounded to 2 decimals; sums to 100 with `away_probability`
    pub home_probability: f64,
    pub away_probability: f64,
    pub predicted_winner: String,
    /// |home_probability − away_probability|, 0–100
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    /// Per-factor sub-scores before weighting (0–100 each)
    pub factor_breakdown: BTreeMap<Factor, SideScores>,
    /// Weighted totals before conversion to probabilities
    pub raw_scores: SideScores,
}

impl PredictionResult {
    /// Probability assigned to the predicted winner
    pub fn winning_probability(&self) -> f64 {
        self.home_probability.max(self.away_probability)
    }
}
