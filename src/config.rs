use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::model::GameInput;

/// Weighted-factor NHL game predictor
#[derive(Parser, Debug, Clone)]
#[command(name = "nhl-predictor", version, about)]
pub struct Config {
    /// SQLite database holding the prediction history
    #[arg(long, env = "DATABASE_PATH", default_value = "data/predictions.db", global = true)]
    pub database_path: String,

    /// Directory that reports are written to
    #[arg(long, env = "REPORT_DIR", default_value = "predictions", global = true)]
    pub report_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Predict a game from manually entered stats and store the result
    Predict {
        /// Read the full game input from a JSON file instead of flags
        #[arg(long, conflicts_with_all = ["home_team", "away_team"])]
        input: Option<PathBuf>,

        #[command(flatten)]
        game: GameArgs,

        /// Also write a report to the report directory
        #[arg(long)]
        report: bool,

        /// Write the report as PDF instead of text
        #[arg(long, requires = "report")]
        pdf: bool,

        /// Do not append the result to the prediction history
        #[arg(long)]
        no_save: bool,

        /// Print the result as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// List stored predictions, oldest first
    History {
        /// Show only the most recent N predictions
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Show the most recent stored prediction
    Latest,
    /// Aggregate statistics over the prediction history
    Stats,
    /// Show the model weights
    Weights,
    /// Display a CSV/TSV file as a table
    Import {
        /// File to display
        path: PathBuf,
    },
    /// Write a report for the most recent stored prediction
    Report {
        /// Write PDF instead of text
        #[arg(long)]
        pdf: bool,
    },
    /// Serve the JSON prediction API
    Serve {
        /// Listen address
        #[arg(long, env = "DASHBOARD_ADDR", default_value = "127.0.0.1:8080")]
        addr: String,
    },
}

/// Game input flags. Anything left unset takes the neutral matchup value
/// from `GameInput::with_defaults`.
#[derive(Args, Debug, Clone)]
pub struct GameArgs {
    #[arg(long)]
    pub home_team: Option<String>,
    #[arg(long)]
    pub away_team: Option<String>,

    #[arg(long)]
    pub home_massey: Option<f64>,
    #[arg(long)]
    pub away_massey: Option<f64>,
    #[arg(long)]
    pub home_xg_pct: Option<f64>,
    #[arg(long)]
    pub away_xg_pct: Option<f64>,
    #[arg(long)]
    pub home_hd_pct: Option<f64>,
    #[arg(long)]
    pub away_hd_pct: Option<f64>,
    #[arg(long)]
    pub home_corsi_pct: Option<f64>,
    #[arg(long)]
    pub away_corsi_pct: Option<f64>,
    #[arg(long)]
    pub home_fenwick_pct: Option<f64>,
    #[arg(long)]
    pub away_fenwick_pct: Option<f64>,

    #[arg(long)]
    pub home_last10_wins: Option<u32>,
    #[arg(long)]
    pub home_last10_losses: Option<u32>,
    #[arg(long)]
    pub away_last10_wins: Option<u32>,
    #[arg(long)]
    pub away_last10_losses: Option<u32>,

    #[arg(long)]
    pub home_goalie_sv_pct: Option<f64>,
    #[arg(long)]
    pub home_goalie_gaa: Option<f64>,
    #[arg(long)]
    pub away_goalie_sv_pct: Option<f64>,
    #[arg(long)]
    pub away_goalie_gaa: Option<f64>,

    #[arg(long)]
    pub home_pp_pct: Option<f64>,
    #[arg(long)]
    pub home_pk_pct: Option<f64>,
    #[arg(long)]
    pub away_pp_pct: Option<f64>,
    #[arg(long)]
    pub away_pk_pct: Option<f64>,

    #[arg(long)]
    pub home_days_rest: Option<u32>,
    #[arg(long)]
    pub away_days_rest: Option<u32>,

    #[arg(long, allow_hyphen_values = true)]
    pub home_injury_impact: Option<i32>,
    #[arg(long, allow_hyphen_values = true)]
    pub away_injury_impact: Option<i32>,
}

/// Copy every flag that was given onto `$input`.
macro_rules! overlay {
    ($args:expr => $input:ident; $($field:ident),* $(,)?) => {
        $(
            if let Some(value) = $args.$field {
                $input.$field = value;
            }
        )*
    };
}

impl GameArgs {
    /// Assemble a `GameInput`; both team names must have been given.
    pub fn to_input(&self) -> anyhow::Result<GameInput> {
        let (Some(home_team), Some(away_team)) = (&self.home_team, &self.away_team) else {
            anyhow::bail!("Please enter both team names (--home-team and --away-team) or pass --input.");
        };
        let mut input = GameInput::with_defaults(home_team.as_str(), away_team.as_str());
        overlay!(self => input;
            home_massey, away_massey,
            home_xg_pct, away_xg_pct,
            home_hd_pct, away_hd_pct,
            home_corsi_pct, away_corsi_pct,
            home_fenwick_pct, away_fenwick_pct,
            home_last10_wins, home_last10_losses,
            away_last10_wins, away_last10_losses,
            home_goalie_sv_pct, home_goalie_gaa,
            away_goalie_sv_pct, away_goalie_gaa,
            home_pp_pct, home_pk_pct,
            away_pp_pct, away_pk_pct,
            home_days_rest, away_days_rest,
            home_injury_impact, away_injury_impact,
        );
        Ok(input)
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_path.trim().is_empty() {
            anyhow::bail!("database_path must not be empty");
        }
        if let Command::History { limit: Some(limit) } = &self.command {
            if *limit <= 0 {
                anyhow::bail!("history limit must be positive");
            }
        }
        if let Command::Serve { addr } = &self.command {
            if addr.parse::<std::net::SocketAddr>().is_err() {
                anyhow::bail!("invalid listen address '{}'", addr);
            }
        }
        Ok(())
    }
}
