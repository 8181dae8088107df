use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use tracing::{info, warn};

mod api;
mod config;
mod db;
mod import;
mod model;
mod report;

use config::{Command, Config};
use db::Database;
use model::{predict_game, weights_info, GameInput, PredictionResult};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    config.validate()?;

    match config.command.clone() {
        Command::Predict {
            input,
            game,
            report,
            pdf,
            no_save,
            json,
        } => {
            let input = match input {
                Some(path) => load_input(&path)?,
                None => game.to_input()?,
            };
            input.validate()?;

            let result = predict_game(&input);
            if no_save {
                info!("Prediction not saved (--no-save)");
            } else {
                let db = open_db(&config)?;
                let id = db.insert_prediction(&result, &input)?;
                info!("Prediction #{} saved to {}", id, config.database_path);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_summary(&result);
            }

            if report {
                let path = save_report(&config, &result, &input, pdf)?;
                println!("\nReport saved to: {}", path.display());
            }
        }
        Command::History { limit } => {
            let db = open_db(&config)?;
            let predictions = match limit {
                Some(limit) => db.list_predictions(limit)?,
                None => db.all_predictions()?,
            };
            if predictions.is_empty() {
                println!("No predictions stored yet.");
            }
            for p in &predictions {
                println!(
                    "{}  {:<22} vs {:<22} → {:<22} {:>6.2}%  {:>6.2} ({})",
                    p.timestamp.format("%Y-%m-%d %H:%M"),
                    p.home_team,
                    p.away_team,
                    p.predicted_winner,
                    p.winning_probability(),
                    p.confidence,
                    p.confidence_level
                );
            }
        }
        Command::Latest => {
            let db = open_db(&config)?;
            match db.latest_prediction()? {
                Some(p) => print_summary(&p),
                None => println!("No predictions stored yet."),
            }
        }
        Command::Stats => {
            let stats = open_db(&config)?.get_stats()?;
            println!("Total predictions:     {}", stats.total_predictions);
            println!("Average confidence:    {:.2}%", stats.average_confidence);
            println!("High-confidence picks: {}", stats.high_confidence_picks);
            println!("Toss-ups:              {}", stats.toss_ups);
        }
        Command::Weights => {
            println!("Model Weights:");
            for w in weights_info() {
                println!(
                    "  • {:<22} {:>3.0}%  {}",
                    w.label,
                    w.weight * 100.0,
                    w.description
                );
            }
        }
        Command::Import { path } => {
            let table = import::import_file(&path)?;
            print!("{}", table.render());
        }
        Command::Report { pdf } => {
            let db = open_db(&config)?;
            let Some(entry) = db.latest_entry()? else {
                warn!("No prediction to report on; run `predict` first");
                anyhow::bail!("Please generate a prediction first.");
            };
            let path = save_report(&config, &entry.result, &entry.input, pdf)?;
            println!(
                "Report for prediction #{} saved to: {}",
                entry.id,
                path.display()
            );
        }
        Command::Serve { addr } => {
            let db = open_db(&config)?;
            let app = api::router(api::AppState { db });
            let addr: SocketAddr = addr.parse()?;
            info!("Prediction API listening on http://{}", addr);
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

fn open_db(config: &Config) -> Result<Database> {
    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);
    Ok(db)
}

fn save_report(
    config: &Config,
    result: &PredictionResult,
    input: &GameInput,
    pdf: bool,
) -> Result<std::path::PathBuf> {
    if pdf {
        report::write_pdf_report(&config.report_dir, result, input)
    } else {
        report::write_report(&config.report_dir, result, input)
    }
}

fn load_input(path: &std::path::Path) -> Result<GameInput> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read game input {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid game input in {}", path.display()))
}

fn print_summary(p: &PredictionResult) {
    let rule = "=".repeat(60);
    println!("{rule}");
    println!("  {} vs {}", p.home_team, p.away_team);
    println!("{rule}\n");
    println!("PREDICTED WINNER:\n  {}\n", p.predicted_winner);
    println!("WIN PROBABILITIES:");
    println!("  {}: {:.1}%", p.home_team, p.home_probability);
    println!("  {}: {:.1}%\n", p.away_team, p.away_probability);
    println!("CONFIDENCE:\n  {:.1}% ({})\n", p.confidence, p.confidence_level);
    println!("{rule}");
    println!("Model Weights:");
    for w in weights_info() {
        println!("  • {}: {:.0}%", w.label, w.weight * 100.0);
    }
}
