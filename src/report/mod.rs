//! Prediction reports, as plain text or a paginated PDF.
//!
//! A report reproduces everything the model produced plus the raw inputs
//! (including the unscored Corsi/Fenwick shares) and the weight table.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use printpdf::{BuiltinFont, Mm, PdfDocument};
use std::fmt::Write as _;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::model::{weights_info, GameInput, PredictionResult};

const RULE_WIDTH: usize = 64;

// A4 portrait, monospaced so the text layout carries over unchanged.
const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 15.0;
const FONT_SIZE_PT: f32 = 9.0;
const LINE_HEIGHT_MM: f32 = 4.2;

/// Render a report for `result`, made from `input`.
pub fn render_report(result: &PredictionResult, input: &GameInput) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report_body(&mut out, result, input);
    out
}

/// Render and save a report under `dir`, returning the written path.
pub fn write_report(dir: &Path, result: &PredictionResult, input: &GameInput) -> Result<PathBuf> {
    let path = report_path(dir, result, "txt")?;
    std::fs::write(&path, render_report(result, input))
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    info!("Report written: {}", path.display());
    Ok(path)
}

/// Same content as [`write_report`], laid out on as many A4 pages as it needs.
pub fn write_pdf_report(
    dir: &Path,
    result: &PredictionResult,
    input: &GameInput,
) -> Result<PathBuf> {
    let path = report_path(dir, result, "pdf")?;
    let text = render_report(result, input);
    let lines: Vec<&str> = text.lines().collect();
    let per_page = lines_per_page();

    let title = format!("{} vs {} Prediction", result.home_team, result.away_team);
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Page 1".to_string());
    let font = doc
        .add_builtin_font(BuiltinFont::Courier)
        .map_err(|e| anyhow!("Failed to load PDF font: {e}"))?;

    for (n, chunk) in lines.chunks(per_page).enumerate() {
        let layer = if n == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(
                Mm(PAGE_WIDTH_MM),
                Mm(PAGE_HEIGHT_MM),
                format!("Page {}", n + 1),
            );
            doc.get_page(page).get_layer(layer)
        };
        for (row, line) in chunk.iter().enumerate() {
            let y = PAGE_HEIGHT_MM - MARGIN_MM - row as f32 * LINE_HEIGHT_MM;
            // The builtin fonts only cover Latin-1.
            layer.use_text(line.replace('•', "-"), FONT_SIZE_PT, Mm(MARGIN_MM), Mm(y), &font);
        }
    }

    let file = File::create(&path)
        .with_context(|| format!("Failed to create report {}", path.display()))?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| anyhow!("Failed to write report {}: {e}", path.display()))?;
    info!(
        "PDF report written: {} ({} pages)",
        path.display(),
        page_count(lines.len())
    );
    Ok(path)
}

fn lines_per_page() -> usize {
    ((PAGE_HEIGHT_MM - 2.0 * MARGIN_MM) / LINE_HEIGHT_MM) as usize
}

fn page_count(lines: usize) -> usize {
    lines.div_ceil(lines_per_page()).max(1)
}

fn report_path(dir: &Path, result: &PredictionResult, extension: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create report directory {}", dir.display()))?;
    Ok(dir.join(report_file_name(result, extension)))
}

/// `<home>_vs_<away>_<YYYYmmdd_HHMMSS>.<extension>`, stamped with the
/// prediction time
pub fn report_file_name(result: &PredictionResult, extension: &str) -> String {
    format!(
        "{}_vs_{}_{}.{}",
        file_safe(&result.home_team),
        file_safe(&result.away_team),
        result.timestamp.format("%Y%m%d_%H%M%S"),
        extension
    )
}

fn file_safe(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn write_report_body(
    out: &mut String,
    result: &PredictionResult,
    input: &GameInput,
) -> std::fmt::Result {
    let rule = "=".repeat(RULE_WIDTH);
    let thin = "-".repeat(RULE_WIDTH);

    writeln!(out, "{rule}")?;
    writeln!(out, "  NHL GAME PREDICTION REPORT")?;
    writeln!(out, "  {} vs {}", result.home_team, result.away_team)?;
    writeln!(out, "{rule}")?;
    writeln!(out)?;

    // ── Prediction ──
    writeln!(out, "PREDICTION")?;
    writeln!(out, "{thin}")?;
    writeln!(out, "  {:<24}{}", "Predicted Winner:", result.predicted_winner)?;
    writeln!(
        out,
        "  {:<24}{:.1}%",
        "Win Probability:",
        result.winning_probability()
    )?;
    writeln!(
        out,
        "  {:<24}{:.1}% ({})",
        "Confidence:", result.confidence, result.confidence_level
    )?;
    writeln!(out)?;
    writeln!(out, "  {:<24}{:.1}%", result.home_team, result.home_probability)?;
    writeln!(out, "  {:<24}{:.1}%", result.away_team, result.away_probability)?;
    writeln!(out)?;

    // ── Inputs ──
    writeln!(out, "GAME DATA SUMMARY")?;
    writeln!(out, "{thin}")?;
    header(out, result, "TEAM STATISTICS")?;
    table_row(out, "Massey Rating", format!("{}", input.home_massey), format!("{}", input.away_massey))?;
    table_row(out, "Expected Goals %", pct(input.home_xg_pct), pct(input.away_xg_pct))?;
    table_row(out, "High-Danger %", pct(input.home_hd_pct), pct(input.away_hd_pct))?;
    table_row(out, "Corsi %", pct(input.home_corsi_pct), pct(input.away_corsi_pct))?;
    table_row(out, "Fenwick %", pct(input.home_fenwick_pct), pct(input.away_fenwick_pct))?;
    table_row(
        out,
        "Recent Form (W-L)",
        format!("{}-{}", input.home_last10_wins, input.home_last10_losses),
        format!("{}-{}", input.away_last10_wins, input.away_last10_losses),
    )?;
    writeln!(out)?;
    header(out, result, "GOALIE STATISTICS")?;
    table_row(
        out,
        "Save %",
        format!("{:.3}", input.home_goalie_sv_pct),
        format!("{:.3}", input.away_goalie_sv_pct),
    )?;
    table_row(
        out,
        "GAA",
        format!("{:.2}", input.home_goalie_gaa),
        format!("{:.2}", input.away_goalie_gaa),
    )?;
    writeln!(out)?;
    header(out, result, "SPECIAL TEAMS")?;
    table_row(out, "Power Play %", pct(input.home_pp_pct), pct(input.away_pp_pct))?;
    table_row(out, "Penalty Kill %", pct(input.home_pk_pct), pct(input.away_pk_pct))?;
    writeln!(out)?;
    header(out, result, "OTHER FACTORS")?;
    table_row(
        out,
        "Days of Rest",
        input.home_days_rest.to_string(),
        input.away_days_rest.to_string(),
    )?;
    table_row(
        out,
        "Injury Impact (0-10)",
        input.home_injury_impact.to_string(),
        input.away_injury_impact.to_string(),
    )?;
    writeln!(out)?;

    // ── Model output ──
    writeln!(out, "FACTOR BREAKDOWN (0-100 per side, before weighting)")?;
    writeln!(out, "{thin}")?;
    header(out, result, "FACTOR")?;
    for (factor, scores) in &result.factor_breakdown {
        table_row(
            out,
            factor.label(),
            format!("{:.2}", scores.home),
            format!("{:.2}", scores.away),
        )?;
    }
    table_row(
        out,
        "Weighted Total",
        format!("{:.3}", result.raw_scores.home),
        format!("{:.3}", result.raw_scores.away),
    )?;
    writeln!(out)?;

    writeln!(out, "PREDICTION MODEL WEIGHTS")?;
    writeln!(out, "{thin}")?;
    writeln!(
        out,
        "This prediction uses a weighted statistical model combining multiple factors:"
    )?;
    for info in weights_info() {
        writeln!(
            out,
            "  • {} ({:.0}%): {}",
            info.label,
            info.weight * 100.0,
            info.description
        )?;
    }
    writeln!(out)?;

    writeln!(out, "{rule}")?;
    writeln!(
        out,
        "Prediction made {}",
        result.timestamp.format("%B %d, %Y at %I:%M %p UTC")
    )?;
    writeln!(
        out,
        "Generated on {}",
        Utc::now().format("%B %d, %Y at %I:%M %p UTC")
    )?;
    Ok(())
}

fn header(out: &mut String, result: &PredictionResult, title: &str) -> std::fmt::Result {
    table_row(
        out,
        title,
        result.home_team.clone(),
        result.away_team.clone(),
    )
}

fn table_row(out: &mut String, label: &str, home: String, away: String) -> std::fmt::Result {
    writeln!(out, "  {:<26}{:>16}{:>16}", label, home, away)
}

fn pct(value: f64) -> String {
    format!("{:.1}%", value)
}
