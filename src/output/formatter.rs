use owo_colors::OwoColorize;
use std::io::IsTerminal;
use terminal_size::{terminal_size, Width};

use crate::scoring::{LeaderboardEntry, ModeScore, ProductScores};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format a mode score to 4 places, or REJECTED
pub fn format_score(score: &ModeScore, use_colors: bool) -> String {
    if score.hard_rejected {
        return if use_colors {
            "REJECTED".red().bold().to_string()
        } else {
            "REJECTED".to_string()
        };
    }

    let text = format!("{:.4}", score.total_score);
    if !use_colors {
        return text;
    }
    if score.total_score >= 0.7 {
        text.green().to_string()
    } else if score.total_score >= 0.5 {
        text.yellow().to_string()
    } else {
        text.red().to_string()
    }
}

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => "n/a".to_string(),
    }
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate text to fit available width, accounting for Unicode
fn truncate(text: &str, max_width: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_width {
        text.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Format one product: metrics summary, spiking status and one line per mode.
pub fn format_product_scores(product: &ProductScores, use_colors: bool) -> String {
    let m = &product.metrics;
    let mut lines = Vec::new();

    if use_colors {
        lines.push(product.brand.bold().to_string());
    } else {
        lines.push(product.brand.clone());
    }

    lines.push(format!(
        "  Protein: {} g/serving, {} of serving, {} g/100 kcal",
        format_value(m.protein_g_per_serving),
        format_value(m.protein_pct),
        format_value(m.protein_per_100_kcal),
    ));
    lines.push(format!(
        "  Leucine: {} g  EAAs: {}  Sodium: {} mg  Non-protein macros: {} g",
        format_value(m.leucine_g_per_serving),
        format_value(m.eaas_pct),
        format_value(m.sodium_mg),
        format_value(m.non_protein_macros_g),
    ));

    let spiking = &product.amino_spiking;
    let status = if spiking.suspected {
        let rules: Vec<&str> = spiking.triggered_rules.iter().map(|r| r.as_str()).collect();
        let text = format!("SUSPECTED ({})", rules.join(", "));
        if use_colors {
            text.red().to_string()
        } else {
            text
        }
    } else if spiking.triggered_rules.is_empty() {
        "clear".to_string()
    } else {
        format!("clear ({} triggered)", spiking.triggered_rules.len())
    };
    lines.push(format!("  Amino spiking: {}", status));

    for score in &product.modes {
        let mut line = format!("  {:<8}{}", score.mode, format_score(score, use_colors));
        if let Some(reason) = &score.rejection_reason {
            line.push_str(&format!("  {}", reason));
        }
        lines.push(line);
    }

    lines.join("\n")
}

/// Itemized breakdown of one mode: each weighted component, each penalty,
/// and the resulting total.
pub fn format_components(score: &ModeScore, use_colors: bool) -> String {
    let mut lines = Vec::new();
    let header = format!("  [{}]", score.mode);
    lines.push(if use_colors {
        header.cyan().to_string()
    } else {
        header
    });

    if let Some(reason) = &score.rejection_reason {
        lines.push(format!("    rejected: {}", reason));
        return lines.join("\n");
    }

    for c in &score.components {
        lines.push(format!(
            "    + {:<24} raw {:>10}  norm {:.4} x {:.2} = {:.4}",
            c.metric.as_str(),
            format_value(c.raw_value),
            c.normalized,
            c.weight,
            c.contribution
        ));
    }
    for p in &score.penalties {
        lines.push(format!(
            "    - {:<24} raw {:>10}  pen  {:.4} x {:.2} = {:.4}",
            p.source.to_string(),
            format_value(p.raw_value),
            p.penalty,
            p.weight,
            p.deduction
        ));
    }
    lines.push(format!(
        "    base {:.4}  penalty {:.4}  total {}",
        score.base_score,
        score.penalty_deduction,
        format_score(score, use_colors)
    ));

    lines.join("\n")
}

/// Format a leaderboard as a ranked table with columns: Rank, Score, Brand, Reason
/// Rank column: 3 chars, right-aligned, "-" for rejected rows
/// Score column: 8 chars (fits "REJECTED")
pub fn format_leaderboard(entries: &[LeaderboardEntry], use_colors: bool) -> String {
    if entries.is_empty() {
        return "No products found.".to_string();
    }

    let term_width = get_terminal_width();
    let rank_width = 3;
    let score_width = 8;
    let separator = "  ";

    entries
        .iter()
        .map(|entry| {
            let rank_str = match entry.rank {
                Some(rank) => format!("{:>2}.", rank),
                None => format!("{:>3}", "-"),
            };

            let score_text = if entry.hard_rejected {
                "REJECTED".to_string()
            } else {
                format!("{:.4}", entry.score)
            };
            let score_padded = format!("{:>width$}", score_text, width = score_width);

            let reason = entry.rejection_reason.as_deref().unwrap_or("");
            let fixed_width = rank_width + 1 + score_width + separator.len() * 2 + reason.len();

            let brand = if let Some(width) = term_width {
                if width > fixed_width + 10 {
                    truncate(&entry.brand, width - fixed_width)
                } else {
                    truncate(&entry.brand, 20)
                }
            } else {
                entry.brand.clone()
            };

            let line = if use_colors {
                let score_colored = if entry.hard_rejected {
                    score_padded.red().to_string()
                } else if entry.score >= 0.7 {
                    score_padded.green().to_string()
                } else if entry.score >= 0.5 {
                    score_padded.yellow().to_string()
                } else {
                    score_padded.red().to_string()
                };
                format!("{} {}{}{}", rank_str.dimmed(), score_colored, separator, brand)
            } else {
                format!("{} {}{}{}", rank_str, score_padded, separator, brand)
            };

            if reason.is_empty() {
                line
            } else if use_colors {
                format!("{}{}{}", line, separator, reason.dimmed())
            } else {
                format!("{}{}{}", line, separator, reason)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
