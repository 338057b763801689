use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;

use protein_rank::error::SpecError;
use protein_rank::facts::{fact_file_path, load_fact_dir, load_fact_record, FactRecord};
use protein_rank::output;
use protein_rank::scoring::{ProductScores, Scorer};

const EXIT_SUCCESS: i32 = 0;
const EXIT_DATA: i32 = 1;
const EXIT_CONFIG: i32 = 4;

#[derive(Args, Debug, Default)]
struct ScoreArgs {
    /// Brand to score (reads <data-dir>/<BRAND>/<BRAND>.json); all brands if omitted
    brand: Option<String>,

    /// Only score this mode
    #[arg(short, long)]
    mode: Option<String>,

    /// Print the itemized breakdown of every mode
    #[arg(long)]
    components: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Write a JSON report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score products per mode (default if no subcommand)
    Score(ScoreArgs),
    /// Rank every product in the data directory for one mode
    Leaderboard {
        /// Mode to rank by
        #[arg(short, long, default_value = "cut")]
        mode: String,

        /// Print the leaderboard as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate the scoring spec and list its modes
    Check,
}

#[derive(Parser, Debug)]
#[command(name = "protein-rank")]
#[command(about = "Rank protein powders per training goal", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to scoring spec (defaults to ~/.config/protein-rank/scoring_spec.yaml, then the built-in spec)
    #[arg(short, long, global = true)]
    spec: Option<PathBuf>,

    /// Directory holding <brand>/<brand>.json fact files
    #[arg(short, long, global = true, default_value = "output")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn main() {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Score(ScoreArgs::default()));
    let start_time = Instant::now();

    if let Err(e) = protein_rank::telemetry::init(cli.verbose) {
        eprintln!("Logging disabled: {}", e);
    }

    // Load and validate the scoring spec at startup
    let (spec, source) = match protein_rank::config::load_spec(cli.spec) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };
    tracing::debug!(source = %source, "loaded scoring spec");

    let scorer = match Scorer::new(&spec) {
        Ok(s) => s,
        Err(SpecError::Invalid(errors)) => {
            eprintln!("Scoring spec errors ({}):", source);
            for error in errors {
                eprintln!("  - {}", error);
            }
            std::process::exit(EXIT_CONFIG);
        }
        Err(e) => {
            eprintln!("Scoring spec error ({}): {}", source, e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let use_colors = output::should_use_colors();

    match command {
        Commands::Check => {
            let modes: Vec<&str> = scorer.mode_names().collect();
            println!("Scoring spec OK ({})", source);
            println!("Modes: {}", modes.join(", "));
        }
        Commands::Score(args) => {
            if let Some(mode) = &args.mode {
                require_mode(&scorer, mode);
            }

            let records = match &args.brand {
                Some(brand) => {
                    let path = fact_file_path(&cli.data_dir, brand);
                    match load_fact_record(&path) {
                        Ok(record) => vec![record],
                        Err(e) => {
                            eprintln!("Data error: {:#}", e);
                            std::process::exit(EXIT_DATA);
                        }
                    }
                }
                None => load_all(&cli.data_dir),
            };

            let mut results = scorer.score_batch(&records);
            if let Some(mode) = &args.mode {
                for product in &mut results {
                    product.modes.retain(|m| &m.mode == mode);
                }
            }

            if let Some(path) = &args.output {
                let report = output::ScoreReport::new(&results);
                if let Err(e) = output::save_report(path, &report) {
                    eprintln!("Report error: {:#}", e);
                    std::process::exit(EXIT_DATA);
                }
                eprintln!("Wrote report for {} products to {}", results.len(), path.display());
            }

            if args.json {
                print_json(&results);
            } else {
                print_scores(&results, args.components, use_colors);
            }

            if cli.verbose {
                eprintln!();
                eprintln!("Scored {} products in {:?}", results.len(), start_time.elapsed());
            }
        }
        Commands::Leaderboard { mode, json } => {
            require_mode(&scorer, &mode);

            let records = load_all(&cli.data_dir);
            let results = scorer.score_batch(&records);
            let entries = match scorer.leaderboard(&results, &mode) {
                Ok(entries) => entries,
                Err(e) => {
                    eprintln!("Config error: {}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            };

            if json {
                print_json(&entries);
            } else {
                println!("{}", output::format_leaderboard(&entries, use_colors));
            }

            if cli.verbose {
                eprintln!();
                eprintln!("Ranked {} products in {:?}", entries.len(), start_time.elapsed());
            }
        }
    }

    std::process::exit(EXIT_SUCCESS);
}

fn require_mode(scorer: &Scorer, mode: &str) {
    if let Err(e) = scorer.compiled().mode(mode) {
        let modes: Vec<&str> = scorer.mode_names().collect();
        eprintln!("{} (configured: {})", e, modes.join(", "));
        std::process::exit(EXIT_CONFIG);
    }
}

fn load_all(data_dir: &Path) -> Vec<FactRecord> {
    match load_fact_dir(data_dir) {
        Ok(records) => {
            if records.is_empty() {
                eprintln!("No fact files found in {}", data_dir.display());
            }
            records
        }
        Err(e) => {
            eprintln!("Data error: {:#}", e);
            std::process::exit(EXIT_DATA);
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize results: {}", e);
            std::process::exit(EXIT_DATA);
        }
    }
}

fn print_scores(results: &[ProductScores], components: bool, use_colors: bool) {
    if results.is_empty() {
        println!("No products found.");
        return;
    }

    for (i, product) in results.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", output::format_product_scores(product, use_colors));
        if components {
            for score in &product.modes {
                println!("{}", output::format_components(score, use_colors));
            }
        }
    }
}
