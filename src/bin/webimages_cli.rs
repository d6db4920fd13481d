//! WebImages CLI - batch converter front end
//!
//! Commands: categories, plan, convert
//! Outputs JSON to stdout
//! Returns non-zero on conversion failure

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use webimages_core::{CategoryTable, Converter, FailureMode};

#[derive(Parser)]
#[command(name = "webimages-cli")]
#[command(about = "WebImages CLI - Batch Web Asset Converter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the category table
    #[arg(short, long, default_value = "categories.json")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// List the resolved category table
    Categories,

    /// Dry run: report what convert would do without writing anything
    Plan,

    /// Convert everything the output tree is missing
    Convert {
        /// Record per-file failures in the report instead of aborting
        #[arg(long)]
        keep_going: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut table = match CategoryTable::load_from_path(&cli.config) {
        Ok(t) => t,
        Err(e) => {
            let output = serde_json::json!({
                "error": format!("Failed to load config: {}", e),
            });
            eprintln!("{}", serde_json::to_string(&output).unwrap());
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Categories => {
            println!("{}", serde_json::to_string_pretty(&table).unwrap());
            ExitCode::SUCCESS
        }

        Commands::Plan => {
            let converter = Converter::new(table);
            match converter.plan() {
                Ok(plan) => {
                    println!("{}", serde_json::to_string_pretty(&plan).unwrap());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    let output = serde_json::json!({
                        "success": false,
                        "error": e.to_string(),
                    });
                    println!("{}", serde_json::to_string(&output).unwrap());
                    ExitCode::from(2)
                }
            }
        }

        Commands::Convert { keep_going } => {
            if keep_going {
                table.failure_mode = FailureMode::Continue;
            }

            let converter = Converter::new(table);
            match converter.run() {
                Ok(report) => {
                    let output = serde_json::json!({
                        "success": true,
                        "report": report,
                    });
                    println!("{}", serde_json::to_string_pretty(&output).unwrap());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    let output = serde_json::json!({
                        "success": false,
                        "error": e.to_string(),
                    });
                    println!("{}", serde_json::to_string(&output).unwrap());
                    ExitCode::from(2) // Conversion failure
                }
            }
        }
    }
}
