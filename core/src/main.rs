use clap::Parser;
use log::{error, info, LevelFilter};
use std::process;
use tomodicom_core::cli::{Cli, OutputFormat};
use tomodicom_core::{ArchiveConverter, ExportSummary, TextReport, TomoError};

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.level());

    info!("Processing archive: {}", cli.file.display());

    let summary = match ArchiveConverter::new(cli.options()).convert(&cli.file) {
        Ok(summary) => summary,
        Err(e) => {
            report_error(&e);
            process::exit(1);
        }
    };

    output_summary(&summary, cli.format);
}

fn setup_logging(level: LevelFilter) {
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

fn report_error(err: &TomoError) {
    match err {
        TomoError::MissingFields { node, fields } => {
            for field in fields {
                error!("Node {} is missing required key {}", node, field);
            }
        }
        other => error!("{}", other),
    }
}

fn output_summary(summary: &ExportSummary, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            println!("{}", TextReport::new(summary));
        }
        OutputFormat::Json => {
            #[cfg(feature = "json")]
            {
                match serde_json::to_string_pretty(summary) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        error!("Failed to serialize to JSON: {}", e);
                        eprintln!("Error: Failed to serialize to JSON: {}", e);
                        process::exit(1);
                    }
                }
            }
            #[cfg(not(feature = "json"))]
            {
                eprintln!("Error: JSON output requires the 'json' feature");
                eprintln!("Rebuild with: cargo build --features json");
                process::exit(1);
            }
        }
    }
}
