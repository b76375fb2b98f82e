pub mod report;

use crate::api::{ConversionOptions, LookupConfig};
use crate::lookup::{DEFAULT_HOST, DEFAULT_PORT};
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

/// Command-line arguments for tomodicom
#[derive(Parser, Debug)]
#[command(name = "tomodicom")]
#[command(about = "Convert a TomoTherapy patient archive to DICOM CT, RT Dose and RT Structure Set files")]
#[command(version)]
pub struct Cli {
    /// Primary patient XML document of the archive
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Directory to write DICOM files to
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Build every object but write nothing
    #[arg(short = 't', long = "test")]
    pub dry_run: bool,

    /// MRN lookup host
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// MRN lookup port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Demote MRN lookup errors to warnings
    #[arg(short, long)]
    pub skip_mrn: bool,

    /// Keep the archive's patient ID without contacting the lookup service
    #[arg(long)]
    pub no_lookup: bool,

    /// Summary format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace); overrides --verbose
    #[arg(short, long, value_name = "LEVEL", alias = "log-lvl")]
    pub log_level: Option<LevelFilter>,
}

impl Cli {
    /// Conversion settings described by the arguments
    pub fn options(&self) -> ConversionOptions {
        let lookup = (!self.no_lookup).then(|| LookupConfig {
            host: self.host.clone(),
            port: self.port,
        });
        ConversionOptions::default()
            .with_out_dir(&self.out_dir)
            .with_dry_run(self.dry_run)
            .with_lookup(lookup)
            .with_skip_lookup_errors(self.skip_mrn)
    }

    /// Effective log level
    pub fn level(&self) -> LevelFilter {
        match (self.log_level, self.verbose) {
            (Some(level), _) => level,
            (None, true) => LevelFilter::Debug,
            (None, false) => LevelFilter::Info,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON format
    Json,
}
