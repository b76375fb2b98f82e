use crate::archive::Archive;
use crate::error::{Result, TomoError};
use crate::lookup::{IdentifierLookup, TcpLookup, DEFAULT_HOST, DEFAULT_PORT};
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Address of the MRN lookup service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupConfig {
    pub host: String,
    pub port: u16,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Settings for one conversion run
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOptions {
    /// Destination directory; must exist unless `dry_run` is set
    pub out_dir: PathBuf,
    /// Build every object but write nothing
    pub dry_run: bool,
    /// MRN lookup service, or `None` to keep the archive's patient ID
    pub lookup: Option<LookupConfig>,
    /// Continue with the archive's patient ID when the lookup fails
    pub skip_lookup_errors: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("."),
            dry_run: false,
            lookup: Some(LookupConfig::default()),
            skip_lookup_errors: false,
        }
    }
}

impl ConversionOptions {
    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = out_dir.into();
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_lookup(mut self, lookup: Option<LookupConfig>) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn with_skip_lookup_errors(mut self, skip: bool) -> Self {
        self.skip_lookup_errors = skip;
        self
    }
}

/// Converts a patient archive into DICOM files
///
/// Runs the whole pipeline: load the archive, refresh the patient's MRN,
/// then encode and write every object.
///
/// # Example
///
/// ```no_run
/// use tomodicom_core::{ArchiveConverter, ConversionOptions};
/// use std::path::Path;
///
/// let options = ConversionOptions::default()
///     .with_out_dir("/tmp/export")
///     .with_lookup(None);
/// let summary = ArchiveConverter::new(options)
///     .convert(Path::new("archive/patient.xml"))
///     .unwrap();
/// println!("wrote {} files", summary.files.len());
/// ```
pub struct ArchiveConverter<L: IdentifierLookup = TcpLookup> {
    options: ConversionOptions,
    lookup: L,
}

impl ArchiveConverter<TcpLookup> {
    /// Converter using the TCP lookup client
    pub fn new(options: ConversionOptions) -> Self {
        Self::with_lookup(options, TcpLookup)
    }
}

impl<L: IdentifierLookup> ArchiveConverter<L> {
    /// Converter using a custom lookup implementation
    pub fn with_lookup(options: ConversionOptions, lookup: L) -> Self {
        Self { options, lookup }
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Converts the archive whose primary document is at `path`
    ///
    /// # Errors
    ///
    /// Any failure aborts the whole archive. A lookup failure is only
    /// tolerated with `skip_lookup_errors`, in which case it is reported in
    /// the summary.
    pub fn convert(&self, path: &Path) -> Result<ExportSummary> {
        let options = &self.options;
        if !options.dry_run && !options.out_dir.is_dir() {
            return Err(TomoError::DomainInvariant(format!(
                "Output directory {} does not exist",
                options.out_dir.display()
            )));
        }

        let mut archive = Archive::load(path)?;
        let mut lookup_warning = None;
        if let Some(cfg) = &options.lookup {
            match archive.update_mrn(&self.lookup, &cfg.host, cfg.port) {
                Ok(()) => {}
                Err(e @ TomoError::Lookup(_)) if options.skip_lookup_errors => {
                    warn!("{}", e);
                    lookup_warning = Some(e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        let mut summary = archive.flush(&options.out_dir, options.dry_run)?;
        summary.lookup_warning = lookup_warning;
        info!(
            "{} {} files for {}",
            if options.dry_run { "Would write" } else { "Wrote" },
            summary.files.len(),
            summary.patient_name
        );
        Ok(summary)
    }
}

/// Outcome of a conversion run
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ExportSummary {
    pub patient_name: String,

    /// Patient ID written to every object, after any lookup
    pub patient_id: String,

    pub out_dir: PathBuf,

    /// Whether the run was a dry run; `files` then lists what would have
    /// been written
    pub dry_run: bool,

    /// File names in the order they were produced
    pub files: Vec<String>,

    pub ct_instances: usize,
    pub doses: usize,
    pub structure_sets: usize,

    /// CT series UIDs skipped as repeats
    pub skipped_series: Vec<String>,

    /// Lookup failure that was demoted to a warning
    pub lookup_warning: Option<String>,
}

impl ExportSummary {
    /// Paths of every listed file under the output directory
    pub fn paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.files.iter().map(|f| self.out_dir.join(f))
    }
}
