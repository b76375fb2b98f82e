use crate::api::ExportSummary;
use std::fmt;

/// Text report formatter for a conversion summary
pub struct TextReport<'a> {
    summary: &'a ExportSummary,
}

impl<'a> TextReport<'a> {
    /// Creates a new text report
    pub fn new(summary: &'a ExportSummary) -> Self {
        Self { summary }
    }
}

impl<'a> fmt::Display for TextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.summary;
        writeln!(f, "Archive Export")?;
        writeln!(f, "==============")?;
        writeln!(f)?;
        writeln!(f, "Patient:         {}", s.patient_name)?;
        writeln!(f, "Patient ID:      {}", s.patient_id)?;
        writeln!(f, "Output:          {}", s.out_dir.display())?;
        if s.dry_run {
            writeln!(f, "Mode:            dry run (nothing written)")?;
        }
        writeln!(f, "CT instances:    {}", s.ct_instances)?;
        writeln!(f, "RT Dose:         {}", s.doses)?;
        writeln!(f, "Structure sets:  {}", s.structure_sets)?;
        if let Some(warning) = &s.lookup_warning {
            writeln!(f, "Lookup warning:  {}", warning)?;
        }
        if !s.skipped_series.is_empty() {
            writeln!(f, "Skipped series:  {}", s.skipped_series.join(", "))?;
        }
        writeln!(f)?;

        writeln!(f, "Files")?;
        writeln!(f, "-----")?;
        for file in &s.files {
            writeln!(f, "{}", file)?;
        }

        Ok(())
    }
}
