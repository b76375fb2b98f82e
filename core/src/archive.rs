use crate::api::ExportSummary;
use crate::encode::{encode_dose, encode_structure_set, CtSeries, ExportContext, OutputObject};
use crate::error::{Result, TomoError};
use crate::lookup::IdentifierLookup;
use crate::model::{Disease, Machine, Patient};
use crate::schema::{child, FromNode, SchemaTable};
use log::{debug, info, warn};
use roxmltree::{Document, Node};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Root element of the primary patient document
pub const PATIENT_ROOT: &str = "FullPatient";

/// A loaded patient archive
///
/// Owns the whole model. Volume and curve files are resolved against the
/// directory of the primary document.
#[derive(Debug, Clone)]
pub struct Archive {
    pub patient: Patient,
    pub machine: Machine,
    pub diseases: Vec<Disease>,
    dir: PathBuf,
}

#[derive(Default)]
struct PatientDocument {
    patient: Patient,
    diseases: Vec<Disease>,
}

impl FromNode for PatientDocument {
    fn from_node(node: Node<'_, '_>) -> Result<Self> {
        let mut doc = PatientDocument::default();
        let mut table = SchemaTable::new();
        table.bind_object("patient", &mut doc.patient);
        table.bind_list("fullDiseaseDataArray", &mut doc.diseases);
        table.search(node)?;
        table.finish(node)?;
        Ok(doc)
    }
}

impl Archive {
    /// Loads the primary document at `path` and the machine document beside it
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading archive {}", path.display());
        let xml = std::fs::read_to_string(path)?;
        let doc = Document::parse(&xml).map_err(|e| TomoError::parse(path, e))?;
        let content = PatientDocument::from_node(child(doc.root_element(), PATIENT_ROOT)?)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let machine = find_machine(&dir)?;
        debug!("Using machine {}", machine.name);

        Ok(Archive {
            patient: content.patient,
            machine,
            diseases: content.diseases,
            dir,
        })
    }

    /// Directory holding the archive's sibling files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Replaces the patient's MRN with the one the lookup service returns
    pub fn update_mrn(&mut self, lookup: &dyn IdentifierLookup, host: &str, port: u16) -> Result<()> {
        let mrn = lookup.lookup(host, port, &self.patient.name)?;
        info!("MRN for {}: {} (was {})", self.patient.name, mrn, self.patient.mrn);
        self.patient.mrn = mrn;
        Ok(())
    }

    /// Encodes every exportable object and writes it to `out_dir`
    ///
    /// Each CT series UID is exported at most once; repeats are logged and
    /// skipped. With `dry_run` the objects are built but nothing is written.
    pub fn flush(&self, out_dir: &Path, dry_run: bool) -> Result<ExportSummary> {
        let mut summary = ExportSummary {
            patient_name: self.patient.name.clone(),
            patient_id: self.patient.mrn.clone(),
            out_dir: out_dir.to_path_buf(),
            dry_run,
            ..Default::default()
        };
        let mut exported: HashSet<&str> = HashSet::new();

        let emit = |object: OutputObject, summary: &mut ExportSummary| -> Result<()> {
            if !dry_run {
                object.write_to(out_dir)?;
            }
            summary.files.push(object.file_name);
            Ok(())
        };

        for disease in &self.diseases {
            debug!("Exporting disease {}", disease.name);
            let ctx = ExportContext::new(&self.patient, &self.machine, disease, &self.dir);

            for image in &disease.images {
                debug!("Exporting {} image {}", image.image_type, image.uid());
                if !exported.insert(image.uid()) {
                    warn!("Repeated CT series UID: {}", image.uid());
                    summary.skipped_series.push(image.uid().to_string());
                    continue;
                }
                let series = CtSeries::new(&ctx, image)?;
                for object in series.instances() {
                    emit(object?, &mut summary)?;
                    summary.ct_instances += 1;
                }
            }
            for plan in &disease.plans {
                debug!("Exporting plan {}", plan.label);
                emit(encode_dose(&ctx, plan)?, &mut summary)?;
                summary.doses += 1;
            }
            for structure_set in &disease.structure_sets {
                debug!("Exporting structure set {}", structure_set.uid());
                emit(encode_structure_set(&ctx, structure_set)?, &mut summary)?;
                summary.structure_sets += 1;
            }
        }
        Ok(summary)
    }
}

/// First machine document in `dir`, visiting `*.xml` files by name
fn find_machine(dir: &Path) -> Result<Machine> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "xml") && path.is_file())
        .collect();
    candidates.sort();
    candidates
        .iter()
        .find_map(|path| Machine::probe_file(path))
        .ok_or_else(|| TomoError::DomainInvariant(format!("Cannot find machine XML in {}", dir.display())))
}
