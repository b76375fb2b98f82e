use crate::error::Result;
use crate::model::image::ImageEntry;
use crate::model::{DbStamp, Image, Plan, StructureSet};
use crate::schema::{child, text, FromNode, SchemaTable};
use log::warn;
use roxmltree::Node;
use std::collections::HashMap;

/// Description used for a study synthesized from the disease itself
pub const DEFAULT_STUDY_DESCRIPTION: &str = "TomoTherapy Patient Disease";

/// Study-level grouping referenced by every exported object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DicomStudy {
    pub uid: String,
    pub description: String,
    pub accession_number: String,
    pub date: String,
    pub time: String,
}

impl FromNode for DicomStudy {
    fn from_node(node: Node<'_, '_>) -> Result<Self> {
        let node = child(node, "dicomStudy")?;
        let mut study = DicomStudy::default();
        let mut table = SchemaTable::new();
        table.bind("originalStudyUID", &mut study.uid);
        table.bind("studyDescription", &mut study.description);
        table.bind("accessionNumber", &mut study.accession_number);
        table.bind("originalStudyDate", &mut study.date);
        table.bind("originalStudyTime", &mut study.time);
        table.search(node)?;
        table.remove_optional(node, "accessionNumber", true);
        table.finish(node)?;
        Ok(study)
    }
}

impl DicomStudy {
    /// Study standing in for a disease that carries none
    fn from_stamp(stamp: &DbStamp) -> Self {
        DicomStudy {
            uid: stamp.uid.clone(),
            description: DEFAULT_STUDY_DESCRIPTION.to_string(),
            accession_number: String::new(),
            date: stamp.date.clone(),
            time: stamp.time.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct DiseaseInfo {
    stamp: DbStamp,
    name: String,
    patient_age: String,
}

impl FromNode for DiseaseInfo {
    fn from_node(node: Node<'_, '_>) -> Result<Self> {
        let mut info = DiseaseInfo {
            patient_age: text(child(node, "patientsAge")?),
            ..Default::default()
        };
        let brief = child(node, "briefDisease")?;
        let mut table = SchemaTable::new();
        table.bind_object("dbInfo", &mut info.stamp);
        table.bind("diseaseName", &mut info.name);
        table.search(brief)?;
        table.finish(brief)?;
        Ok(info)
    }
}

/// A diagnosis and everything planned for it
///
/// Built from the inner `fullDiseaseDataArray` element. After a successful
/// build the disease holds at least one study, plan, image and structure set.
#[derive(Debug, Clone, PartialEq)]
pub struct Disease {
    pub stamp: DbStamp,
    pub name: String,
    pub patient_age: String,
    studies: Vec<DicomStudy>,
    pub plans: Vec<Plan>,
    pub images: Vec<Image>,
    pub structure_sets: Vec<StructureSet>,
    image_index: HashMap<String, usize>,
}

impl Disease {
    /// The study every exported object refers to
    pub fn study(&self) -> &DicomStudy {
        // non-empty after from_node, the only constructor
        &self.studies[0]
    }

    /// Every study of the disease, in archive order
    pub fn studies(&self) -> &[DicomStudy] {
        &self.studies
    }

    /// Disease image with the given UID; the first one wins on repeats
    pub fn image(&self, uid: &str) -> Option<&Image> {
        self.image_index.get(uid).map(|&i| &self.images[i])
    }
}

impl FromNode for Disease {
    fn from_node(node: Node<'_, '_>) -> Result<Self> {
        let mut info = DiseaseInfo::default();
        let mut studies: Vec<DicomStudy> = Vec::new();
        let mut plans: Vec<Plan> = Vec::new();
        let mut images: Vec<ImageEntry> = Vec::new();
        let mut structure_sets: Vec<StructureSet> = Vec::new();

        let mut table = SchemaTable::new();
        table.bind_object("disease", &mut info);
        table.bind_list("fullStructureSetDataArray", &mut structure_sets);
        table.bind_list("fullDicomStudyDataArray", &mut studies);
        table.bind_list("fullPlanDataArray", &mut plans);
        table.bind_list("fullImageDataArray", &mut images);
        table.search(node)?;
        let no_studies = table.remove_optional(node, "fullDicomStudyDataArray", false);
        table.finish(node)?;

        if no_studies {
            warn!("Missing fullDicomStudyDataArray");
            studies.push(DicomStudy::from_stamp(&info.stamp));
        } else if studies.len() > 1 {
            warn!("Found {} DICOM studies", studies.len());
        }
        if structure_sets.is_empty() {
            return Err("No structure set information".into());
        }
        if plans.is_empty() {
            return Err("No plan information".into());
        }
        if images.is_empty() {
            return Err("No plan images".into());
        }

        let mut disease = Disease {
            stamp: info.stamp,
            name: info.name,
            patient_age: info.patient_age,
            studies,
            plans,
            images: images.into_iter().map(|entry| entry.0).collect(),
            structure_sets,
            image_index: HashMap::new(),
        };
        for (i, image) in disease.images.iter().enumerate() {
            disease.image_index.entry(image.stamp.uid.clone()).or_insert(i);
        }
        Ok(disease)
    }
}
