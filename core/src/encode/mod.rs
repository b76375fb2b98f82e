//! DICOM encoders for the three exported object types
//!
//! Each encoder reads one unit of the model (a CT image, a plan, a structure
//! set) together with the archive-level [`ExportContext`] and produces
//! [`OutputObject`]s. None of them writes files; that is left to the caller.

pub mod ct_series;
pub mod rt_dose;
pub mod rt_struct;
pub mod tags;
pub mod writer;

pub use ct_series::CtSeries;
pub use rt_dose::encode_dose;
pub use rt_struct::encode_structure_set;
pub use writer::{format_ds, DatasetWriter, OutputObject};

use crate::error::Result;
use crate::model::{Disease, Machine, Patient};
use chrono::{Local, NaiveDateTime};
use dicom_core::VR;
use std::path::Path;
use tags::*;

pub const MANUFACTURER_NAME: &str = "TomoTherapy Incorporated";

/// Not present anywhere in the archive
pub const MODEL_NAME: &str = "Hi-Art";

pub const SOFTWARE_VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

/// Retired Detached Study Management SOP class, used to reference the study
/// from a structure set
pub const DETACHED_STUDY_MANAGEMENT_SOP_CLASS: &str = "1.2.840.10008.3.1.2.3.1";

/// Archive-level state shared by every encoder in one export
#[derive(Debug, Clone, Copy)]
pub struct ExportContext<'a> {
    pub patient: &'a Patient,
    pub machine: &'a Machine,
    pub disease: &'a Disease,
    /// Directory that volume and curve files are resolved against
    pub dir: &'a Path,
    /// Instance creation date and time stamped on every object
    pub created: NaiveDateTime,
}

impl<'a> ExportContext<'a> {
    pub fn new(patient: &'a Patient, machine: &'a Machine, disease: &'a Disease, dir: &'a Path) -> Self {
        Self {
            patient,
            machine,
            disease,
            dir,
            created: Local::now().naive_local(),
        }
    }

    /// Starts a dataset holding the patient, study and equipment attributes
    pub fn base_dataset(&self) -> Result<DatasetWriter> {
        let study = self.disease.study();
        let date = self.created.format("%Y%m%d").to_string();
        let time = self.created.format("%H%M%S").to_string();

        let mut w = DatasetWriter::new();
        w.put_all(&[
            (SPECIFIC_CHARACTER_SET, VR::CS, "ISO_IR 100"),
            (STUDY_DATE, VR::DA, study.date.as_str()),
            (STUDY_TIME, VR::TM, study.time.as_str()),
            (ACCESSION_NUMBER, VR::SH, study.accession_number.as_str()),
            (MANUFACTURER, VR::LO, MANUFACTURER_NAME),
            (REFERRING_PHYSICIAN_NAME, VR::PN, ""),
            (STUDY_DESCRIPTION, VR::LO, study.description.as_str()),
            (MANUFACTURER_MODEL_NAME, VR::LO, MODEL_NAME),
            (PATIENT_NAME, VR::PN, self.patient.name.as_str()),
            (PATIENT_ID, VR::LO, self.patient.mrn.as_str()),
            (PATIENT_BIRTH_DATE, VR::DA, self.patient.birth_date.as_str()),
            (PATIENT_SEX, VR::CS, self.patient.sex_code()),
            (PATIENT_AGE, VR::AS, self.disease.patient_age.as_str()),
            (SOFTWARE_VERSIONS, VR::LO, SOFTWARE_VERSION),
            (STUDY_INSTANCE_UID, VR::UI, study.uid.as_str()),
            (STUDY_ID, VR::SH, self.disease.name.as_str()),
            (INSTANCE_CREATION_DATE, VR::DA, date.as_str()),
            (INSTANCE_CREATION_TIME, VR::TM, time.as_str()),
        ])?;
        Ok(w)
    }
}

/// Item of a referenced-SOP sequence
pub(crate) fn sop_reference(class_uid: &str, instance_uid: &str) -> Result<DatasetWriter> {
    let mut item = DatasetWriter::new();
    item.put_str(REFERENCED_SOP_CLASS_UID, VR::UI, class_uid)?;
    item.put_str(REFERENCED_SOP_INSTANCE_UID, VR::UI, instance_uid)?;
    Ok(item)
}

/// Finishes a dataset into an object named `<prefix><uid>.dcm`
pub(crate) fn output(prefix: &str, class_uid: &str, instance_uid: &str, w: DatasetWriter) -> OutputObject {
    OutputObject {
        file_name: format!("{}{}.dcm", prefix, instance_uid),
        sop_class_uid: class_uid.to_string(),
        sop_instance_uid: instance_uid.to_string(),
        dataset: w.finish(),
    }
}
