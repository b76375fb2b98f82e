use crate::error::Result;
use crate::model::DbStamp;
use crate::schema::{child, FromNode, SchemaTable};
use roxmltree::Node;

/// Patient demographics
///
/// Built from the `patient` node; the fields live under its `briefPatient`
/// child. The medical record number can be refreshed after loading, see
/// [`crate::lookup`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patient {
    pub stamp: DbStamp,
    pub name: String,
    pub mrn: String,
    pub birth_date: String,
    pub gender: String,
}

impl FromNode for Patient {
    fn from_node(node: Node<'_, '_>) -> Result<Self> {
        let brief = child(node, "briefPatient")?;
        let mut patient = Patient::default();
        let mut table = SchemaTable::new();
        table.bind_object("dbInfo", &mut patient.stamp);
        table.bind("patientName", &mut patient.name);
        table.bind("patientID", &mut patient.mrn);
        table.bind("patientBirthDate", &mut patient.birth_date);
        table.bind("patientGender", &mut patient.gender);
        table.search(brief)?;
        table.finish(brief)?;
        Ok(patient)
    }
}

impl Patient {
    /// PatientSex code string for this patient
    pub fn sex_code(&self) -> &'static str {
        if self.gender.eq_ignore_ascii_case("male") {
            "M"
        } else if self.gender.eq_ignore_ascii_case("female") {
            "F"
        } else {
            "O"
        }
    }
}
