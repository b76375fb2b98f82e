//! Typed view of a patient archive
//!
//! Every entity here is built from its XML subtree through
//! [`crate::schema::FromNode`]. Cross-references between entities are kept
//! as UIDs and resolved through lookups on the owning entity.

pub mod disease;
pub mod image;
pub mod machine;
pub mod patient;
pub mod plan;
pub mod stamp;
pub mod structures;

pub use disease::{DicomStudy, Disease, DEFAULT_STUDY_DESCRIPTION};
pub use image::{Image, VolumeHeader, FINAL_DOSE_IMAGE_TYPE, KVCT_IMAGE_TYPE};
pub use machine::{Machine, MACHINE_ROOT};
pub use patient::Patient;
pub use plan::{DoseRef, Plan, Trial};
pub use stamp::DbStamp;
pub use structures::{Curve, Roi, RoiColor, RoiInterpretedType, StructureSet};
