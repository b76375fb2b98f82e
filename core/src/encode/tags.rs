use dicom_core::Tag;
use dicom_object::InMemDicomObject;

// SOP Common
pub const SPECIFIC_CHARACTER_SET: Tag = Tag(0x0008, 0x0005);
pub const IMAGE_TYPE: Tag = Tag(0x0008, 0x0008);
pub const INSTANCE_CREATION_DATE: Tag = Tag(0x0008, 0x0012);
pub const INSTANCE_CREATION_TIME: Tag = Tag(0x0008, 0x0013);
pub const SOP_CLASS_UID: Tag = Tag(0x0008, 0x0016);
pub const SOP_INSTANCE_UID: Tag = Tag(0x0008, 0x0018);
pub const INSTANCE_NUMBER: Tag = Tag(0x0020, 0x0013);

// Study
pub const STUDY_DATE: Tag = Tag(0x0008, 0x0020);
pub const STUDY_TIME: Tag = Tag(0x0008, 0x0030);
pub const ACCESSION_NUMBER: Tag = Tag(0x0008, 0x0050);
pub const REFERRING_PHYSICIAN_NAME: Tag = Tag(0x0008, 0x0090);
pub const STUDY_DESCRIPTION: Tag = Tag(0x0008, 0x1030);
pub const STUDY_INSTANCE_UID: Tag = Tag(0x0020, 0x000D);
pub const STUDY_ID: Tag = Tag(0x0020, 0x0010);

// Series
pub const SERIES_DATE: Tag = Tag(0x0008, 0x0021);
pub const ACQUISITION_DATE: Tag = Tag(0x0008, 0x0022);
pub const SERIES_TIME: Tag = Tag(0x0008, 0x0031);
pub const ACQUISITION_TIME: Tag = Tag(0x0008, 0x0032);
pub const MODALITY: Tag = Tag(0x0008, 0x0060);
pub const SERIES_DESCRIPTION: Tag = Tag(0x0008, 0x103E);
pub const DERIVATION_DESCRIPTION: Tag = Tag(0x0008, 0x2111);
pub const SERIES_INSTANCE_UID: Tag = Tag(0x0020, 0x000E);
pub const SERIES_NUMBER: Tag = Tag(0x0020, 0x0011);
pub const ACQUISITION_NUMBER: Tag = Tag(0x0020, 0x0012);
pub const PATIENT_POSITION: Tag = Tag(0x0018, 0x5100);

// Equipment
pub const MANUFACTURER: Tag = Tag(0x0008, 0x0070);
pub const STATION_NAME: Tag = Tag(0x0008, 0x1010);
pub const OPERATORS_NAME: Tag = Tag(0x0008, 0x1070);
pub const MANUFACTURER_MODEL_NAME: Tag = Tag(0x0008, 0x1090);
pub const SOFTWARE_VERSIONS: Tag = Tag(0x0018, 0x1020);

// Patient
pub const PATIENT_NAME: Tag = Tag(0x0010, 0x0010);
pub const PATIENT_ID: Tag = Tag(0x0010, 0x0020);
pub const PATIENT_BIRTH_DATE: Tag = Tag(0x0010, 0x0030);
pub const PATIENT_SEX: Tag = Tag(0x0010, 0x0040);
pub const PATIENT_AGE: Tag = Tag(0x0010, 0x1010);

// Acquisition
pub const CONTRAST_BOLUS_AGENT: Tag = Tag(0x0018, 0x0010);
pub const SLICE_THICKNESS: Tag = Tag(0x0018, 0x0050);
pub const KVP: Tag = Tag(0x0018, 0x0060);

// Frame of reference and plane geometry
pub const IMAGE_POSITION_PATIENT: Tag = Tag(0x0020, 0x0032);
pub const IMAGE_ORIENTATION_PATIENT: Tag = Tag(0x0020, 0x0037);
pub const FRAME_OF_REFERENCE_UID: Tag = Tag(0x0020, 0x0052);
pub const IMAGES_IN_ACQUISITION: Tag = Tag(0x0020, 0x1002);
pub const POSITION_REFERENCE_INDICATOR: Tag = Tag(0x0020, 0x1040);
pub const SLICE_LOCATION: Tag = Tag(0x0020, 0x1041);

// Image pixel
pub const SAMPLES_PER_PIXEL: Tag = Tag(0x0028, 0x0002);
pub const PHOTOMETRIC_INTERPRETATION: Tag = Tag(0x0028, 0x0004);
pub const NUMBER_OF_FRAMES: Tag = Tag(0x0028, 0x0008);
pub const FRAME_INCREMENT_POINTER: Tag = Tag(0x0028, 0x0009);
pub const ROWS: Tag = Tag(0x0028, 0x0010);
pub const COLUMNS: Tag = Tag(0x0028, 0x0011);
pub const PIXEL_SPACING: Tag = Tag(0x0028, 0x0030);
pub const BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
pub const BITS_STORED: Tag = Tag(0x0028, 0x0101);
pub const HIGH_BIT: Tag = Tag(0x0028, 0x0102);
pub const PIXEL_REPRESENTATION: Tag = Tag(0x0028, 0x0103);
pub const RESCALE_INTERCEPT: Tag = Tag(0x0028, 0x1052);
pub const RESCALE_SLOPE: Tag = Tag(0x0028, 0x1053);
pub const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

// References
pub const REFERENCED_IMAGE_SEQUENCE: Tag = Tag(0x0008, 0x1140);
pub const REFERENCED_SOP_CLASS_UID: Tag = Tag(0x0008, 0x1150);
pub const REFERENCED_SOP_INSTANCE_UID: Tag = Tag(0x0008, 0x1155);
pub const REFERENCED_RT_PLAN_SEQUENCE: Tag = Tag(0x300C, 0x0002);
pub const REFERENCED_STRUCTURE_SET_SEQUENCE: Tag = Tag(0x300C, 0x0060);

// RT Dose
pub const DOSE_UNITS: Tag = Tag(0x3004, 0x0002);
pub const DOSE_TYPE: Tag = Tag(0x3004, 0x0004);
pub const DOSE_COMMENT: Tag = Tag(0x3004, 0x0006);
pub const DOSE_SUMMATION_TYPE: Tag = Tag(0x3004, 0x000A);
pub const GRID_FRAME_OFFSET_VECTOR: Tag = Tag(0x3004, 0x000C);
pub const DOSE_GRID_SCALING: Tag = Tag(0x3004, 0x000E);
pub const TISSUE_HETEROGENEITY_CORRECTION: Tag = Tag(0x3004, 0x0014);

// Structure Set
pub const STRUCTURE_SET_LABEL: Tag = Tag(0x3006, 0x0002);
pub const STRUCTURE_SET_DATE: Tag = Tag(0x3006, 0x0008);
pub const STRUCTURE_SET_TIME: Tag = Tag(0x3006, 0x0009);
pub const REFERENCED_FRAME_OF_REFERENCE_SEQUENCE: Tag = Tag(0x3006, 0x0010);
pub const RT_REFERENCED_STUDY_SEQUENCE: Tag = Tag(0x3006, 0x0012);
pub const RT_REFERENCED_SERIES_SEQUENCE: Tag = Tag(0x3006, 0x0014);
pub const CONTOUR_IMAGE_SEQUENCE: Tag = Tag(0x3006, 0x0016);
pub const STRUCTURE_SET_ROI_SEQUENCE: Tag = Tag(0x3006, 0x0020);
pub const ROI_NUMBER: Tag = Tag(0x3006, 0x0022);
pub const REFERENCED_FRAME_OF_REFERENCE_UID: Tag = Tag(0x3006, 0x0024);
pub const ROI_NAME: Tag = Tag(0x3006, 0x0026);
pub const ROI_DISPLAY_COLOR: Tag = Tag(0x3006, 0x002A);
pub const ROI_GENERATION_ALGORITHM: Tag = Tag(0x3006, 0x0036);

// ROI Contour
pub const ROI_CONTOUR_SEQUENCE: Tag = Tag(0x3006, 0x0039);
pub const CONTOUR_SEQUENCE: Tag = Tag(0x3006, 0x0040);
pub const CONTOUR_GEOMETRIC_TYPE: Tag = Tag(0x3006, 0x0042);
pub const NUMBER_OF_CONTOUR_POINTS: Tag = Tag(0x3006, 0x0046);
pub const CONTOUR_DATA: Tag = Tag(0x3006, 0x0050);
pub const REFERENCED_ROI_NUMBER: Tag = Tag(0x3006, 0x0084);

// RT ROI Observations
pub const RT_ROI_OBSERVATIONS_SEQUENCE: Tag = Tag(0x3006, 0x0080);
pub const OBSERVATION_NUMBER: Tag = Tag(0x3006, 0x0082);
pub const RT_ROI_INTERPRETED_TYPE: Tag = Tag(0x3006, 0x00A4);
pub const ROI_INTERPRETER: Tag = Tag(0x3006, 0x00A6);

/// Helper to get string value from DICOM tag
///
/// Returns `None` if the tag is not present or cannot be converted to string
pub fn get_string_value(dcm: &InMemDicomObject, tag: Tag) -> Option<String> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_str().ok())
        .map(|s| s.trim().to_string())
}

/// Helper to get integer value from DICOM tag
pub fn get_int_value(dcm: &InMemDicomObject, tag: Tag) -> Option<i32> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_int::<i32>().ok())
}

/// Helper to get a multi-valued decimal attribute
pub fn get_float_values(dcm: &InMemDicomObject, tag: Tag) -> Option<Vec<f64>> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_multi_float64().ok())
}

/// Helper to get the items of a sequence attribute
///
/// Returns an empty slice if the tag is absent or not a sequence
pub fn get_items(dcm: &InMemDicomObject, tag: Tag) -> &[InMemDicomObject] {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.items())
        .unwrap_or(&[])
}
