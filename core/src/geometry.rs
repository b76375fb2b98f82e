//! Archive space to patient space conversion
//!
//! The archive stores lengths in centimetres with the y and z axes pointing
//! the opposite way to the patient coordinate system used on output. These
//! rules were worked out by comparing exports and have never been checked
//! against vendor documentation.

use crate::model::VolumeHeader;

/// Scale from archive units to output units
pub const CM_TO_MM: f32 = 10.0;

/// Position of the first voxel of the first slice
///
/// The archive anchors y on the opposite edge of the slice, so the output
/// origin sits `dim.y - 1` rows further along before the flip.
pub fn image_position(header: &VolumeHeader) -> [f32; 3] {
    let rows = header.dim[1].saturating_sub(1) as f32;
    [
        header.start[0],
        -rows.mul_add(header.spacing[1], header.start[1]),
        // Not corrected by the slab extent the way y is. CT and dose may be
        // off by one slice against each other; no archive has been available
        // to settle it.
        -header.start[2],
    ]
}

/// Positions of every axial slice, first to last
pub fn slice_positions(header: &VolumeHeader) -> Vec<[f32; 3]> {
    let [x, y, z] = image_position(header);
    (0..header.slices())
        .map(|k| [x, y, z - k as f32 * header.spacing[2]])
        .collect()
}

/// Offsets of each dose frame relative to the first, decreasing from zero
pub fn grid_frame_offsets(header: &VolumeHeader) -> Vec<f32> {
    (0..header.slices())
        .map(|k| -(k as f32) * header.spacing[2])
        .collect()
}

/// Converts one contour point to output space
pub fn archive_point_to_patient([x, y, z]: [f32; 3]) -> [f32; 3] {
    [x * CM_TO_MM, -y * CM_TO_MM, -z * CM_TO_MM]
}
