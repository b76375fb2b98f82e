use crate::error::{Result, TomoError};
use crate::geometry::CM_TO_MM;
use crate::model::DbStamp;
use crate::schema::{child, parse_array, parse_scalar, FromNode, SchemaTable};
use roxmltree::Node;

/// Image type tag of a planning kVCT volume
pub const KVCT_IMAGE_TYPE: &str = "KVCT";

/// Image type tag of the final optimized dose volume
pub const FINAL_DOSE_IMAGE_TYPE: &str = "Opt_Dose_After_EOP";

/// Header describing a raw binary volume file
///
/// `start`, `spacing` and `z_coordinates` are converted from centimetres to
/// millimetres while parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumeHeader {
    pub filename: String,
    pub compression: String,
    pub datatype: String,
    /// Voxel counts along x, y and z
    pub dim: [usize; 3],
    pub orig_axial_dim: [usize; 2],
    pub start: [f32; 3],
    pub spacing: [f32; 3],
    pub min: f64,
    pub max: f64,
    pub use_alternate_z: bool,
    pub z_coordinates: Vec<f32>,
}

impl VolumeHeader {
    /// Number of samples in one axial slice
    pub fn frame_len(&self) -> Result<usize> {
        self.dim[0]
            .checked_mul(self.dim[1])
            .ok_or_else(|| self.overflow())
    }

    /// Total number of samples in the volume
    pub fn sample_count(&self) -> Result<usize> {
        self.frame_len()?
            .checked_mul(self.dim[2])
            .ok_or_else(|| self.overflow())
    }

    fn overflow(&self) -> TomoError {
        TomoError::DomainInvariant(format!("Volume dimensions {:?} overflow the sample count", self.dim))
    }

    /// Number of axial slices
    pub fn slices(&self) -> usize {
        self.dim[2]
    }
}

fn to_mm<const N: usize>(values: [f32; N]) -> [f32; N] {
    values.map(|x| x * CM_TO_MM)
}

impl FromNode for VolumeHeader {
    fn from_node(node: Node<'_, '_>) -> Result<Self> {
        let mut header = VolumeHeader::default();
        let mut table = SchemaTable::new();
        table.bind("binaryFileName", &mut header.filename);
        table.bind("maxValue", &mut header.max);
        table.bind("minValue", &mut header.min);
        table.bind("useAlternateZs", &mut header.use_alternate_z);
        table.bind("compressionType", &mut header.compression);
        table.bind("dataType", &mut header.datatype);
        table.search(node)?;
        table.finish(node)?;

        header.dim = parse_array(child(node, "dimensions")?)?;
        header.sample_count()?;
        header.orig_axial_dim = parse_array(child(node, "origAxialDimensions")?)?;
        header.start = to_mm(parse_array(child(node, "start")?)?);
        header.spacing = to_mm(parse_array(child(node, "elementSize")?)?);
        if let Some(zs) = node.children().find(|c| c.has_tag_name("originalZCoordinates")) {
            header.z_coordinates = zs
                .children()
                .filter(Node::is_element)
                .map(|z| parse_scalar::<f32>(z).map(|z| z * CM_TO_MM))
                .collect::<Result<_>>()?;
        }
        Ok(header)
    }
}

/// A CT or dose volume
///
/// The two kinds share one representation and are told apart by
/// `image_type` and by the datatype of the backing file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Image {
    pub stamp: DbStamp,
    pub frame_of_reference: String,
    pub patient_position: String,
    pub image_type: String,
    pub header: VolumeHeader,
}

impl Image {
    /// Series instance UID of the volume
    pub fn uid(&self) -> &str {
        &self.stamp.uid
    }

    /// SOP instance UID of the `k`-th slice (1-based)
    pub fn instance_uid(&self, k: usize) -> String {
        format!("{}.{}", self.stamp.uid, k)
    }
}

impl FromNode for Image {
    fn from_node(node: Node<'_, '_>) -> Result<Self> {
        let mut image = Image::default();
        let mut table = SchemaTable::new();
        table.bind_object("dbInfo", &mut image.stamp);
        table.bind("frameOfReference", &mut image.frame_of_reference);
        table.bind("patientPosition", &mut image.patient_position);
        table.bind("imageType", &mut image.image_type);
        table.bind_object("arrayHeader", &mut image.header);
        table.search(node)?;
        table.finish(node)?;
        Ok(image)
    }
}

/// Element of a `fullImageDataArray`, which wraps its image in an `image`
/// subtree
#[derive(Debug, Default)]
pub(crate) struct ImageEntry(pub Image);

impl FromNode for ImageEntry {
    fn from_node(node: Node<'_, '_>) -> Result<Self> {
        Image::from_node(child(node, "image")?).map(ImageEntry)
    }
}
