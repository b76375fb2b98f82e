use crate::error::{Result, TomoError};
use crate::geometry::archive_point_to_patient;
use crate::model::DbStamp;
use crate::schema::{child, text, FromNode, SchemaTable};
use regex::Regex;
use roxmltree::{Document, Node};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

/// RT ROI interpreted type
///
/// The archive spells these out as free text; every accepted spelling is
/// listed in [`RoiInterpretedType::parse`], and anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoiInterpretedType {
    /// Archive sentinel for "no type"; written as an empty value
    Null,
    External,
    Ptv,
    Ctv,
    Gtv,
    TreatedVolume,
    IrradVolume,
    Bolus,
    Avoidance,
    Organ,
    Marker,
    Registration,
    Isocenter,
    ContrastAgent,
    Cavity,
    BrachyChannel,
    BrachyAccessory,
    BrachySrcApp,
    BrachyChnlShld,
    Support,
    Fixation,
    DoseRegion,
    Control,
    DoseMeasurement,
}

impl RoiInterpretedType {
    /// Parses the archive spelling, which is case-sensitive
    ///
    /// # Errors
    ///
    /// Returns [`TomoError::DomainInvariant`] for any unrecognized string.
    pub fn parse(s: &str) -> Result<Self> {
        use RoiInterpretedType::*;
        Ok(match s {
            "ROI_Null_Valued" => Null,
            "External" => External,
            "PTV" => Ptv,
            "CTV" => Ctv,
            "GTV" => Gtv,
            "TreatedVolume" => TreatedVolume,
            "IrradVolume" => IrradVolume,
            "Bolus" => Bolus,
            "Avoidance" => Avoidance,
            "Organ" => Organ,
            "Marker" => Marker,
            "Registration" => Registration,
            "Isocenter" => Isocenter,
            "ContrastAgent" => ContrastAgent,
            "Cavity" => Cavity,
            "BrachyChannel" => BrachyChannel,
            "BrachyAccessory" => BrachyAccessory,
            // The two abbreviations below follow the pattern of the others but
            // have never been seen in an archive; the full words
            // (BrachySourceApplication, BrachyChannelShield) are just as likely.
            "BrachySrcApp" => BrachySrcApp,
            "BrachyChnlShld" => BrachyChnlShld,
            "Support" => Support,
            "Fixation" => Fixation,
            "DoseRegion" => DoseRegion,
            "Control" => Control,
            "DoseMeasurement" => DoseMeasurement,
            _ => {
                return Err(TomoError::DomainInvariant(format!(
                    "Unrecognized ROI interpreted type string: {}",
                    s
                )))
            }
        })
    }

    /// RTROIInterpretedType code string, `None` for [`RoiInterpretedType::Null`]
    pub fn dicom_code(&self) -> Option<&'static str> {
        use RoiInterpretedType::*;
        match self {
            Null => None,
            External => Some("EXTERNAL"),
            Ptv => Some("PTV"),
            Ctv => Some("CTV"),
            Gtv => Some("GTV"),
            TreatedVolume => Some("TREATED_VOLUME"),
            IrradVolume => Some("IRRAD_VOLUME"),
            Bolus => Some("BOLUS"),
            Avoidance => Some("AVOIDANCE"),
            Organ => Some("ORGAN"),
            Marker => Some("MARKER"),
            Registration => Some("REGISTRATION"),
            Isocenter => Some("ISOCENTER"),
            ContrastAgent => Some("CONTRAST_AGENT"),
            Cavity => Some("CAVITY"),
            BrachyChannel => Some("BRACHY_CHANNEL"),
            BrachyAccessory => Some("BRACHY_ACCESSORY"),
            BrachySrcApp => Some("BRACHY_SRC_APP"),
            BrachyChnlShld => Some("BRACHY_CHNL_SHLD"),
            Support => Some("SUPPORT"),
            Fixation => Some("FIXATION"),
            DoseRegion => Some("DOSE_REGION"),
            Control => Some("CONTROL"),
            DoseMeasurement => Some("DOSE_MEASUREMENT"),
        }
    }
}

impl fmt::Display for RoiInterpretedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dicom_code().unwrap_or(""))
    }
}

/// ROI display color
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoiColor {
    pub red: i32,
    pub green: i32,
    pub blue: i32,
}

impl FromNode for RoiColor {
    fn from_node(node: Node<'_, '_>) -> Result<Self> {
        let mut color = RoiColor::default();
        let mut table = SchemaTable::new();
        table.bind("red", &mut color.red);
        table.bind("green", &mut color.green);
        table.bind("blue", &mut color.blue);
        table.search(node)?;
        table.finish(node)?;
        Ok(color)
    }
}

/// One slice of an ROI contour
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Curve {
    /// Flattened patient-space points, three values per point
    pub points: Vec<f32>,
    pub orientation: String,
    pub slice_value: f64,
    pub curve_index: i32,
    /// Zero-based slice plane index
    pub slice_index: i32,
}

impl Curve {
    /// Instance number of the CT slice this curve lies on
    pub fn instance_number(&self) -> i32 {
        self.slice_index + 1
    }

    /// Number of points in the curve
    pub fn point_count(&self) -> usize {
        self.points.len() / 3
    }
}

impl FromNode for Curve {
    fn from_node(node: Node<'_, '_>) -> Result<Self> {
        // No archive with attached curves has been seen, so their layout is
        // unknown. Refuse rather than guess.
        if let Some(attached) = node.children().find(|c| c.has_tag_name("attachedCurves")) {
            if attached.children().any(|c| c.is_element()) {
                return Err("attachedCurves subtree is not empty".into());
            }
        }

        let mut curve = Curve {
            points: parse_point_data(&text(child(node, "pointData")?))?,
            ..Default::default()
        };
        let mut table = SchemaTable::new();
        table.bind("curveIndex", &mut curve.curve_index);
        table.bind("sliceOrientation", &mut curve.orientation);
        table.bind("sliceValue", &mut curve.slice_value);
        table.bind("slicePlaneIndex", &mut curve.slice_index);
        table.search(node)?;
        table.finish(node)?;
        Ok(curve)
    }
}

/// Parses `x,y,z;x,y,z;...` into flattened patient-space coordinates
pub fn parse_point_data(data: &str) -> Result<Vec<f32>> {
    let malformed = || TomoError::DomainInvariant(format!("Malformed ROI curve triplet in {:?}", data));
    let mut points = Vec::new();
    let mut rest = data.trim_start();
    while !rest.is_empty() {
        let (triplet, tail) = rest.split_once(';').ok_or_else(malformed)?;
        let values = triplet
            .split(',')
            .map(|v| v.trim().parse::<f32>().map_err(|_| malformed()))
            .collect::<Result<Vec<f32>>>()?;
        let point: [f32; 3] = values.try_into().map_err(|_| malformed())?;
        points.extend(archive_point_to_patient(point));
        rest = tail.trim_start();
    }
    Ok(points)
}

fn curve_name_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^ROICurve_\d+$").expect("Failed to compile regex"))
}

/// Region of interest
///
/// Built from a `troiList` element. Contours live in a separate document
/// named by `curve_file` and are only read by [`Roi::load_curves`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roi {
    pub stamp: DbStamp,
    pub number: i32,
    pub interpreted_type: String,
    pub name: String,
    pub color: RoiColor,
    pub is_density_overridden: bool,
    pub lies_on_interpolated_slices: bool,
    pub is_displayed: bool,
    pub curve_file: String,
}

impl Roi {
    /// Interpreted type mapped onto the closed vocabulary
    pub fn interpreted_type(&self) -> Result<RoiInterpretedType> {
        RoiInterpretedType::parse(&self.interpreted_type)
    }

    /// Reads every curve of this ROI from its sidecar document in `dir`
    pub fn load_curves(&self, dir: &Path) -> Result<Vec<Curve>> {
        let path = dir.join(&self.curve_file);
        let xml = std::fs::read_to_string(&path)?;
        let doc = Document::parse(&xml).map_err(|e| TomoError::parse(&path, e))?;
        Self::curves_from_document(&doc)
    }

    fn curves_from_document(doc: &Document<'_>) -> Result<Vec<Curve>> {
        let root = doc.root_element();
        if !root.has_tag_name("ROICurves") {
            return Err(TomoError::missing("document", "ROICurves"));
        }
        root.children()
            .filter(|c| c.is_element() && curve_name_regex().is_match(c.tag_name().name()))
            .map(Curve::from_node)
            .collect()
    }
}

impl FromNode for Roi {
    fn from_node(node: Node<'_, '_>) -> Result<Self> {
        let mut roi = Roi {
            curve_file: text(child(node, "curveDataFile")?),
            ..Default::default()
        };
        let brief = child(node, "briefROI")?;
        let mut table = SchemaTable::new();
        table.bind_object("dbInfo", &mut roi.stamp);
        table.bind("structureNumber", &mut roi.number);
        table.bind("interpretedType", &mut roi.interpreted_type);
        table.bind("name", &mut roi.name);
        table.bind_object("color", &mut roi.color);
        table.bind("isDensityOverridden", &mut roi.is_density_overridden);
        table.bind("liesOnInterpolatedSlices", &mut roi.lies_on_interpolated_slices);
        table.bind("isDisplayed", &mut roi.is_displayed);
        table.search(brief)?;
        table.finish(brief)?;
        Ok(roi)
    }
}

/// Structure set
///
/// Built from a `fullStructureSetDataArray` element or a plan's
/// `plannedStructureSet`, both holding `structureSet` and `troiList`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureSet {
    pub stamp: DbStamp,
    pub label: String,
    pub associated_image: String,
    pub modified_associated_image: String,
    pub rois: Vec<Roi>,
}

impl StructureSet {
    /// Structure set SOP instance UID
    pub fn uid(&self) -> &str {
        &self.stamp.uid
    }
}

impl FromNode for StructureSet {
    fn from_node(node: Node<'_, '_>) -> Result<Self> {
        let mut ss = StructureSet::default();
        let info = child(node, "structureSet")?;
        let mut table = SchemaTable::new();
        table.bind_object("dbInfo", &mut ss.stamp);
        table.bind("structureSetLabel", &mut ss.label);
        table.bind("associatedImage", &mut ss.associated_image);
        table.bind("modifiedAssociatedImage", &mut ss.modified_associated_image);
        table.search(info)?;
        table.finish(info)?;

        let mut table = SchemaTable::new();
        table.bind_list("troiList", &mut ss.rois);
        table.search(node)?;
        table.finish(node)?;
        Ok(ss)
    }
}
