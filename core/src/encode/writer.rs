//! Validated dataset construction and file output
//!
//! [`DatasetWriter`] is the only way the encoders touch a dataset. Values
//! that cannot be encoded at all (a malformed UID, a lowercase code string,
//! an overlong integer string) surface as [`TomoError::Encode`] naming the
//! attribute. Free text longer than its VR allows is written as-is with a
//! warning; archives routinely carry such values.

use crate::error::{Result, TomoError};
use dicom_core::value::DataSetSequence;
use dicom_core::{DataElement, PrimitiveValue, Tag, VR};
use dicom_dictionary_std::uids;
use dicom_object::{FileMetaTableBuilder, InMemDicomObject};
use log::{debug, warn};
use std::fmt;
use std::path::{Path, PathBuf};

use super::tags::PIXEL_DATA;

/// Floating point types accepted as decimal strings
pub trait Decimal: fmt::Display + fmt::LowerExp + Copy {
    fn finite(self) -> bool;
}

impl Decimal for f32 {
    fn finite(self) -> bool {
        self.is_finite()
    }
}

impl Decimal for f64 {
    fn finite(self) -> bool {
        self.is_finite()
    }
}

/// Formats `value` as a DS string of at most 16 characters
///
/// The shortest round-trip form is used when it fits; otherwise precision is
/// dropped from a scientific form until it does. Returns `None` for values
/// that have no DS representation.
pub fn format_ds<T: Decimal>(value: T) -> Option<String> {
    if !value.finite() {
        return None;
    }
    let plain = value.to_string();
    if plain == "-0" {
        return Some("0".to_string());
    }
    if plain.len() <= 16 {
        return Some(plain);
    }
    (0..16)
        .rev()
        .map(|precision| format!("{:.*e}", precision, value))
        .find(|s| s.len() <= 16)
}

/// Whether `value` can be encoded as `vr` at all
fn check_value(vr: VR, value: &str) -> bool {
    match vr {
        VR::UI => value.len() <= 64 && value.chars().all(|c| c.is_ascii_digit() || c == '.'),
        VR::CS => !value.chars().any(|c| c.is_lowercase()),
        VR::DS => value.len() <= 16,
        VR::IS => value.len() <= 12,
        _ => true,
    }
}

/// Maximum length of a text VR, where exceeding it is tolerated
fn soft_limit(vr: VR) -> Option<usize> {
    match vr {
        VR::CS | VR::SH => Some(16),
        VR::LO => Some(64),
        _ => None,
    }
}

/// Dataset under construction
#[derive(Debug, Clone)]
pub struct DatasetWriter {
    obj: InMemDicomObject,
}

impl Default for DatasetWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetWriter {
    pub fn new() -> Self {
        Self {
            obj: InMemDicomObject::new_empty(),
        }
    }

    fn reject(tag: Tag, value: impl Into<String>) -> TomoError {
        TomoError::Encode {
            key: tag.to_string(),
            value: value.into(),
        }
    }

    fn validate(tag: Tag, vr: VR, value: &str) -> Result<()> {
        if !check_value(vr, value) {
            return Err(Self::reject(tag, value));
        }
        if let Some(limit) = soft_limit(vr).filter(|&limit| value.chars().count() > limit) {
            warn!("{} value {:?} is longer than {} characters", tag, value, limit);
        }
        Ok(())
    }

    /// Inserts a string attribute; an empty value is written as zero length
    pub fn put_str(&mut self, tag: Tag, vr: VR, value: &str) -> Result<()> {
        if value.is_empty() {
            self.put_empty(tag, vr);
            return Ok(());
        }
        Self::validate(tag, vr, value)?;
        self.obj
            .put(DataElement::new(tag, vr, PrimitiveValue::from(value)));
        Ok(())
    }

    /// Inserts a multi-valued string attribute
    pub fn put_strs<S: AsRef<str>>(&mut self, tag: Tag, vr: VR, values: &[S]) -> Result<()> {
        for value in values {
            Self::validate(tag, vr, value.as_ref())?;
        }
        let values = values.iter().map(|v| v.as_ref().to_string()).collect();
        self.obj
            .put(DataElement::new(tag, vr, PrimitiveValue::Strs(values)));
        Ok(())
    }

    /// Inserts a run of string attributes
    pub fn put_all(&mut self, pairs: &[(Tag, VR, &str)]) -> Result<()> {
        for &(tag, vr, value) in pairs {
            self.put_str(tag, vr, value)?;
        }
        Ok(())
    }

    /// Inserts a zero-length attribute
    pub fn put_empty(&mut self, tag: Tag, vr: VR) {
        self.obj.put(DataElement::new(tag, vr, PrimitiveValue::Empty));
    }

    /// Inserts an integer string (IS)
    pub fn put_int(&mut self, tag: Tag, value: i64) -> Result<()> {
        self.put_ints(tag, &[value])
    }

    /// Inserts a multi-valued integer string (IS)
    pub fn put_ints(&mut self, tag: Tag, values: &[i64]) -> Result<()> {
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        self.put_strs(tag, VR::IS, &values)
    }

    /// Inserts a decimal string (DS)
    pub fn put_decimal<T: Decimal>(&mut self, tag: Tag, value: T) -> Result<()> {
        self.put_decimals(tag, &[value])
    }

    /// Inserts a multi-valued decimal string (DS)
    pub fn put_decimals<T: Decimal>(&mut self, tag: Tag, values: &[T]) -> Result<()> {
        let values = values
            .iter()
            .map(|&v| format_ds(v).ok_or_else(|| Self::reject(tag, v.to_string())))
            .collect::<Result<Vec<String>>>()?;
        self.put_strs(tag, VR::DS, &values)
    }

    /// Inserts an unsigned short (US)
    pub fn put_u16(&mut self, tag: Tag, value: u16) {
        self.obj.put(DataElement::new(tag, VR::US, PrimitiveValue::from(value)));
    }

    /// Inserts an attribute tag (AT)
    pub fn put_tag(&mut self, tag: Tag, value: Tag) {
        self.obj.put(DataElement::new(
            tag,
            VR::AT,
            PrimitiveValue::Tags(std::iter::once(value).collect()),
        ));
    }

    /// Inserts a sequence built from finished items
    pub fn put_sequence(&mut self, tag: Tag, items: Vec<DatasetWriter>) {
        let items: Vec<InMemDicomObject> = items.into_iter().map(DatasetWriter::finish).collect();
        self.obj
            .put(DataElement::new(tag, VR::SQ, DataSetSequence::from(items)));
    }

    /// Inserts 16-bit native pixel data
    pub fn put_pixels(&mut self, data: Vec<u16>) {
        self.obj
            .put(DataElement::new(PIXEL_DATA, VR::OW, PrimitiveValue::U16(data.into())));
    }

    /// Read access to the dataset built so far
    pub fn dataset(&self) -> &InMemDicomObject {
        &self.obj
    }

    pub fn finish(self) -> InMemDicomObject {
        self.obj
    }
}

/// A finished object waiting to be written
#[derive(Debug, Clone)]
pub struct OutputObject {
    pub file_name: String,
    pub sop_class_uid: String,
    pub sop_instance_uid: String,
    pub dataset: InMemDicomObject,
}

impl OutputObject {
    /// Writes the object to `dir`, returning the path written
    ///
    /// The file carries a meta group and an Implicit VR Little Endian body.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.file_name);
        let meta = FileMetaTableBuilder::new()
            .media_storage_sop_class_uid(self.sop_class_uid.as_str())
            .media_storage_sop_instance_uid(self.sop_instance_uid.as_str())
            .transfer_syntax(uids::IMPLICIT_VR_LITTLE_ENDIAN)
            .build()
            .map_err(|e| TomoError::Write(e.to_string()))?;
        self.dataset
            .clone()
            .with_exact_meta(meta)
            .write_to_file(&path)
            .map_err(|e| TomoError::Write(format!("{}: {}", path.display(), e)))?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }
}
