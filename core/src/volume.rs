//! Raw binary volume loading
//!
//! Volume files are headerless arrays written big-endian by the planning
//! station. The header in the archive gives the element type and the
//! dimensions, both of which are checked against the file before it is read.

use crate::error::{Result, TomoError};
use crate::model::VolumeHeader;
use log::debug;
use std::path::Path;

/// Element type of a volume file
pub trait Sample: Copy {
    /// Archive `dataType` tag for this element type
    const DATATYPE: &'static str;

    /// Width of one element in bytes
    const WIDTH: usize;

    /// Decodes one big-endian element; `bytes` is exactly `WIDTH` long
    fn from_be_slice(bytes: &[u8]) -> Self;
}

impl Sample for u16 {
    const DATATYPE: &'static str = "Short_Data";
    const WIDTH: usize = 2;

    fn from_be_slice(bytes: &[u8]) -> Self {
        u16::from_be_bytes([bytes[0], bytes[1]])
    }
}

impl Sample for f32 {
    const DATATYPE: &'static str = "Float_Data";
    const WIDTH: usize = 4;

    fn from_be_slice(bytes: &[u8]) -> Self {
        f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

/// Decodes a big-endian buffer; trailing bytes short of one element are ignored
pub fn decode<T: Sample>(bytes: &[u8]) -> Vec<T> {
    bytes.chunks_exact(T::WIDTH).map(T::from_be_slice).collect()
}

/// Loads the volume described by `header` from `dir`
///
/// # Errors
///
/// Fails if the header's datatype is not `T`'s, if the file length is not a
/// whole number of elements, or if the element count disagrees with the
/// header dimensions.
pub fn load_volume<T: Sample>(header: &VolumeHeader, dir: &Path) -> Result<Vec<T>> {
    if header.datatype != T::DATATYPE {
        return Err(TomoError::DomainInvariant(format!(
            "Unsupported volume data type {}; expected {}",
            header.datatype,
            T::DATATYPE
        )));
    }

    let path = dir.join(&header.filename);
    let size = std::fs::metadata(&path)?.len() as usize;
    if size % T::WIDTH != 0 {
        return Err(TomoError::DomainInvariant(format!(
            "Volume file {} size {} is not a multiple of {}",
            path.display(),
            size,
            T::WIDTH
        )));
    }
    let count = size / T::WIDTH;
    let expected = header.sample_count()?;
    if count != expected {
        return Err(TomoError::DomainInvariant(format!(
            "Volume file {} holds {} elements; header dimensions {:?} require {}",
            path.display(),
            count,
            header.dim,
            expected
        )));
    }

    debug!("Loading {} {} elements from {}", count, T::DATATYPE, path.display());
    let bytes = std::fs::read(&path)?;
    Ok(decode(&bytes))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    pub(crate) fn u16_bytes(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    pub(crate) fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    fn header(filename: &str, datatype: &str, dim: [usize; 3]) -> VolumeHeader {
        VolumeHeader {
            filename: filename.to_string(),
            datatype: datatype.to_string(),
            dim,
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_big_endian() {
        assert_eq!(decode::<u16>(&[0x01, 0x02, 0xff, 0x00]), vec![0x0102, 0xff00]);
        assert_eq!(decode::<f32>(&1.5f32.to_be_bytes()), vec![1.5]);
    }

    #[test]
    fn test_load_short_volume() {
        let dir = TempDir::new().unwrap();
        let values: Vec<u16> = (0..8).map(|v| v * 1000).collect();
        std::fs::write(dir.path().join("ct.img"), u16_bytes(&values)).unwrap();

        let loaded: Vec<u16> = load_volume(&header("ct.img", "Short_Data", [2, 2, 2]), dir.path()).unwrap();
        assert_eq!(loaded, values);
    }

    #[test]
    fn test_load_float_volume() {
        let dir = TempDir::new().unwrap();
        let values = [0.0f32, 0.5, 1.25, -2.0];
        std::fs::write(dir.path().join("dose.img"), f32_bytes(&values)).unwrap();

        let loaded: Vec<f32> = load_volume(&header("dose.img", "Float_Data", [2, 2, 1]), dir.path()).unwrap();
        assert_eq!(loaded, values.to_vec());
    }

    #[test]
    fn test_datatype_mismatch() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ct.img"), [0u8; 8]).unwrap();
        let err = load_volume::<f32>(&header("ct.img", "Short_Data", [2, 1, 1]), dir.path()).unwrap_err();
        assert!(err.to_string().contains("Unsupported volume data type"));
    }

    #[rstest]
    #[case(7, [2, 2, 1])]
    #[case(1, [1, 1, 1])]
    #[case(9, [2, 2, 1])]
    fn test_partial_short_element_rejected(#[case] len: usize, #[case] dim: [usize; 3]) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ct.img"), vec![0u8; len]).unwrap();
        let err = load_volume::<u16>(&header("ct.img", "Short_Data", dim), dir.path()).unwrap_err();
        assert!(err.to_string().contains("not a multiple of 2"));
    }

    #[rstest]
    #[case(6, [1, 1, 1])]
    #[case(13, [1, 1, 3])]
    #[case(15, [2, 2, 1])]
    #[case(18, [2, 2, 1])]
    fn test_partial_float_element_rejected(#[case] len: usize, #[case] dim: [usize; 3]) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("dose.img"), vec![0u8; len]).unwrap();
        let err = load_volume::<f32>(&header("dose.img", "Float_Data", dim), dir.path()).unwrap_err();
        assert!(matches!(err, TomoError::DomainInvariant(_)));
        assert!(err.to_string().contains("not a multiple of 4"));
    }

    #[test]
    fn test_dimension_mismatch() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ct.img"), [0u8; 8]).unwrap();
        let err = load_volume::<u16>(&header("ct.img", "Short_Data", [2, 2, 2]), dir.path()).unwrap_err();
        assert!(matches!(err, TomoError::DomainInvariant(_)));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_volume::<u16>(&header("absent.img", "Short_Data", [1, 1, 1]), dir.path()).unwrap_err();
        assert!(matches!(err, TomoError::IoError(_)));
    }
}
