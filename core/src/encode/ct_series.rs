use crate::encode::tags::*;
use crate::encode::{output, DatasetWriter, ExportContext, OutputObject};
use crate::error::{Result, TomoError};
use crate::geometry::slice_positions;
use crate::model::{Image, KVCT_IMAGE_TYPE};
use crate::volume::load_volume;
use dicom_core::VR;
use dicom_dictionary_std::uids;

/// Planning CT volume split into one object per axial slice
///
/// The volume is loaded once; instances are encoded on demand so that only
/// one slice dataset is alive at a time.
pub struct CtSeries<'a> {
    image: &'a Image,
    series: DatasetWriter,
    positions: Vec<[f32; 3]>,
    pixels: Vec<u16>,
}

impl<'a> CtSeries<'a> {
    /// Loads the volume of `image` and prepares the series-level attributes
    ///
    /// # Errors
    ///
    /// Fails if `image` is not a kVCT, if its volume cannot be loaded, or if
    /// any series attribute is rejected.
    pub fn new(ctx: &ExportContext<'_>, image: &'a Image) -> Result<Self> {
        if image.image_type != KVCT_IMAGE_TYPE {
            return Err(TomoError::DomainInvariant(format!(
                "Unexpected image type: {}",
                image.image_type
            )));
        }
        let header = &image.header;
        let pixels = load_volume::<u16>(header, ctx.dir)?;

        let mut w = ctx.base_dataset()?;
        let stamp = &image.stamp;
        let series_number = stamp.series_number();
        w.put_strs(IMAGE_TYPE, VR::CS, &["ORIGINAL", "SECONDARY", "AXIAL"])?;
        w.put_all(&[
            (SOP_CLASS_UID, VR::UI, uids::CT_IMAGE_STORAGE),
            (SERIES_DATE, VR::DA, stamp.date.as_str()),
            (ACQUISITION_DATE, VR::DA, stamp.date.as_str()),
            (SERIES_TIME, VR::TM, stamp.time.as_str()),
            (ACQUISITION_TIME, VR::TM, stamp.time.as_str()),
            (MODALITY, VR::CS, "CT"),
            (SERIES_DESCRIPTION, VR::LO, "kVCT Image Set"),
            (DERIVATION_DESCRIPTION, VR::ST, "Resampled kVCT data set"),
            (CONTRAST_BOLUS_AGENT, VR::LO, ""),
            (KVP, VR::DS, ""),
            (PATIENT_POSITION, VR::CS, image.patient_position.as_str()),
            (SERIES_INSTANCE_UID, VR::UI, image.uid()),
            (SERIES_NUMBER, VR::IS, series_number.as_str()),
            (ACQUISITION_NUMBER, VR::IS, ""),
            (FRAME_OF_REFERENCE_UID, VR::UI, image.frame_of_reference.as_str()),
            (POSITION_REFERENCE_INDICATOR, VR::LO, ""),
            (PHOTOMETRIC_INTERPRETATION, VR::CS, "MONOCHROME2"),
        ])?;
        w.put_decimal(SLICE_THICKNESS, header.spacing[2])?;
        w.put_decimals(IMAGE_ORIENTATION_PATIENT, &[1.0f32, 0.0, 0.0, 0.0, 1.0, 0.0])?;
        w.put_int(IMAGES_IN_ACQUISITION, header.slices() as i64)?;
        w.put_u16(SAMPLES_PER_PIXEL, 1);
        w.put_u16(ROWS, dimension(header.dim[1])?);
        w.put_u16(COLUMNS, dimension(header.dim[0])?);
        w.put_decimals(PIXEL_SPACING, &header.spacing[..2])?;
        w.put_u16(BITS_ALLOCATED, 16);
        w.put_u16(BITS_STORED, 16);
        w.put_u16(HIGH_BIT, 15);
        w.put_u16(PIXEL_REPRESENTATION, 0);
        w.put_decimal(RESCALE_INTERCEPT, -1024.0f32)?;
        w.put_decimal(RESCALE_SLOPE, 1.0f32)?;

        Ok(CtSeries {
            image,
            series: w,
            positions: slice_positions(header),
            pixels,
        })
    }

    /// Number of instances in the series
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Encodes instance `k` (1-based)
    pub fn instance(&self, k: usize) -> Result<OutputObject> {
        let position = self
            .positions
            .get(k.wrapping_sub(1))
            .ok_or_else(|| TomoError::DomainInvariant(format!("No CT instance {} in series {}", k, self.image.uid())))?;
        let frame_len = self.image.header.frame_len()?;
        let frame = self.pixels[(k - 1) * frame_len..k * frame_len].to_vec();
        let uid = self.image.instance_uid(k);

        let mut w = self.series.clone();
        w.put_str(SOP_INSTANCE_UID, VR::UI, &uid)?;
        w.put_int(INSTANCE_NUMBER, k as i64)?;
        w.put_decimals(IMAGE_POSITION_PATIENT, position)?;
        w.put_decimal(SLICE_LOCATION, -position[2])?;
        w.put_pixels(frame);
        Ok(output("CT", uids::CT_IMAGE_STORAGE, &uid, w))
    }

    /// Encodes every instance in order
    pub fn instances(&self) -> impl Iterator<Item = Result<OutputObject>> + '_ {
        (1..=self.len()).map(move |k| self.instance(k))
    }
}

fn dimension(n: usize) -> Result<u16> {
    u16::try_from(n).map_err(|_| TomoError::DomainInvariant(format!("Image dimension {} exceeds 65535", n)))
}
