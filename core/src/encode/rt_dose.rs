use crate::encode::tags::*;
use crate::encode::{output, sop_reference, ExportContext, OutputObject};
use crate::error::{Result, TomoError};
use crate::geometry::{grid_frame_offsets, image_position};
use crate::model::Plan;
use crate::volume::load_volume;
use dicom_core::VR;
use dicom_dictionary_std::uids;
use log::debug;

/// Quantizes dose samples to 16 bits
///
/// Returns the quantized samples and the grid scaling that maps them back to
/// dose. The largest sample maps to 65535. With no positive sample the
/// scaling is 1 and every value is 0.
pub fn quantize(samples: &[f32]) -> (Vec<u16>, f64) {
    let max = samples.iter().copied().fold(0.0f32, f32::max) as f64;
    let scale = if max > 0.0 { max / u16::MAX as f64 } else { 1.0 };
    let quantized = samples
        .iter()
        .map(|&x| (x as f64 / scale).round().clamp(0.0, u16::MAX as f64) as u16)
        .collect();
    (quantized, scale)
}

/// Encodes the final optimized dose of `plan`
///
/// # Errors
///
/// Fails if the plan's reference image or its final dose cannot be resolved,
/// or if the dose volume cannot be loaded.
pub fn encode_dose(ctx: &ExportContext<'_>, plan: &Plan) -> Result<OutputObject> {
    let structure_set = &plan.structure_set;
    let image = plan
        .image(&structure_set.modified_associated_image)
        .ok_or_else(|| {
            TomoError::DomainInvariant(format!(
                "Cannot find plan reference image {}",
                structure_set.modified_associated_image
            ))
        })?;
    let dose_ref = plan
        .final_dose()
        .ok_or_else(|| TomoError::DomainInvariant("Cannot find final optimized dose".to_string()))?;
    let dose = dose_ref.image;
    let header = &dose.header;

    let samples = load_volume::<f32>(header, ctx.dir)?;
    let (pixels, scale) = quantize(&samples);
    debug!("Dose {} grid scaling {}", dose.uid(), scale);

    let series_uid = format!("{}.1", dose.uid());
    let series_number = dose.stamp.series_number();
    let position = image_position(header);

    let mut w = ctx.base_dataset()?;
    w.put_strs(IMAGE_TYPE, VR::CS, &["ORIGINAL", "PRIMARY", "AXIAL"])?;
    w.put_all(&[
        (SOP_CLASS_UID, VR::UI, uids::RT_DOSE_STORAGE),
        (SOP_INSTANCE_UID, VR::UI, dose.uid()),
        (ACQUISITION_DATE, VR::DA, dose.stamp.date.as_str()),
        (ACQUISITION_TIME, VR::TM, dose.stamp.time.as_str()),
        (MODALITY, VR::CS, "RTDOSE"),
        (STATION_NAME, VR::SH, ctx.machine.name.as_str()),
        (OPERATORS_NAME, VR::PN, ""),
        (SERIES_DESCRIPTION, VR::LO, "TomoTherapy Planned Dose"),
        (SERIES_INSTANCE_UID, VR::UI, series_uid.as_str()),
        (SERIES_NUMBER, VR::IS, series_number.as_str()),
        (FRAME_OF_REFERENCE_UID, VR::UI, dose.frame_of_reference.as_str()),
        (POSITION_REFERENCE_INDICATOR, VR::LO, ""),
        (PHOTOMETRIC_INTERPRETATION, VR::CS, "MONOCHROME2"),
        (DOSE_UNITS, VR::CS, "GY"),
        (DOSE_TYPE, VR::CS, "PHYSICAL"),
        (DOSE_COMMENT, VR::LO, plan.label.as_str()),
        (DOSE_SUMMATION_TYPE, VR::CS, "PLAN"),
        (TISSUE_HETEROGENEITY_CORRECTION, VR::CS, "ROI_OVERRIDE"),
    ])?;

    w.put_decimal(SLICE_THICKNESS, header.spacing[2])?;
    w.put_int(INSTANCE_NUMBER, dose_ref.index as i64 + 1)?;
    w.put_decimals(IMAGE_POSITION_PATIENT, &position)?;
    w.put_decimals(IMAGE_ORIENTATION_PATIENT, &[1.0f32, 0.0, 0.0, 0.0, 1.0, 0.0])?;
    w.put_int(IMAGES_IN_ACQUISITION, 1)?;
    w.put_decimal(SLICE_LOCATION, -position[2])?;
    w.put_u16(SAMPLES_PER_PIXEL, 1);
    w.put_int(NUMBER_OF_FRAMES, header.slices() as i64)?;
    w.put_tag(FRAME_INCREMENT_POINTER, GRID_FRAME_OFFSET_VECTOR);
    w.put_u16(ROWS, u16::try_from(header.dim[1]).map_err(|_| oversized(header.dim[1]))?);
    w.put_u16(COLUMNS, u16::try_from(header.dim[0]).map_err(|_| oversized(header.dim[0]))?);
    w.put_decimals(PIXEL_SPACING, &header.spacing[..2])?;
    w.put_u16(BITS_ALLOCATED, 16);
    w.put_u16(BITS_STORED, 16);
    w.put_u16(HIGH_BIT, 15);
    w.put_u16(PIXEL_REPRESENTATION, 0);
    w.put_decimal(DOSE_GRID_SCALING, scale)?;
    w.put_decimals(GRID_FRAME_OFFSET_VECTOR, &grid_frame_offsets(header))?;

    let ct_refs = (1..=image.header.slices())
        .map(|k| sop_reference(uids::CT_IMAGE_STORAGE, &image.instance_uid(k)))
        .collect::<Result<Vec<_>>>()?;
    w.put_sequence(REFERENCED_IMAGE_SEQUENCE, ct_refs);
    w.put_sequence(
        REFERENCED_RT_PLAN_SEQUENCE,
        vec![sop_reference(uids::RT_PLAN_STORAGE, &plan.rtplan_uid)?],
    );
    w.put_sequence(
        REFERENCED_STRUCTURE_SET_SEQUENCE,
        vec![sop_reference(uids::RT_STRUCTURE_SET_STORAGE, structure_set.uid())?],
    );
    w.put_pixels(pixels);

    Ok(output("RD", uids::RT_DOSE_STORAGE, dose.uid(), w))
}

fn oversized(n: usize) -> TomoError {
    TomoError::DomainInvariant(format!("Dose dimension {} exceeds 65535", n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::tests::{context, disease, machine, patient};
    use crate::model::structures::tests::roi_xml;
    use crate::volume::tests::f32_bytes;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case(vec![0.0, 1.0, 2.0, 4.0])]
    #[case(vec![0.5, 0.25, 70.125, 3.0])]
    #[case(vec![1e-6, 3e-7])]
    #[case(vec![-1.0, 2.0])]
    fn test_quantize_reaches_full_range(#[case] samples: Vec<f32>) {
        let (quantized, scale) = quantize(&samples);
        assert_eq!(quantized.len(), samples.len());
        assert_eq!(quantized.iter().copied().max(), Some(u16::MAX));
        let max = samples.iter().copied().fold(f32::MIN, f32::max) as f64;
        assert!((scale - max / 65535.0).abs() <= f64::EPSILON * max);
    }

    #[test]
    fn test_quantize_non_positive() {
        let (quantized, scale) = quantize(&[0.0, -2.0, 0.0]);
        assert_eq!(scale, 1.0);
        assert_eq!(quantized, vec![0, 0, 0]);
    }

    #[test]
    fn test_quantize_rounds() {
        let (quantized, _) = quantize(&[65535.0, 1.4, 1.6, -3.0]);
        assert_eq!(quantized, vec![65535, 1, 2, 0]);
    }

    #[test]
    fn test_encode_dose() {
        let dir = TempDir::new().unwrap();
        let (patient, machine) = (patient(), machine());
        let disease = disease(&[roi_xml(1, "PTV", "PTV", "roi1.xml")]);
        let plan = &disease.plans[0];
        let samples: Vec<f32> = (0..12).map(|v| v as f32 * 0.5).collect();
        std::fs::write(dir.path().join("4.4.2.img"), f32_bytes(&samples)).unwrap();
        let ctx = context(&patient, &machine, &disease, dir.path());

        let object = encode_dose(&ctx, plan).unwrap();
        assert_eq!(object.file_name, "RD4.4.2.dcm");
        let dcm = &object.dataset;
        assert_eq!(get_string_value(dcm, SERIES_INSTANCE_UID).unwrap(), "4.4.2.1");
        assert_eq!(get_string_value(dcm, STATION_NAME).unwrap(), "HiArt-1");
        assert_eq!(get_string_value(dcm, DOSE_COMMENT).unwrap(), "Prostate");
        assert_eq!(get_int_value(dcm, INSTANCE_NUMBER), Some(2));
        assert_eq!(get_int_value(dcm, NUMBER_OF_FRAMES), Some(3));
        assert_eq!(
            get_float_values(dcm, GRID_FRAME_OFFSET_VECTOR).unwrap(),
            vec![0.0, -2.5, -5.0]
        );
        let scale = get_float_values(dcm, DOSE_GRID_SCALING).unwrap()[0];
        assert!((scale - 5.5 / 65535.0).abs() < 1e-12);

        let refs = get_items(dcm, REFERENCED_IMAGE_SEQUENCE);
        let referenced: Vec<String> = refs
            .iter()
            .map(|item| get_string_value(item, REFERENCED_SOP_INSTANCE_UID).unwrap())
            .collect();
        assert_eq!(referenced, vec!["1.2.3.1", "1.2.3.2", "1.2.3.3"]);

        let plan_refs = get_items(dcm, REFERENCED_RT_PLAN_SEQUENCE);
        assert_eq!(plan_refs.len(), 1);
        assert_eq!(get_string_value(&plan_refs[0], REFERENCED_SOP_INSTANCE_UID).unwrap(), "9.9.1");
        let ss_refs = get_items(dcm, REFERENCED_STRUCTURE_SET_SEQUENCE);
        assert_eq!(get_string_value(&ss_refs[0], REFERENCED_SOP_INSTANCE_UID).unwrap(), "7.7.7");
    }

    #[test]
    fn test_missing_final_dose() {
        let dir = TempDir::new().unwrap();
        let (patient, machine) = (patient(), machine());
        let mut disease = disease(&[roi_xml(1, "PTV", "PTV", "roi1.xml")]);
        for trial in &mut disease.plans[0].trials {
            trial.doses.retain(|d| d.uid() != "4.4.2");
        }
        let ctx = context(&patient, &machine, &disease, dir.path());
        let err = encode_dose(&ctx, &disease.plans[0]).unwrap_err();
        assert!(err.to_string().contains("final optimized dose"));
    }

    #[test]
    fn test_missing_reference_image() {
        let dir = TempDir::new().unwrap();
        let (patient, machine) = (patient(), machine());
        let mut disease = disease(&[roi_xml(1, "PTV", "PTV", "roi1.xml")]);
        disease.plans[0].structure_set.modified_associated_image = "8.8.8".to_string();
        let ctx = context(&patient, &machine, &disease, dir.path());
        let err = encode_dose(&ctx, &disease.plans[0]).unwrap_err();
        assert!(err.to_string().contains("Cannot find plan reference image 8.8.8"));
    }
}
