use crate::encode::tags::*;
use crate::encode::{output, sop_reference, DatasetWriter, ExportContext, OutputObject, DETACHED_STUDY_MANAGEMENT_SOP_CLASS};
use crate::error::{Result, TomoError};
use crate::model::{Curve, Image, Roi, StructureSet};
use dicom_core::VR;
use dicom_dictionary_std::uids;
use log::debug;

/// Encodes `structure_set` against the disease CT it was drawn on
///
/// # Errors
///
/// Fails if the associated image is not among the disease images, if a
/// curve document cannot be read, or if an ROI has an unrecognized
/// interpreted type.
pub fn encode_structure_set(ctx: &ExportContext<'_>, structure_set: &StructureSet) -> Result<OutputObject> {
    let image = ctx.disease.image(&structure_set.associated_image).ok_or_else(|| {
        TomoError::DomainInvariant(format!("Missing plan image {}", structure_set.associated_image))
    })?;
    let uid = structure_set.uid();
    let series_uid = format!("{}.1", uid);
    let series_number = structure_set.stamp.series_number();

    let mut w = ctx.base_dataset()?;
    w.put_all(&[
        (SOP_CLASS_UID, VR::UI, uids::RT_STRUCTURE_SET_STORAGE),
        (SOP_INSTANCE_UID, VR::UI, uid),
        (MODALITY, VR::CS, "RTSTRUCT"),
        (SERIES_INSTANCE_UID, VR::UI, series_uid.as_str()),
        (SERIES_NUMBER, VR::IS, series_number.as_str()),
        (STRUCTURE_SET_LABEL, VR::SH, structure_set.label.as_str()),
        (STRUCTURE_SET_DATE, VR::DA, structure_set.stamp.date.as_str()),
        (STRUCTURE_SET_TIME, VR::TM, structure_set.stamp.time.as_str()),
    ])?;
    w.put_int(INSTANCE_NUMBER, 3)?;

    w.put_sequence(
        REFERENCED_FRAME_OF_REFERENCE_SEQUENCE,
        vec![frame_of_reference_item(&ctx.disease.study().uid, image)?],
    );

    let rois = &structure_set.rois;
    let descriptors = rois
        .iter()
        .map(|roi| roi_descriptor(roi, image))
        .collect::<Result<Vec<_>>>()?;
    w.put_sequence(STRUCTURE_SET_ROI_SEQUENCE, descriptors);

    let mut contours = Vec::new();
    for roi in rois {
        let curves = roi.load_curves(ctx.dir)?;
        match roi_contour(roi, &curves, image)? {
            Some(item) => contours.push(item),
            None => debug!("ROI {} ({}) has no contours", roi.number, roi.name),
        }
    }
    w.put_sequence(ROI_CONTOUR_SEQUENCE, contours);

    let observations = rois.iter().map(observation).collect::<Result<Vec<_>>>()?;
    w.put_sequence(RT_ROI_OBSERVATIONS_SEQUENCE, observations);

    Ok(output("RS", uids::RT_STRUCTURE_SET_STORAGE, uid, w))
}

/// Frame of reference → study → series → every CT instance
fn frame_of_reference_item(study_uid: &str, image: &Image) -> Result<DatasetWriter> {
    let contour_images = (1..=image.header.slices())
        .map(|k| sop_reference(uids::CT_IMAGE_STORAGE, &image.instance_uid(k)))
        .collect::<Result<Vec<_>>>()?;

    let mut series = DatasetWriter::new();
    series.put_str(SERIES_INSTANCE_UID, VR::UI, image.uid())?;
    series.put_sequence(CONTOUR_IMAGE_SEQUENCE, contour_images);

    let mut study = sop_reference(DETACHED_STUDY_MANAGEMENT_SOP_CLASS, study_uid)?;
    study.put_sequence(RT_REFERENCED_SERIES_SEQUENCE, vec![series]);

    let mut item = DatasetWriter::new();
    item.put_str(FRAME_OF_REFERENCE_UID, VR::UI, &image.frame_of_reference)?;
    item.put_sequence(RT_REFERENCED_STUDY_SEQUENCE, vec![study]);
    Ok(item)
}

fn roi_descriptor(roi: &Roi, image: &Image) -> Result<DatasetWriter> {
    let mut item = DatasetWriter::new();
    item.put_int(ROI_NUMBER, roi.number.into())?;
    item.put_str(REFERENCED_FRAME_OF_REFERENCE_UID, VR::UI, &image.frame_of_reference)?;
    item.put_str(ROI_NAME, VR::LO, &roi.name)?;
    item.put_str(ROI_GENERATION_ALGORITHM, VR::CS, "MANUAL")?;
    Ok(item)
}

/// Contour item for `roi`, or `None` if none of its curves has a point
fn roi_contour(roi: &Roi, curves: &[Curve], image: &Image) -> Result<Option<DatasetWriter>> {
    let mut contours = Vec::new();
    for curve in curves.iter().filter(|c| !c.points.is_empty()) {
        let mut item = DatasetWriter::new();
        item.put_sequence(
            CONTOUR_IMAGE_SEQUENCE,
            vec![sop_reference(
                uids::CT_IMAGE_STORAGE,
                &format!("{}.{}", image.uid(), curve.instance_number()),
            )?],
        );
        item.put_str(CONTOUR_GEOMETRIC_TYPE, VR::CS, "CLOSED_PLANAR")?;
        item.put_int(NUMBER_OF_CONTOUR_POINTS, curve.point_count() as i64)?;
        item.put_decimals(CONTOUR_DATA, &curve.points)?;
        contours.push(item);
    }
    if contours.is_empty() {
        return Ok(None);
    }

    let color = roi.color;
    let mut item = DatasetWriter::new();
    item.put_ints(ROI_DISPLAY_COLOR, &[color.red.into(), color.green.into(), color.blue.into()])?;
    item.put_int(REFERENCED_ROI_NUMBER, roi.number.into())?;
    item.put_sequence(CONTOUR_SEQUENCE, contours);
    Ok(Some(item))
}

fn observation(roi: &Roi) -> Result<DatasetWriter> {
    let interpreted = roi.interpreted_type()?;
    let mut item = DatasetWriter::new();
    item.put_int(OBSERVATION_NUMBER, roi.number.into())?;
    item.put_int(REFERENCED_ROI_NUMBER, roi.number.into())?;
    item.put_str(RT_ROI_INTERPRETED_TYPE, VR::CS, interpreted.dicom_code().unwrap_or(""))?;
    item.put_empty(ROI_INTERPRETER, VR::PN);
    Ok(item)
}
