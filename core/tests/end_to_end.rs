use dicom_dictionary_std::tags;
use dicom_object::{open_file, DefaultDicomObject};
use std::path::Path;
use tempfile::TempDir;
use tomodicom_core::{ArchiveConverter, ConversionOptions, IdentifierLookup, Result, TomoError};

const CT_UID: &str = "1.2.3";
const DOSE_UID: &str = "4.4.2";
const SS_UID: &str = "7.7.7";

fn stamp(uid: &str) -> String {
    format!(
        "<dbInfo><databaseUID>{uid}</databaseUID>\
         <creationTimestamp><date>20200102</date><time>030405</time></creationTimestamp></dbInfo>"
    )
}

fn image_fields(uid: &str, image_type: &str, datatype: &str) -> String {
    format!(
        r#"{}
        <frameOfReference>1.2.840.99.1</frameOfReference>
        <patientPosition>HFS</patientPosition>
        <imageType>{image_type}</imageType>
        <arrayHeader>
            <binaryFileName>{uid}.img</binaryFileName>
            <compressionType>NONE</compressionType>
            <dataType>{datatype}</dataType>
            <dimensions><x>2</x><y>2</y><z>3</z></dimensions>
            <origAxialDimensions><x>512</x><y>512</y></origAxialDimensions>
            <start><x>-1.0</x><y>-2.0</y><z>3.0</z></start>
            <elementSize><x>0.1</x><y>0.1</y><z>0.25</z></elementSize>
            <maxValue>100.0</maxValue>
            <minValue>0.0</minValue>
            <useAlternateZs>false</useAlternateZs>
            <originalZCoordinates><z>3.0</z><z>3.25</z><z>3.5</z></originalZCoordinates>
        </arrayHeader>"#,
        stamp(uid)
    )
}

fn roi(number: i32, name: &str, itype: &str, curve_file: &str) -> String {
    format!(
        r#"<troiList>
            <curveDataFile>{curve_file}</curveDataFile>
            <briefROI>
                {}
                <structureNumber>{number}</structureNumber>
                <interpretedType>{itype}</interpretedType>
                <name>{name}</name>
                <color><red>0</red><green>255</green><blue>0</blue></color>
                <isDensityOverridden>false</isDensityOverridden>
                <liesOnInterpolatedSlices>false</liesOnInterpolatedSlices>
                <isDisplayed>true</isDisplayed>
            </briefROI>
        </troiList>"#,
        stamp(&format!("3.3.{number}"))
    )
}

fn structure_set() -> String {
    format!(
        r#"<structureSet>
            {}
            <structureSetLabel>Contours</structureSetLabel>
            <associatedImage>{CT_UID}</associatedImage>
            <modifiedAssociatedImage>{CT_UID}</modifiedAssociatedImage>
        </structureSet>
        <troiList>{}{}</troiList>"#,
        stamp(SS_UID),
        roi(1, "Body", "External", "body.xml"),
        roi(2, "PTV", "PTV", "ptv.xml"),
    )
}

fn review(uid: &str, approved: bool) -> String {
    format!(
        "<fullDeliveryReviewDataArray><deliveryReview>{}<approved>{approved}</approved>\
         </deliveryReview></fullDeliveryReviewDataArray>",
        stamp(uid)
    )
}

fn plan(approvals: &[bool]) -> String {
    let reviews: String = approvals
        .iter()
        .enumerate()
        .map(|(i, &a)| review(&format!("9.9.{}", i + 1), a))
        .collect();
    format!(
        r#"<fullPlanDataArray>
            <plan>
                <briefPlan>{}<planLabel>Prostate</planLabel></briefPlan>
                <beamletIVDT>ivdt-1</beamletIVDT>
                <fullDoseIVDT>ivdt-2</fullDoseIVDT>
            </plan>
            <plannedStructureSet>{}</plannedStructureSet>
            <fullImageDataArray><fullImageDataArray><image>{}</image></fullImageDataArray></fullImageDataArray>
            <fullPlanTrialArray><fullPlanTrialArray><doseVolumeList>
                <doseVolumeList>{}</doseVolumeList>
                <doseVolumeList>{}</doseVolumeList>
            </doseVolumeList></fullPlanTrialArray></fullPlanTrialArray>
            <fullDeliveryReviewDataArray>{reviews}</fullDeliveryReviewDataArray>
        </fullPlanDataArray>"#,
        stamp("5.5.5"),
        structure_set(),
        image_fields(CT_UID, "KVCT", "Short_Data"),
        image_fields("4.4.1", "Opt_Dose_Before_EOP", "Float_Data"),
        image_fields(DOSE_UID, "Opt_Dose_After_EOP", "Float_Data"),
    )
}

fn disease(approvals: &[bool]) -> String {
    format!(
        r#"<fullDiseaseDataArray>
            <disease>
                <patientsAge>050Y</patientsAge>
                <briefDisease>{}<diseaseName>Prostate Ca</diseaseName></briefDisease>
            </disease>
            <fullStructureSetDataArray><fullStructureSetDataArray>{}</fullStructureSetDataArray></fullStructureSetDataArray>
            <fullDicomStudyDataArray><fullDicomStudyDataArray><dicomStudy>
                <originalStudyUID>2.2.2</originalStudyUID>
                <studyDescription>Pelvis</studyDescription>
                <accessionNumber>ACC1</accessionNumber>
                <originalStudyDate>20191231</originalStudyDate>
                <originalStudyTime>235959</originalStudyTime>
            </dicomStudy></fullDicomStudyDataArray></fullDicomStudyDataArray>
            <fullPlanDataArray>{}</fullPlanDataArray>
            <fullImageDataArray><fullImageDataArray><image>{}</image></fullImageDataArray></fullImageDataArray>
        </fullDiseaseDataArray>"#,
        stamp("6.6.6"),
        structure_set(),
        plan(approvals),
        image_fields(CT_UID, "KVCT", "Short_Data"),
    )
}

fn patient_document(diseases: &[String]) -> String {
    format!(
        r#"<TomoTherapy><FullPatient>
            <patient><briefPatient>
                {}
                <patientName>DOE^JANE</patientName>
                <patientID>TMP1</patientID>
                <patientBirthDate>19700101</patientBirthDate>
                <patientGender>Female</patientGender>
            </briefPatient></patient>
            <fullDiseaseDataArray>{}</fullDiseaseDataArray>
        </FullPatient></TomoTherapy>"#,
        stamp("1.1"),
        diseases.concat()
    )
}

fn curve(index: usize, slice: usize, points: &str) -> String {
    format!(
        "<ROICurve_{index}><curveIndex>{index}</curveIndex><sliceOrientation>AXIAL</sliceOrientation>\
         <sliceValue>{slice}</sliceValue><slicePlaneIndex>{slice}</slicePlaneIndex>\
         <attachedCurves/><pointData>{points}</pointData></ROICurve_{index}>"
    )
}

/// Writes an archive with the given diseases into a fresh directory
fn write_archive(diseases: &[String]) -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let primary = dir.path().join("patient.xml");
    std::fs::write(&primary, patient_document(diseases)).unwrap();
    std::fs::write(
        dir.path().join("machine.xml"),
        "<TomoTherapy><FullMachine><machine><briefMachine>\
         <machineName>HiArt-1</machineName></briefMachine></machine></FullMachine></TomoTherapy>",
    )
    .unwrap();

    let ct: Vec<u8> = (0u16..12).flat_map(|v| (v * 100).to_be_bytes()).collect();
    std::fs::write(dir.path().join(format!("{CT_UID}.img")), ct).unwrap();
    let dose: Vec<u8> = (0..12).flat_map(|v| (v as f32 * 0.5).to_be_bytes()).collect();
    std::fs::write(dir.path().join(format!("{DOSE_UID}.img")), dose).unwrap();

    std::fs::write(
        dir.path().join("body.xml"),
        format!("<ROICurves>{}</ROICurves>", curve(0, 0, "")),
    )
    .unwrap();
    let triangle = "0.0,0.0,-3.0;0.1,0.0,-3.0;0.0,0.1,-3.0;";
    std::fs::write(
        dir.path().join("ptv.xml"),
        format!(
            "<ROICurves>{}{}{}</ROICurves>",
            curve(0, 0, triangle),
            curve(1, 1, triangle),
            curve(2, 2, triangle)
        ),
    )
    .unwrap();

    (dir, primary)
}

struct FixedLookup(Option<&'static str>);

impl IdentifierLookup for FixedLookup {
    fn lookup(&self, _host: &str, _port: u16, _name: &str) -> Result<String> {
        self.0
            .map(str::to_string)
            .ok_or_else(|| TomoError::Lookup("Patient name not found in MRN database".to_string()))
    }
}

fn open(dir: &Path, name: &str) -> DefaultDicomObject {
    open_file(dir.join(name)).unwrap()
}

fn string(obj: &DefaultDicomObject, tag: dicom_core::Tag) -> String {
    obj.element(tag)
        .unwrap()
        .to_str()
        .unwrap()
        .trim_end_matches(['\0', ' '])
        .to_string()
}

#[test]
fn test_convert_archive() {
    let (src, primary) = write_archive(&[disease(&[true, false])]);
    let out = TempDir::new().unwrap();
    let options = ConversionOptions::default().with_out_dir(out.path());
    let converter = ArchiveConverter::with_lookup(options, FixedLookup(Some("MRN-9")));

    let summary = converter.convert(&primary).unwrap();

    assert_eq!(summary.patient_id, "MRN-9");
    assert_eq!(summary.ct_instances, 3);
    assert_eq!(summary.doses, 1);
    assert_eq!(summary.structure_sets, 1);
    assert_eq!(
        summary.files,
        vec![
            "CT1.2.3.1.dcm",
            "CT1.2.3.2.dcm",
            "CT1.2.3.3.dcm",
            "RD4.4.2.dcm",
            "RS7.7.7.dcm",
        ]
    );
    for path in summary.paths() {
        assert!(path.is_file(), "{} not written", path.display());
    }

    let ct = open(out.path(), "CT1.2.3.2.dcm");
    assert_eq!(string(&ct, tags::SOP_INSTANCE_UID), "1.2.3.2");
    assert_eq!(string(&ct, tags::PATIENT_ID), "MRN-9");
    assert_eq!(string(&ct, tags::SERIES_INSTANCE_UID), CT_UID);
    assert_eq!(string(&ct, tags::INSTANCE_NUMBER), "2");
    assert!(ct.element(tags::STATION_NAME).is_err());

    let rd = open(out.path(), "RD4.4.2.dcm");
    assert_eq!(string(&rd, tags::MODALITY), "RTDOSE");
    assert_eq!(string(&rd, tags::STATION_NAME), "HiArt-1");
    assert_eq!(string(&rd, tags::NUMBER_OF_FRAMES), "3");
    let refs = rd.element(tags::REFERENCED_IMAGE_SEQUENCE).unwrap().items().unwrap();
    let referenced: Vec<String> = refs
        .iter()
        .map(|item| {
            item.element(tags::REFERENCED_SOP_INSTANCE_UID)
                .unwrap()
                .to_str()
                .unwrap()
                .trim_end_matches(['\0', ' '])
                .to_string()
        })
        .collect();
    assert_eq!(referenced, vec!["1.2.3.1", "1.2.3.2", "1.2.3.3"]);
    let plans = rd.element(tags::REFERENCED_RT_PLAN_SEQUENCE).unwrap().items().unwrap();
    assert_eq!(
        plans[0]
            .element(tags::REFERENCED_SOP_INSTANCE_UID)
            .unwrap()
            .to_str()
            .unwrap()
            .trim_end_matches('\0'),
        "9.9.1"
    );

    let rs = open(out.path(), "RS7.7.7.dcm");
    assert_eq!(string(&rs, tags::MODALITY), "RTSTRUCT");
    let rois = rs.element(tags::STRUCTURE_SET_ROI_SEQUENCE).unwrap().items().unwrap();
    assert_eq!(rois.len(), 2);
    let contours = rs.element(tags::ROI_CONTOUR_SEQUENCE).unwrap().items().unwrap();
    assert_eq!(contours.len(), 1);
    let items = contours[0].element(tags::CONTOUR_SEQUENCE).unwrap().items().unwrap();
    assert_eq!(items.len(), 3);

    drop(src);
}

#[test]
fn test_long_free_text_still_converts() {
    let name = "Prostate Carcinoma 3";
    let label = "Planning Contours v2";
    let archive = disease(&[true])
        .replace("Prostate Ca", name)
        .replace("Contours", label);
    let (_src, primary) = write_archive(&[archive]);
    let out = TempDir::new().unwrap();
    let options = ConversionOptions::default().with_out_dir(out.path()).with_lookup(None);

    let summary = ArchiveConverter::new(options).convert(&primary).unwrap();

    assert_eq!(summary.files.len(), 5);
    let ct = open(out.path(), "CT1.2.3.1.dcm");
    assert_eq!(string(&ct, tags::STUDY_ID), name);
    let rs = open(out.path(), "RS7.7.7.dcm");
    assert_eq!(string(&rs, tags::STRUCTURE_SET_LABEL), label);
}

#[test]
fn test_dry_run_writes_nothing() {
    let (_src, primary) = write_archive(&[disease(&[true])]);
    let out = TempDir::new().unwrap();
    let options = ConversionOptions::default()
        .with_out_dir(out.path())
        .with_dry_run(true)
        .with_lookup(None);

    let summary = ArchiveConverter::new(options).convert(&primary).unwrap();

    assert!(summary.dry_run);
    assert_eq!(summary.patient_id, "TMP1");
    assert_eq!(summary.files.len(), 5);
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn test_repeated_series_skipped() {
    let (_src, primary) = write_archive(&[disease(&[true]), disease(&[true])]);
    let out = TempDir::new().unwrap();
    let options = ConversionOptions::default().with_out_dir(out.path()).with_lookup(None);

    let summary = ArchiveConverter::new(options).convert(&primary).unwrap();

    assert_eq!(summary.ct_instances, 3);
    assert_eq!(summary.skipped_series, vec![CT_UID.to_string()]);
    assert_eq!(summary.doses, 2);
    assert_eq!(summary.structure_sets, 2);
}

#[test]
fn test_approval_count_enforced() {
    for approvals in [&[false, false][..], &[true, true][..]] {
        let (_src, primary) = write_archive(&[disease(approvals)]);
        let options = ConversionOptions::default().with_dry_run(true).with_lookup(None);
        let err = ArchiveConverter::new(options).convert(&primary).unwrap_err();
        assert!(matches!(err, TomoError::DomainInvariant(_)), "{approvals:?}: {err}");
    }
}

#[test]
fn test_lookup_failure() {
    let (_src, primary) = write_archive(&[disease(&[true])]);
    let options = ConversionOptions::default().with_dry_run(true);

    let err = ArchiveConverter::with_lookup(options.clone(), FixedLookup(None))
        .convert(&primary)
        .unwrap_err();
    assert!(matches!(err, TomoError::Lookup(_)));

    let summary = ArchiveConverter::with_lookup(options.with_skip_lookup_errors(true), FixedLookup(None))
        .convert(&primary)
        .unwrap();
    assert_eq!(summary.patient_id, "TMP1");
    assert!(summary.lookup_warning.unwrap().contains("not found"));
}

#[test]
fn test_missing_output_directory() {
    let (src, primary) = write_archive(&[disease(&[true])]);
    let options = ConversionOptions::default()
        .with_out_dir(src.path().join("missing"))
        .with_lookup(None);
    let err = ArchiveConverter::new(options).convert(&primary).unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}
