use crate::error::{Result, TomoError};
use crate::model::image::ImageEntry;
use crate::model::{DbStamp, Image, StructureSet, FINAL_DOSE_IMAGE_TYPE};
use crate::schema::{child, FromNode, SchemaTable};
use roxmltree::Node;
use std::collections::HashMap;

/// One optimization attempt within a plan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trial {
    pub doses: Vec<Image>,
}

impl FromNode for Trial {
    fn from_node(node: Node<'_, '_>) -> Result<Self> {
        let mut trial = Trial::default();
        let mut table = SchemaTable::new();
        table.bind_list("doseVolumeList", &mut trial.doses);
        table.search(node)?;
        table.finish(node)?;
        Ok(trial)
    }
}

/// Delivery review record; only its stamp and approval flag are used
#[derive(Debug, Clone, Default)]
struct DeliveryReview {
    stamp: DbStamp,
    approved: bool,
}

impl FromNode for DeliveryReview {
    fn from_node(node: Node<'_, '_>) -> Result<Self> {
        let review = child(node, "deliveryReview")?;
        let mut record = DeliveryReview::default();
        let mut table = SchemaTable::new();
        table.bind_object("dbInfo", &mut record.stamp);
        table.bind("approved", &mut record.approved);
        table.search(review)?;
        table.remove_optional(review, "approved", false);
        table.finish(review)?;
        Ok(record)
    }
}

/// Picks the UID of the single approved delivery review
fn approved_review_uid(reviews: &[DeliveryReview]) -> Result<String> {
    let mut approved = reviews.iter().filter(|r| r.approved);
    match (approved.next(), approved.next()) {
        (Some(review), None) => Ok(review.stamp.uid.clone()),
        (None, _) => Err(TomoError::DomainInvariant(
            "No approved delivery review found for plan".to_string(),
        )),
        (Some(_), Some(_)) => Err(TomoError::DomainInvariant(format!(
            "Found {} approved delivery reviews for plan",
            reviews.iter().filter(|r| r.approved).count()
        ))),
    }
}

/// A treatment plan
///
/// Built from a `fullPlanDataArray` element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub stamp: DbStamp,
    pub label: String,
    pub beamlet_ivdt: String,
    pub full_dose_ivdt: String,
    /// UID of the approved delivery review, exported as the RT plan
    pub rtplan_uid: String,
    pub structure_set: StructureSet,
    pub images: Vec<Image>,
    pub trials: Vec<Trial>,
    image_index: HashMap<String, usize>,
}

/// Reference to a dose volume inside a plan's trials
#[derive(Debug, Clone, Copy)]
pub struct DoseRef<'a> {
    pub image: &'a Image,
    /// Position of the dose in its trial's list
    pub index: usize,
}

impl Plan {
    /// Plan image with the given UID
    pub fn image(&self, uid: &str) -> Option<&Image> {
        self.image_index.get(uid).map(|&i| &self.images[i])
    }

    /// First dose volume tagged as the final optimized dose
    pub fn final_dose(&self) -> Option<DoseRef<'_>> {
        self.trials.iter().find_map(|trial| {
            trial
                .doses
                .iter()
                .position(|d| d.image_type == FINAL_DOSE_IMAGE_TYPE)
                .map(|index| DoseRef {
                    image: &trial.doses[index],
                    index,
                })
        })
    }

    fn read_brief(&mut self, node: Node<'_, '_>) -> Result<()> {
        let brief = child(node, "briefPlan")?;
        let mut table = SchemaTable::new();
        table.bind("beamletIVDT", &mut self.beamlet_ivdt);
        table.bind("fullDoseIVDT", &mut self.full_dose_ivdt);
        table.search(node)?;
        table.finish(node)?;

        let mut table = SchemaTable::new();
        table.bind_object("dbInfo", &mut self.stamp);
        table.bind("planLabel", &mut self.label);
        table.search(brief)?;
        table.finish(brief)
    }
}

impl FromNode for Plan {
    fn from_node(node: Node<'_, '_>) -> Result<Self> {
        let mut plan = Plan::default();
        plan.read_brief(child(node, "plan")?)?;

        let mut images: Vec<ImageEntry> = Vec::new();
        let mut reviews: Vec<DeliveryReview> = Vec::new();
        let mut table = SchemaTable::new();
        table.bind_object("plannedStructureSet", &mut plan.structure_set);
        table.bind_list("fullImageDataArray", &mut images);
        table.bind_list("fullPlanTrialArray", &mut plan.trials);
        table.bind_list("fullDeliveryReviewDataArray", &mut reviews);
        table.search(node)?;
        table.finish(node)?;

        plan.images = images.into_iter().map(|entry| entry.0).collect();
        if plan.images.is_empty() {
            return Err("Empty plan image sequence".into());
        }
        if plan.trials.is_empty() {
            return Err("Empty plan trial sequence".into());
        }
        for (i, image) in plan.images.iter().enumerate() {
            plan.image_index.entry(image.stamp.uid.clone()).or_insert(i);
        }
        plan.rtplan_uid = approved_review_uid(&reviews)?;
        Ok(plan)
    }
}
