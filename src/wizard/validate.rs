//! Per-step validation: pure functions of the draft

use std::fmt;

use crate::models::ListingDraft;
use crate::wizard::state::Step;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub step: Step,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({}): {}", self.step.number(), self.step.label(), self.message)
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn fail(step: Step, message: &str) -> Result<(), ValidationError> {
    Err(ValidationError {
        step,
        message: message.to_string(),
    })
}

/// Check the fields one step requires; never mutates the draft
pub fn validate_step(draft: &ListingDraft, step: Step) -> Result<(), ValidationError> {
    match step {
        Step::Location => {
            let l = &draft.location;
            if [&l.street, &l.postal_code, &l.city, &l.country]
                .iter()
                .any(|v| blank(v))
            {
                return fail(step, "Veuillez remplir tous les champs de localisation");
            }
        }
        Step::Housing => {
            let h = &draft.housing;
            if [&h.total_roommates, &h.bathrooms, &h.private_area]
                .iter()
                .any(|v| blank(v))
            {
                return fail(step, "Veuillez remplir tous les champs concernant le logement");
            }
        }
        Step::Details => {
            let d = &draft.details;
            let missing_text = [
                &d.total_area,
                &d.rooms,
                &d.available_date,
                &d.rent,
                &d.title,
                &d.description,
            ]
            .iter()
            .any(|v| blank(v));
            if d.property_type.is_none() || missing_text {
                return fail(step, "Veuillez remplir tous les champs obligatoires des détails");
            }
        }
        Step::Photos => {
            if draft.photos.is_empty() {
                return fail(step, "Veuillez ajouter au moins une photo");
            }
        }
        Step::Services => {}
        Step::Contact => {
            let c = &draft.contact;
            let missing = [&c.contact_name, &c.contact_phone, &c.contact_email]
                .iter()
                .any(|v| blank(v));
            if missing || !c.accept_terms {
                return fail(
                    step,
                    "Veuillez remplir tous les champs de contact et accepter les conditions",
                );
            }
        }
    }
    Ok(())
}

/// First step, in order, whose requirements are not met
pub fn first_invalid_step(draft: &ListingDraft) -> Option<ValidationError> {
    Step::ALL
        .iter()
        .find_map(|step| validate_step(draft, *step).err())
}
