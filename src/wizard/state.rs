//! Wizard state machine: every draft mutation goes through `reduce`

use crate::clients::ResolvedAddress;
use crate::models::{ListingDraft, MediaRef, PropertyType, Service};
use crate::wizard::validate::validate_step;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    Location,
    Housing,
    Details,
    Photos,
    Services,
    Contact,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::Location,
        Step::Housing,
        Step::Details,
        Step::Photos,
        Step::Services,
        Step::Contact,
    ];

    /// 1-based position shown in the progress bar
    pub fn number(self) -> u8 {
        match self {
            Step::Location => 1,
            Step::Housing => 2,
            Step::Details => 3,
            Step::Photos => 4,
            Step::Services => 5,
            Step::Contact => 6,
        }
    }

    pub fn from_number(n: u8) -> Option<Step> {
        Step::ALL.iter().copied().find(|s| s.number() == n)
    }

    pub fn next(self) -> Option<Step> {
        Step::from_number(self.number() + 1)
    }

    pub fn previous(self) -> Option<Step> {
        self.number().checked_sub(1).and_then(Step::from_number)
    }

    pub fn label(self) -> &'static str {
        match self {
            Step::Location => "Localisation",
            Step::Housing => "Logement",
            Step::Details => "Détails",
            Step::Photos => "Photos",
            Step::Services => "Services",
            Step::Contact => "Contact",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Editing(Step),
    Submitting,
    Submitted { listing_id: String },
    SubmitFailed { message: String },
}

/// Free-text inputs of the draft, each owned by exactly one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Street,
    PostalCode,
    City,
    Country,
    TotalRoommates,
    Bathrooms,
    PrivateArea,
    TotalArea,
    Rooms,
    Floor,
    AvailableDate,
    Rent,
    Title,
    Description,
    ContactName,
    ContactPhone,
    ContactEmail,
}

impl TextField {
    pub fn step(self) -> Step {
        use TextField::*;
        match self {
            Street | PostalCode | City | Country => Step::Location,
            TotalRoommates | Bathrooms | PrivateArea => Step::Housing,
            TotalArea | Rooms | Floor | AvailableDate | Rent | Title | Description => {
                Step::Details
            }
            ContactName | ContactPhone | ContactEmail => Step::Contact,
        }
    }

    fn slot(self, draft: &mut ListingDraft) -> &mut String {
        use TextField::*;
        match self {
            Street => &mut draft.location.street,
            PostalCode => &mut draft.location.postal_code,
            City => &mut draft.location.city,
            Country => &mut draft.location.country,
            TotalRoommates => &mut draft.housing.total_roommates,
            Bathrooms => &mut draft.housing.bathrooms,
            PrivateArea => &mut draft.housing.private_area,
            TotalArea => &mut draft.details.total_area,
            Rooms => &mut draft.details.rooms,
            Floor => &mut draft.details.floor,
            AvailableDate => &mut draft.details.available_date,
            Rent => &mut draft.details.rent,
            Title => &mut draft.details.title,
            Description => &mut draft.details.description,
            ContactName => &mut draft.contact.contact_name,
            ContactPhone => &mut draft.contact.contact_phone,
            ContactEmail => &mut draft.contact.contact_email,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetText(TextField, String),
    SetPropertyType(Option<PropertyType>),
    SetFurnished(bool),
    /// Overwrites street, postal code, city, country and coordinates together
    ApplyAddress(ResolvedAddress),
    AddPhoto(MediaRef),
    RemovePhoto(usize),
    SetService(Service, bool),
    SetAcceptTerms(bool),
    Next,
    Previous,
    BeginSubmit,
    SubmitSucceeded { listing_id: String },
    SubmitFailed { message: String },
}

impl Action {
    /// Step whose form produces this edit; `None` for navigation and submission actions
    fn owning_step(&self) -> Option<Step> {
        match self {
            Action::SetText(field, _) => Some(field.step()),
            Action::SetPropertyType(_) | Action::SetFurnished(_) => Some(Step::Details),
            Action::ApplyAddress(_) => Some(Step::Location),
            Action::AddPhoto(_) | Action::RemovePhoto(_) => Some(Step::Photos),
            Action::SetService(..) => Some(Step::Services),
            Action::SetAcceptTerms(_) => Some(Step::Contact),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WizardState {
    draft: ListingDraft,
    phase: Phase,
    validation_error: Option<String>,
}

impl WizardState {
    pub fn new(draft: ListingDraft) -> Self {
        Self {
            draft,
            phase: Phase::Editing(Step::Location),
            validation_error: None,
        }
    }

    pub fn draft(&self) -> &ListingDraft {
        &self.draft
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn validation_error(&self) -> Option<&str> {
        self.validation_error.as_deref()
    }

    /// Step whose form is on screen and accepts edits
    pub fn active_step(&self) -> Option<Step> {
        match self.phase {
            Phase::Editing(step) => Some(step),
            Phase::SubmitFailed { .. } => Some(Step::Contact),
            Phase::Submitting | Phase::Submitted { .. } => None,
        }
    }

    /// Progress-bar position, 1..=6
    pub fn current_step(&self) -> u8 {
        self.active_step().unwrap_or(Step::Contact).number()
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == Phase::Submitting
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Submitted { .. })
    }
}

fn apply_edit(draft: &mut ListingDraft, action: Action) {
    match action {
        Action::SetText(field, value) => *field.slot(draft) = value,
        Action::SetPropertyType(kind) => draft.details.property_type = kind,
        Action::SetFurnished(furnished) => draft.details.furnished = furnished,
        Action::ApplyAddress(address) => {
            draft.location.street = address.street;
            draft.location.postal_code = address.postal_code;
            draft.location.city = address.city;
            draft.location.country = address.country;
            draft.location.coordinates = address.coordinates;
        }
        Action::AddPhoto(media) => draft.photos.push(media),
        Action::RemovePhoto(index) => {
            if index < draft.photos.len() {
                draft.photos.remove(index);
            }
        }
        Action::SetService(service, enabled) => draft.services.set(service, enabled),
        Action::SetAcceptTerms(accepted) => draft.contact.accept_terms = accepted,
        _ => {}
    }
}

/// Pure transition function `(state, action) -> state`
pub fn reduce(mut state: WizardState, action: Action) -> WizardState {
    if state.is_finished() {
        return state;
    }
    if state.is_submitting() {
        match action {
            Action::SubmitSucceeded { listing_id } => {
                state.phase = Phase::Submitted { listing_id };
            }
            Action::SubmitFailed { message } => {
                state.phase = Phase::SubmitFailed { message };
            }
            // Nothing else may touch the draft while it is being published
            _ => {}
        }
        return state;
    }

    let Some(active) = state.active_step() else {
        return state;
    };

    if let Some(owner) = action.owning_step() {
        // Steps already passed stay valid because only the visible form can edit
        if owner == active {
            apply_edit(&mut state.draft, action);
        }
        return state;
    }

    match action {
        Action::Next => {
            if let Some(next) = active.next() {
                match validate_step(&state.draft, active) {
                    Ok(()) => {
                        state.phase = Phase::Editing(next);
                        state.validation_error = None;
                    }
                    Err(e) => state.validation_error = Some(e.message),
                }
            }
        }
        Action::Previous => {
            if let Some(previous) = active.previous() {
                state.phase = Phase::Editing(previous);
                state.validation_error = None;
            }
        }
        Action::BeginSubmit => {
            if active == Step::Contact {
                match validate_step(&state.draft, Step::Contact) {
                    Ok(()) => {
                        state.phase = Phase::Submitting;
                        state.validation_error = None;
                    }
                    Err(e) => state.validation_error = Some(e.message),
                }
            }
        }
        // Outcomes only make sense while submitting
        _ => {}
    }
    state
}
