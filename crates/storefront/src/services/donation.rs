//! Waste donation intake.
//!
//! An [`IntakeWorkflow`] holds one donation form in *Draft* until it passes
//! validation and, when pickup is requested, a positive serviceability check.
//! A successful submit stores the donation, remembers it as the last
//! submission and resets the form for the next one.

use chrono::Utc;
use thiserror::Error;

use recraft_core::{Condition, DonationId, Pincode};

use super::serviceability::ServiceabilityChecker;
use super::validation::ValidationErrors;
use crate::db::{DonationRepository, RepositoryError};
use crate::kv::{JsonStore, StoreError};
use crate::models::Donation;

/// Most images a donation may carry.
pub const MAX_IMAGES: usize = 5;

/// Largest accepted image, in bytes.
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Longest accepted notes, in characters.
pub const MAX_NOTES_CHARS: usize = 500;

/// Shortest accepted pickup address after trimming.
pub const MIN_ADDRESS_CHARS: usize = 6;

/// Shown when pickup is requested for a pincode outside the service area.
pub const NOT_SERVICEABLE_MESSAGE: &str = "This pincode is not serviceable for pickup.";
/// Shown when pickup is requested before the pincode was checked.
pub const UNVERIFIED_PINCODE_MESSAGE: &str = "Please verify pincode serviceability before submitting.";
const INVALID_PINCODE_MESSAGE: &str = "Enter a valid 6-digit pincode.";
const CHECK_FAILED_MESSAGE: &str = "Couldn't check serviceability. Please try again.";

/// Errors that can occur when submitting a donation.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// One or more fields failed validation; the form stays in draft.
    #[error("invalid donation: {0}")]
    Validation(ValidationErrors),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<StoreError> for IntakeError {
    fn from(err: StoreError) -> Self {
        Self::Repository(err.into())
    }
}

impl From<ValidationErrors> for IntakeError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// An image attached to a donation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonationImage {
    /// Where the image is kept, e.g. `/uploads/<name>`.
    pub reference: String,
    pub size_bytes: u64,
}

/// Raw donation form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DonationForm {
    pub donor_name: String,
    pub material_type: String,
    pub quantity: String,
    /// One of `clean`, `good`, `broken`, `mixed`.
    pub condition: String,
    pub images: Vec<DonationImage>,
    pub notes: String,
    pub pickup: bool,
    pub address: String,
    pub pincode: String,
    pub contact: String,
    pub consent: bool,
}

impl DonationForm {
    /// Run the field rules: structure first, then the pickup fields, then
    /// consent.
    ///
    /// # Errors
    ///
    /// Returns every failing field with its message.
    pub fn validate(&self) -> Result<Condition, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.check(
            self.material_type.trim().chars().count() < 2,
            "materialType",
            "Please enter the material type.",
        );
        errors.check(
            self.quantity.trim().is_empty(),
            "quantity",
            "Please specify quantity or approx. weight.",
        );
        let condition = self.condition.parse::<Condition>().ok();
        errors.check(condition.is_none(), "condition", "Select a condition");
        errors.check(
            self.images.len() > MAX_IMAGES,
            "images",
            &format!("Max {MAX_IMAGES} images"),
        );
        errors.check(
            self.images.iter().any(|i| i.size_bytes > MAX_IMAGE_BYTES),
            "images",
            "Each image must be ≤ 5MB",
        );
        errors.check(
            self.notes.chars().count() > MAX_NOTES_CHARS,
            "notes",
            "Keep it short (≤ 500 chars)",
        );

        if self.pickup {
            errors.check(
                self.address.trim().chars().count() < MIN_ADDRESS_CHARS,
                "address",
                "Pickup address is required.",
            );
            errors.check(
                Pincode::parse(&self.pincode).is_err(),
                "pincode",
                INVALID_PINCODE_MESSAGE,
            );
        }

        errors.check(
            !self.consent,
            "consent",
            "Please confirm you're donating responsibly.",
        );

        errors.into_result()?;
        condition.ok_or_else(|| ValidationErrors::single("condition", "Select a condition"))
    }

    /// A blank form that remembers only the pickup preference.
    fn reset(&mut self) {
        *self = Self {
            pickup: self.pickup,
            ..Self::default()
        };
    }
}

/// Serviceability of the form's current pincode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PinStatus {
    /// Not checked since the pincode last changed.
    #[default]
    Idle,
    /// A lookup is in flight.
    Checking,
    Serviceable {
        region: Option<String>,
        message: String,
    },
    NotServiceable {
        message: String,
    },
    /// The lookup itself failed; the user may retry.
    Failed {
        message: String,
    },
}

impl PinStatus {
    /// Whether the last check found pickup available.
    #[must_use]
    pub const fn is_serviceable(&self) -> bool {
        matches!(self, Self::Serviceable { .. })
    }

    fn region(&self) -> Option<String> {
        match self {
            Self::Serviceable { region, .. } => region.clone(),
            _ => None,
        }
    }
}

/// Where the workflow stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IntakeState {
    #[default]
    Draft,
    /// The previous form was recorded under this id; the next edit starts a
    /// new draft.
    Submitted { donation_id: DonationId },
}

/// Drives one donation form from draft to submission.
pub struct IntakeWorkflow<'a> {
    store: &'a JsonStore,
    checker: &'a ServiceabilityChecker,
    form: DonationForm,
    pin: PinStatus,
    state: IntakeState,
}

impl<'a> IntakeWorkflow<'a> {
    /// Start with an empty draft.
    #[must_use]
    pub fn new(store: &'a JsonStore, checker: &'a ServiceabilityChecker) -> Self {
        Self {
            store,
            checker,
            form: DonationForm::default(),
            pin: PinStatus::Idle,
            state: IntakeState::Draft,
        }
    }

    /// The form as currently edited.
    #[must_use]
    pub const fn form(&self) -> &DonationForm {
        &self.form
    }

    /// Result of the latest pincode check.
    #[must_use]
    pub const fn pin_status(&self) -> &PinStatus {
        &self.pin
    }

    /// Where the workflow is between draft and submitted.
    #[must_use]
    pub const fn state(&self) -> &IntakeState {
        &self.state
    }

    /// Edit the form. Changing the pincode invalidates any earlier check.
    pub fn edit(&mut self, f: impl FnOnce(&mut DonationForm)) {
        let before = self.form.pincode.clone();
        f(&mut self.form);
        if self.form.pincode != before {
            self.pin = PinStatus::Idle;
        }
        self.state = IntakeState::Draft;
    }

    /// Replace the pincode.
    pub fn set_pincode(&mut self, pincode: impl Into<String>) {
        let pincode = pincode.into();
        self.edit(|form| form.pincode = pincode);
    }

    /// Look up serviceability for the current pincode.
    ///
    /// Lookup failures are not errors here: they land in
    /// [`PinStatus::Failed`] so the user can retry.
    ///
    /// # Errors
    ///
    /// Returns a `pincode` validation error when the code is malformed; no
    /// lookup is made in that case.
    #[tracing::instrument(skip(self), fields(pincode = %self.form.pincode))]
    pub async fn check_pincode(&mut self) -> Result<&PinStatus, ValidationErrors> {
        if Pincode::parse(&self.form.pincode).is_err() {
            return Err(ValidationErrors::single("pincode", INVALID_PINCODE_MESSAGE));
        }

        self.pin = PinStatus::Checking;
        self.pin = match self.checker.check(&self.form.pincode).await {
            Ok(result) if result.serviceable => PinStatus::Serviceable {
                region: result.region,
                message: result.message,
            },
            Ok(result) => PinStatus::NotServiceable {
                message: result.message,
            },
            Err(e) => {
                tracing::warn!(error = %e, "serviceability lookup failed");
                PinStatus::Failed {
                    message: CHECK_FAILED_MESSAGE.to_owned(),
                }
            }
        };
        Ok(&self.pin)
    }

    /// Validate and record the donation.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::Validation` when a field fails or when pickup is
    /// requested without a positive serviceability check. The form is left
    /// untouched in that case. Returns `IntakeError::Repository` if the write
    /// fails.
    #[tracing::instrument(skip(self), fields(pickup = self.form.pickup))]
    pub async fn submit(&mut self) -> Result<Donation, IntakeError> {
        let condition = self.form.validate()?;

        if self.form.pickup && !self.pin.is_serviceable() {
            let message = match self.pin {
                PinStatus::NotServiceable { .. } => NOT_SERVICEABLE_MESSAGE,
                _ => UNVERIFIED_PINCODE_MESSAGE,
            };
            return Err(ValidationErrors::single("pincode", message).into());
        }

        let donation = self.build(condition);
        let repo = DonationRepository::new(self.store);
        let mut batch = self.store.write().await;
        let donation = repo.stage_insert(&mut batch, donation).await?;
        DonationRepository::stage_set_last(&mut batch, &donation)?;
        batch.commit().await?;

        tracing::info!(donation_id = %donation.id, "donation recorded");
        self.form.reset();
        self.pin = PinStatus::Idle;
        self.state = IntakeState::Submitted {
            donation_id: donation.id.clone(),
        };
        Ok(donation)
    }

    fn build(&self, condition: Condition) -> Donation {
        let form = &self.form;
        let pickup = form.pickup;
        Donation {
            id: DonationId::generate(),
            donor_name: non_empty(&form.donor_name),
            material_type: form.material_type.trim().to_owned(),
            quantity: form.quantity.trim().to_owned(),
            condition: Some(condition),
            images: form.images.iter().map(|i| i.reference.clone()).collect(),
            notes: non_empty(&form.notes),
            pickup,
            address: pickup.then(|| form.address.trim().to_owned()),
            pincode: pickup.then(|| form.pincode.trim().to_owned()),
            contact: non_empty(&form.contact),
            consent: form.consent,
            pickup_serviceable: Some(pickup && self.pin.is_serviceable()),
            region: self.pin.region(),
            created_at: Utc::now(),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_owned())
}
