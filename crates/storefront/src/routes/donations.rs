//! Waste donation API.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use recraft_core::pincode::INVALID_FORMAT_MESSAGE;
use recraft_core::{Condition, DonationId};

use super::form::MultipartForm;
use crate::db::DonationRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::Donation;
use crate::state::AppState;

/// Photos accepted with one donation.
pub const MAX_DONATION_IMAGES: usize = 6;

/// Body of a successful `POST /api/donations`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationCreated {
    pub message: &'static str,
    pub donation_id: DonationId,
    pub donation: Donation,
}

/// Record a donation from a multipart form.
#[instrument(skip(state, multipart))]
pub async fn create(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<DonationCreated>)> {
    let mut form =
        MultipartForm::read(multipart, &[("images", MAX_DONATION_IMAGES)]).await?;

    let material_type = form
        .first_text(&["materialType", "material_type", "material"])
        .ok_or_else(|| AppError::BadRequest("material_type is required".to_owned()))?;
    let quantity = form
        .text("quantity")
        .ok_or_else(|| AppError::BadRequest("quantity is required".to_owned()))?;
    let condition = form
        .text("condition")
        .map(|raw| raw.parse::<Condition>().map_err(AppError::BadRequest))
        .transpose()?;

    let pickup = form.flag("pickup");
    let pincode = form.text("pincode");
    let (pickup_serviceable, region) = match pincode.as_deref() {
        Some(code) if pickup => {
            let result = state.checker().check(code).await?;
            if result.is_format_rejection() {
                return Err(AppError::BadRequest(INVALID_FORMAT_MESSAGE.to_owned()));
            }
            (Some(result.serviceable), result.region)
        }
        _ => (None, None),
    };

    let mut images = Vec::new();
    for file in form.take_files("images") {
        match state.uploads().save(&file.file_name, &file.bytes).await {
            Ok(reference) => images.push(reference),
            Err(e) => {
                discard_all(&state, &images).await;
                return Err(e.into());
            }
        }
    }

    let donation = Donation {
        id: DonationId::generate(),
        donor_name: form.text("donor_name"),
        material_type,
        quantity,
        condition,
        images,
        notes: form.text("notes"),
        pickup,
        address: form.text("address"),
        pincode,
        contact: form.text("contact"),
        consent: form.flag("consent"),
        pickup_serviceable,
        region,
        created_at: chrono::Utc::now(),
    };

    let saved = match DonationRepository::new(state.store()).insert(donation.clone()).await {
        Ok(saved) => saved,
        Err(e) => {
            discard_all(&state, &donation.images).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        donation_id = %saved.id,
        material = %saved.material_type,
        images = saved.images.len(),
        "donation recorded"
    );
    add_breadcrumb(
        "donation",
        "Donation recorded",
        Some(&[("donation_id", saved.id.as_str())]),
    );

    Ok((
        StatusCode::CREATED,
        Json(DonationCreated {
            message: "Donation recorded",
            donation_id: saved.id.clone(),
            donation: saved,
        }),
    ))
}

/// All donations, newest first.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Json<Vec<Donation>> {
    Json(DonationRepository::new(state.store()).all().await)
}

/// One donation by id.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<DonationId>,
) -> Result<Json<Donation>> {
    DonationRepository::new(state.store())
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Donation not found".to_owned()))
}

async fn discard_all(state: &AppState, references: &[String]) {
    for reference in references {
        state.uploads().discard(reference).await;
    }
}
