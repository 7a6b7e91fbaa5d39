//! Artisan catalog API.
//!
//! Products are sent as multipart forms with an optional `image` file.
//! Replacing or deleting a product removes the image it no longer uses.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use tracing::instrument;

use recraft_core::{CatalogProductId, Price};

use super::form::MultipartForm;
use crate::db::{CatalogInput, CatalogRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::CatalogProduct;
use crate::state::AppState;

const NOT_FOUND: &str = "Product not found";

/// Read the product fields and store the image, if one was sent.
async fn read_input(state: &AppState, multipart: Multipart) -> Result<CatalogInput> {
    let mut form = MultipartForm::read(multipart, &[("image", 1)]).await?;

    let price = form
        .text("price")
        .map(|raw| Price::parse(&raw).map_err(|e| AppError::BadRequest(e.to_string())))
        .transpose()?;

    let image = match form.take_files("image").into_iter().next() {
        Some(file) => Some(state.uploads().save(&file.file_name, &file.bytes).await?),
        None => None,
    };

    Ok(CatalogInput {
        title: form.text("title"),
        description: form.text("description"),
        price,
        artisan: form.text("artisan"),
        image,
    })
}

async fn discard_new_image(state: &AppState, input: &CatalogInput) {
    if let Some(image) = &input.image {
        state.uploads().discard(image).await;
    }
}

/// Create a product.
#[instrument(skip(state, multipart))]
pub async fn create(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CatalogProduct>)> {
    let input = read_input(&state, multipart).await?;
    let image = input.image.clone();

    match CatalogRepository::new(state.store()).create(input).await {
        Ok(product) => {
            tracing::info!(product_id = %product.id, title = %product.title, "product created");
            add_breadcrumb(
                "catalog",
                "Product created",
                Some(&[("product_id", product.id.as_str())]),
            );
            Ok((StatusCode::CREATED, Json(product)))
        }
        Err(e) => {
            if let Some(image) = image {
                state.uploads().discard(&image).await;
            }
            Err(e.into())
        }
    }
}

/// All products.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Json<Vec<CatalogProduct>> {
    Json(CatalogRepository::new(state.store()).all().await)
}

/// One product by id.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<CatalogProductId>,
) -> Result<Json<CatalogProduct>> {
    CatalogRepository::new(state.store())
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_owned()))
}

/// Update the fields present in the form.
#[instrument(skip(state, multipart))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<CatalogProductId>,
    multipart: Multipart,
) -> Result<Json<CatalogProduct>> {
    let input = read_input(&state, multipart).await?;
    let repo = CatalogRepository::new(state.store());

    let Some(previous) = repo.get(&id).await else {
        discard_new_image(&state, &input).await;
        return Err(AppError::NotFound(NOT_FOUND.to_owned()));
    };
    let replaces_image = input.image.is_some();
    let new_image = input.image.clone();

    let updated = match repo.update(&id, input).await {
        Ok(Some(updated)) => updated,
        Ok(None) => {
            if let Some(image) = &new_image {
                state.uploads().discard(image).await;
            }
            return Err(AppError::NotFound(NOT_FOUND.to_owned()));
        }
        Err(e) => {
            if let Some(image) = &new_image {
                state.uploads().discard(image).await;
            }
            return Err(e.into());
        }
    };

    if replaces_image && let Some(old) = previous.image {
        state.uploads().discard(&old).await;
    }
    tracing::info!(product_id = %updated.id, "product updated");
    Ok(Json(updated))
}

/// Delete a product. Unknown ids are not an error.
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<CatalogProductId>,
) -> Result<Json<Value>> {
    let repo = CatalogRepository::new(state.store());
    let image = repo.get(&id).await.and_then(|p| p.image);

    if repo.delete(&id).await? {
        if let Some(image) = image {
            state.uploads().discard(&image).await;
        }
        tracing::info!(product_id = %id, "product deleted");
    }
    Ok(Json(json!({ "message": "Product deleted" })))
}
