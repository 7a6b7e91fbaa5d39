//! Seller listing commands.

use std::path::PathBuf;

use clap::{Subcommand, ValueEnum};
use tracing::info;

use recraft_core::ListingId;
use recraft_storefront::db::{ListingFilter, ListingRepository};
use recraft_storefront::models::Listing;
use recraft_storefront::services::{ListingEdit, ListingPhoto, ListingService, SellForm};

use super::Context;

/// Listing status filter for `recraft listing list`.
#[derive(Clone, Copy, ValueEnum)]
pub enum StatusArg {
    All,
    Active,
    Inactive,
}

impl From<StatusArg> for ListingFilter {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::All => Self::All,
            StatusArg::Active => Self::Active,
            StatusArg::Inactive => Self::Inactive,
        }
    }
}

/// `recraft listing` subcommands.
#[derive(Subcommand)]
pub enum ListingAction {
    /// List a product for sale
    Create {
        #[arg(long)]
        product_name: String,
        #[arg(long)]
        shop_name: String,
        #[arg(long)]
        location: String,
        #[arg(long)]
        category: String,
        /// Price in rupees
        #[arg(long)]
        price: String,
        #[arg(long)]
        quantity: String,
        #[arg(long)]
        materials: String,
        #[arg(long)]
        description: String,
        /// Product photo (PNG, JPG or WEBP, at most 3MB)
        #[arg(long)]
        photo: Option<PathBuf>,
        #[arg(long)]
        allow_returns: bool,
    },
    /// List listings, newest first
    List {
        #[arg(short, long)]
        query: Option<String>,
        #[arg(short, long, value_enum, default_value = "all")]
        status: StatusArg,
    },
    /// Change a listing and its storefront product
    Edit {
        id: ListingId,
        #[arg(long)]
        title: Option<String>,
        /// Price in whole rupees
        #[arg(long)]
        price: Option<u64>,
        #[arg(long)]
        stock: Option<u32>,
        #[arg(long)]
        category: Option<String>,
        /// New product photo
        #[arg(long)]
        photo: Option<PathBuf>,
    },
    /// Delete a listing and its storefront product
    Delete { id: ListingId },
    /// Pause a listing
    Pause { id: ListingId },
    /// Resume a paused listing
    Resume { id: ListingId },
}

fn report(action: &str, listing: &Listing) {
    info!(
        id = %listing.id,
        price = listing.price,
        stock = listing.stock,
        active = listing.active,
        category = listing.category.as_deref().unwrap_or("-"),
        "{action}: {}",
        listing.title
    );
}

/// Run a listing command.
///
/// # Errors
///
/// Returns the validation or repository error of the failed operation, or
/// the error from copying a photo.
pub async fn run(ctx: &Context, action: ListingAction) -> Result<(), Box<dyn std::error::Error>> {
    let service = ListingService::new(ctx.store());

    match action {
        ListingAction::Create {
            product_name,
            shop_name,
            location,
            category,
            price,
            quantity,
            materials,
            description,
            photo,
            allow_returns,
        } => {
            let photo = match photo {
                Some(path) => {
                    let stored = ctx.store_file(&path).await?;
                    Some(ListingPhoto {
                        reference: stored.reference,
                        content_type: stored.content_type.to_owned(),
                        size_bytes: stored.size_bytes,
                    })
                }
                None => None,
            };
            let form = SellForm {
                product_name,
                shop_name,
                location,
                category,
                price,
                quantity,
                materials,
                description,
                photo,
                allow_returns,
            };
            match service.create(&form).await {
                Ok((listing, product)) => {
                    report("Listed", &listing);
                    info!(product_id = %product.id, "Storefront product created");
                }
                Err(e) => {
                    if let Some(photo) = &form.photo {
                        ctx.uploads.discard(&photo.reference).await;
                    }
                    return Err(e.into());
                }
            }
        }
        ListingAction::List { query, status } => {
            let listings = ListingRepository::new(ctx.store())
                .search(query.as_deref().unwrap_or_default(), status.into())
                .await;
            for listing in &listings {
                report("Listing", listing);
            }
            info!(count = listings.len(), "listings");
        }
        ListingAction::Edit {
            id,
            title,
            price,
            stock,
            category,
            photo,
        } => {
            let image = match photo {
                Some(path) => Some(ctx.store_file(&path).await?.reference),
                None => None,
            };
            let edit = ListingEdit {
                title,
                price,
                stock,
                category,
                image,
            };
            let listing = service.edit(&id, edit).await?;
            report("Updated", &listing);
        }
        ListingAction::Delete { id } => {
            let removed = service.delete(&id).await?;
            info!(%id, removed_products = removed, "Listing deleted");
        }
        ListingAction::Pause { id } => report("Paused", &service.toggle(&id, false).await?),
        ListingAction::Resume { id } => report("Resumed", &service.toggle(&id, true).await?),
    }
    Ok(())
}
