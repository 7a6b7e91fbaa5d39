//! Seller listings and the storefront products derived from them.
//!
//! A listing and its storefront product are always written together: the sell
//! form creates both, edits patch both, and deletes remove both, each in a
//! single batch.

use chrono::Utc;
use thiserror::Error;

use recraft_core::{ListingId, Price};

use super::validation::ValidationErrors;
use crate::db::{ListingRepository, RepositoryError, UserProductRepository};
use crate::kv::{JsonStore, StoreError};
use crate::models::product::LISTED_QUALITY;
use crate::models::{Listing, Product};

/// Largest accepted product photo, in bytes.
pub const MAX_PHOTO_BYTES: u64 = 3 * 1024 * 1024;

/// Highest price, in whole rupees, a listing may ask.
pub const MAX_PRICE_RUPEES: u64 = 10_000_000;

const PRICE_TOO_HIGH: &str = "Price must be at most ₹1,00,00,000";

/// Photo formats the sell form accepts.
pub const ACCEPTED_PHOTO_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp"];

/// Errors from listing operations.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("invalid listing: {0}")]
    Validation(ValidationErrors),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<StoreError> for ListingError {
    fn from(err: StoreError) -> Self {
        Self::Repository(err.into())
    }
}

impl From<ValidationErrors> for ListingError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// A product photo attached to the sell form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPhoto {
    /// Where the photo is kept, e.g. `/uploads/<name>`.
    pub reference: String,
    pub content_type: String,
    pub size_bytes: u64,
}

/// Raw sell form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SellForm {
    pub product_name: String,
    pub shop_name: String,
    pub location: String,
    pub category: String,
    pub price: String,
    pub quantity: String,
    pub materials: String,
    pub description: String,
    pub photo: Option<ListingPhoto>,
    pub allow_returns: bool,
}

struct ValidSell {
    price: Price,
    rupees: u64,
    quantity: u32,
}

impl SellForm {
    fn validate(&self) -> Result<ValidSell, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let short = |s: &str, min: usize| s.trim().chars().count() < min;

        errors.check(short(&self.product_name, 2), "productName", "Name is too short");
        errors.check(short(&self.shop_name, 2), "shopName", "Shop name is too short");
        errors.check(short(&self.location, 2), "location", "Please enter a location");
        errors.check(short(&self.category, 1), "category", "Select a category");
        let price = Price::parse(&self.price).ok();
        errors.check(price.is_none(), "price", "Enter a valid price");
        let rupees = price.and_then(|p| whole_rupees(p).ok());
        errors.check(
            price.is_some() && rupees.is_none(),
            "price",
            PRICE_TOO_HIGH,
        );
        let quantity = self.quantity.trim().parse::<u32>().ok().filter(|q| *q >= 1);
        errors.check(quantity.is_none(), "quantity", "Enter a valid quantity");
        errors.check(
            short(&self.materials, 2),
            "materials",
            "Tell buyers what it's made of",
        );
        errors.check(
            short(&self.description, 10),
            "description",
            "Add a brief description",
        );
        match &self.photo {
            None => errors.add("productPhoto", "Please add a product photo"),
            Some(photo) => {
                errors.check(
                    !ACCEPTED_PHOTO_TYPES.contains(&photo.content_type.as_str()),
                    "productPhoto",
                    "Supported formats: PNG, JPG, WEBP",
                );
                errors.check(
                    photo.size_bytes > MAX_PHOTO_BYTES,
                    "productPhoto",
                    "Max size 3MB",
                );
            }
        }

        match (price, rupees, quantity) {
            (Some(price), Some(rupees), Some(quantity)) if errors.is_empty() => Ok(ValidSell {
                price,
                rupees,
                quantity,
            }),
            _ => Err(errors),
        }
    }
}

/// Changes to an existing listing. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingEdit {
    pub title: Option<String>,
    pub price: Option<u64>,
    pub stock: Option<u32>,
    pub category: Option<String>,
    /// New image for the storefront product.
    pub image: Option<String>,
}

/// Listing management that keeps storefront products in step.
pub struct ListingService<'a> {
    store: &'a JsonStore,
}

impl<'a> ListingService<'a> {
    /// Create a listing service over `store`.
    #[must_use]
    pub const fn new(store: &'a JsonStore) -> Self {
        Self { store }
    }

    /// Create a listing and its storefront product from the sell form.
    ///
    /// # Errors
    ///
    /// Returns `ListingError::Validation` with every failing field, or
    /// `ListingError::Repository` if the write fails.
    #[tracing::instrument(skip(self, form), fields(product_name = %form.product_name))]
    pub async fn create(&self, form: &SellForm) -> Result<(Listing, Product), ListingError> {
        let valid = form.validate()?;
        let listings = ListingRepository::new(self.store);
        let products = UserProductRepository::new(self.store);
        let mut batch = self.store.write().await;

        let listing = Listing {
            id: ListingId::generate(),
            title: form.product_name.trim().to_owned(),
            price: valid.rupees,
            stock: valid.quantity,
            active: true,
            category: Some(form.category.trim().to_owned()),
            created_at: Utc::now(),
        };
        let product = Product {
            id: products.next_id().await,
            name: listing.title.clone(),
            image: form
                .photo
                .as_ref()
                .map(|p| p.reference.clone())
                .unwrap_or_default(),
            price: valid.price.display(),
            quality: LISTED_QUALITY.to_owned(),
            location: form.location.trim().to_owned(),
            description: format!(
                "{}\n\nMaterials: {}",
                form.description.trim(),
                form.materials.trim()
            ),
            rating: 0.0,
            stock: valid.quantity,
            listing_id: Some(listing.id.clone()),
        };

        listings.stage_upsert(&mut batch, listing.clone()).await?;
        products.stage_link(&mut batch, product.clone()).await?;
        batch.commit().await?;

        tracing::info!(listing_id = %listing.id, product_id = %product.id, "listing created");
        Ok((listing, product))
    }

    /// Apply `edit` to a listing and patch every product linked to it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the listing does not exist and
    /// a `title` validation error for titles under two characters.
    #[tracing::instrument(skip(self, edit))]
    pub async fn edit(&self, id: &ListingId, edit: ListingEdit) -> Result<Listing, ListingError> {
        let listings = ListingRepository::new(self.store);
        let products = UserProductRepository::new(self.store);
        let mut batch = self.store.write().await;

        let mut listing = listings
            .get(id)
            .await
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        if let Some(title) = edit.title {
            let title = title.trim();
            if title.chars().count() < 2 {
                return Err(ValidationErrors::single("title", "Name is too short").into());
            }
            title.clone_into(&mut listing.title);
        }
        if let Some(price) = edit.price {
            if price > MAX_PRICE_RUPEES {
                return Err(ValidationErrors::single("price", PRICE_TOO_HIGH).into());
            }
            listing.price = price;
        }
        if let Some(stock) = edit.stock {
            listing.stock = stock;
        }
        if let Some(category) = edit.category {
            listing.category = Some(category);
        }

        listings.stage_upsert(&mut batch, listing.clone()).await?;
        let patched = products
            .stage_patch_for_listing(&mut batch, &listing, edit.image.as_deref())
            .await?;
        batch.commit().await?;

        tracing::info!(listing_id = %id, patched, "listing edited");
        Ok(listing)
    }

    /// Delete a listing and every product linked to it.
    ///
    /// Returns how many products were removed.
    ///
    /// # Errors
    ///
    /// Returns `ListingError::Repository` if the write fails.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &ListingId) -> Result<usize, ListingError> {
        let listings = ListingRepository::new(self.store);
        let products = UserProductRepository::new(self.store);

        let mut batch = self.store.write().await;
        listings.stage_delete(&mut batch, id).await?;
        let removed = products.stage_remove_by_listing_id(&mut batch, id).await?;
        batch.commit().await?;

        tracing::info!(listing_id = %id, removed, "listing deleted");
        Ok(removed)
    }

    /// Pause or resume a listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the listing does not exist.
    pub async fn toggle(&self, id: &ListingId, active: bool) -> Result<Listing, ListingError> {
        Ok(ListingRepository::new(self.store).toggle(id, active).await?)
    }
}

/// Round a price to whole rupees for a listing, rejecting prices above
/// [`MAX_PRICE_RUPEES`].
fn whole_rupees(price: Price) -> Result<u64, ValidationErrors> {
    price
        .to_whole_rupees()
        .filter(|rupees| *rupees <= MAX_PRICE_RUPEES)
        .ok_or_else(|| ValidationErrors::single("price", PRICE_TOO_HIGH))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use recraft_core::ProductId;

    use super::*;

    fn form() -> SellForm {
        SellForm {
            product_name: "Tyre Planter".to_owned(),
            shop_name: "Green Loop".to_owned(),
            location: "Pune".to_owned(),
            category: "Garden".to_owned(),
            price: "2500".to_owned(),
            quantity: "4".to_owned(),
            materials: "Old tyres".to_owned(),
            description: "A planter made from an old tyre.".to_owned(),
            photo: Some(ListingPhoto {
                reference: "/uploads/planter.jpg".to_owned(),
                content_type: "image/jpeg".to_owned(),
                size_bytes: 1024,
            }),
            allow_returns: true,
        }
    }

    #[test]
    fn test_sell_form_rules() {
        let mut bad = form();
        bad.product_name = "T".to_owned();
        bad.price = "-1".to_owned();
        bad.quantity = "0".to_owned();
        bad.description = "short".to_owned();
        bad.photo = Some(ListingPhoto {
            reference: "/uploads/a.gif".to_owned(),
            content_type: "image/gif".to_owned(),
            size_bytes: 10,
        });
        let errors = bad.validate().err().unwrap();
        for field in ["productName", "price", "quantity", "description", "productPhoto"] {
            assert!(errors.contains(field), "missing {field}");
        }
        assert_eq!(
            errors.get("productPhoto"),
            Some("Supported formats: PNG, JPG, WEBP")
        );

        let mut missing = form();
        missing.photo = None;
        assert_eq!(
            missing.validate().err().unwrap().get("productPhoto"),
            Some("Please add a product photo")
        );

        let mut large = form();
        if let Some(photo) = large.photo.as_mut() {
            photo.size_bytes = MAX_PHOTO_BYTES + 1;
        }
        assert_eq!(
            large.validate().err().unwrap().get("productPhoto"),
            Some("Max size 3MB")
        );
    }

    #[tokio::test]
    async fn test_create_writes_listing_and_product() {
        let store = JsonStore::memory();
        let service = ListingService::new(&store);
        let (listing, product) = service.create(&form()).await.unwrap();

        assert_eq!(listing.price, 2500);
        assert_eq!(listing.stock, 4);
        assert_eq!(product.id, ProductId::new(7));
        assert_eq!(product.price, "₹2,500");
        assert_eq!(product.quality, LISTED_QUALITY);
        assert_eq!(product.listing_id.as_ref(), Some(&listing.id));

        let products = UserProductRepository::new(&store);
        assert_eq!(products.all().await.len(), 1);
        assert_eq!(ListingRepository::new(&store).all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_oversized_price_is_rejected() {
        let store = JsonStore::memory();
        let service = ListingService::new(&store);

        let mut pricey = form();
        pricey.price = "79228162514264337593543950335".to_owned();
        let Err(ListingError::Validation(errors)) = service.create(&pricey).await else {
            panic!("oversized price was accepted");
        };
        assert_eq!(errors.get("price"), Some(PRICE_TOO_HIGH));
        assert!(ListingRepository::new(&store).all().await.is_empty());
        assert!(UserProductRepository::new(&store).all().await.is_empty());

        let mut top = form();
        top.price = MAX_PRICE_RUPEES.to_string();
        let (listing, product) = service.create(&top).await.unwrap();
        assert_eq!(listing.price, MAX_PRICE_RUPEES);
        assert_eq!(product.price, "₹1,00,00,000");

        let err = service
            .edit(
                &listing.id,
                ListingEdit {
                    price: Some(MAX_PRICE_RUPEES + 1),
                    ..ListingEdit::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ListingError::Validation(_)));
        assert_eq!(
            ListingRepository::new(&store).get(&listing.id).await.unwrap().price,
            MAX_PRICE_RUPEES
        );
    }

    #[tokio::test]
    async fn test_edit_patches_linked_product() {
        let store = JsonStore::memory();
        let service = ListingService::new(&store);
        let (listing, _) = service.create(&form()).await.unwrap();

        let edited = service
            .edit(
                &listing.id,
                ListingEdit {
                    title: Some("Big Tyre Planter".to_owned()),
                    price: Some(123_456),
                    stock: Some(2),
                    image: Some("/uploads/new.jpg".to_owned()),
                    ..ListingEdit::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.title, "Big Tyre Planter");

        let product = UserProductRepository::new(&store)
            .find_by_listing_id(&listing.id)
            .await
            .unwrap();
        assert_eq!(product.name, "Big Tyre Planter");
        assert_eq!(product.price, "₹1,23,456");
        assert_eq!(product.stock, 2);
        assert_eq!(product.image, "/uploads/new.jpg");
    }

    #[tokio::test]
    async fn test_edit_unknown_listing_is_not_found() {
        let store = JsonStore::memory();
        let err = ListingService::new(&store)
            .edit(&ListingId::new("missing"), ListingEdit::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ListingError::Repository(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_linked_products_only() {
        let store = JsonStore::memory();
        let service = ListingService::new(&store);
        let (doomed, _) = service.create(&form()).await.unwrap();
        let mut other = form();
        other.product_name = "Jute Bag".to_owned();
        let (kept, _) = service.create(&other).await.unwrap();

        let removed = service.delete(&doomed.id).await.unwrap();
        assert_eq!(removed, 1);

        let products = UserProductRepository::new(&store).all().await;
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].listing_id.as_ref(), Some(&kept.id));
        let listings = ListingRepository::new(&store).all().await;
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].id, kept.id);
    }

    #[tokio::test]
    async fn test_delete_notifies_after_both_writes() {
        let store = JsonStore::memory();
        let service = ListingService::new(&store);
        let (listing, _) = service.create(&form()).await.unwrap();

        let mut changes = store.subscribe();
        service.delete(&listing.id).await.unwrap();
        let mut keys = vec![
            changes.recv().await.unwrap().key,
            changes.recv().await.unwrap().key,
        ];
        keys.sort();
        assert_eq!(keys, ["rc_listings", "rc_user_products"]);
    }
}
