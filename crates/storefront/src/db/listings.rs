//! Seller listing repository.

use recraft_core::ListingId;

use super::{RepositoryError, Snapshot, commit};
use crate::kv::{Batch, JsonStore, keys};
use crate::models::Listing;

/// Which listings a search returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl ListingFilter {
    const fn admits(self, listing: &Listing) -> bool {
        match self {
            Self::All => true,
            Self::Active => listing.active,
            Self::Inactive => !listing.active,
        }
    }
}

/// Repository for seller listings.
///
/// Newest listings come first.
pub struct ListingRepository<'a> {
    store: &'a JsonStore,
}

impl<'a> ListingRepository<'a> {
    /// Create a new listing repository.
    #[must_use]
    pub const fn new(store: &'a JsonStore) -> Self {
        Self { store }
    }

    /// All listings.
    pub async fn all(&self) -> Vec<Listing> {
        self.store.load(keys::LISTINGS).await
    }

    /// Get a listing by ID.
    pub async fn get(&self, id: &ListingId) -> Option<Listing> {
        self.all().await.into_iter().find(|l| &l.id == id)
    }

    /// Listings whose title or id contains `query`, narrowed by `filter`.
    pub async fn search(&self, query: &str, filter: ListingFilter) -> Vec<Listing> {
        self.all()
            .await
            .into_iter()
            .filter(|l| filter.admits(l) && l.matches(query))
            .collect()
    }

    /// Replace the listing with the same id, or insert it at the front.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if the write fails.
    pub async fn upsert(&self, listing: Listing) -> Result<(), RepositoryError> {
        let mut batch = self.store.write().await;
        self.stage_upsert(&mut batch, listing).await?;
        commit(batch).await
    }

    /// Stage an upsert into `batch`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if serialization fails.
    pub async fn stage_upsert(
        &self,
        batch: &mut Batch<'_>,
        listing: Listing,
    ) -> Result<(), RepositoryError> {
        let mut snapshot = Snapshot::<Listing>::read(self.store, keys::LISTINGS).await;
        if let Some(slot) = snapshot.items.iter_mut().find(|l| l.id == listing.id) {
            *slot = listing;
        } else {
            snapshot.items.insert(0, listing);
        }
        snapshot.stage(batch)
    }

    /// Delete a listing. Deleting an unknown id is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if the write fails.
    pub async fn delete(&self, id: &ListingId) -> Result<(), RepositoryError> {
        let mut batch = self.store.write().await;
        self.stage_delete(&mut batch, id).await?;
        commit(batch).await
    }

    /// Stage a delete into `batch`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if serialization fails.
    pub async fn stage_delete(
        &self,
        batch: &mut Batch<'_>,
        id: &ListingId,
    ) -> Result<(), RepositoryError> {
        let mut snapshot = Snapshot::<Listing>::read(self.store, keys::LISTINGS).await;
        snapshot.items.retain(|l| &l.id != id);
        snapshot.stage(batch)
    }

    /// Set the active flag on a listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the listing does not exist.
    pub async fn toggle(&self, id: &ListingId, active: bool) -> Result<Listing, RepositoryError> {
        let mut batch = self.store.write().await;
        let mut snapshot = Snapshot::<Listing>::read(self.store, keys::LISTINGS).await;
        let slot = snapshot
            .items
            .iter_mut()
            .find(|l| &l.id == id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        slot.active = active;
        let updated = slot.clone();

        snapshot.stage(&mut batch)?;
        commit(batch).await?;
        tracing::info!(listing_id = %id, active, "listing toggled");
        Ok(updated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn listing(title: &str) -> Listing {
        Listing {
            id: ListingId::generate(),
            title: title.to_owned(),
            price: 500,
            stock: 3,
            active: true,
            category: Some("Decor".to_owned()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_prepends_new_and_replaces_existing() {
        let store = JsonStore::memory();
        let repo = ListingRepository::new(&store);
        let first = listing("Jute Bag");
        let second = listing("Tyre Planter");
        repo.upsert(first.clone()).await.unwrap();
        repo.upsert(second.clone()).await.unwrap();

        let all = repo.all().await;
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);

        let mut edited = first.clone();
        edited.price = 650;
        repo.upsert(edited).await.unwrap();
        let all = repo.all().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].price, 650);
    }

    #[tokio::test]
    async fn test_toggle_and_filtered_search() {
        let store = JsonStore::memory();
        let repo = ListingRepository::new(&store);
        let bag = listing("Jute Bag");
        repo.upsert(bag.clone()).await.unwrap();
        repo.upsert(listing("Tyre Planter")).await.unwrap();

        let paused = repo.toggle(&bag.id, false).await.unwrap();
        assert!(!paused.active);

        assert_eq!(repo.search("", ListingFilter::Inactive).await.len(), 1);
        assert_eq!(repo.search("", ListingFilter::Active).await.len(), 1);
        assert_eq!(repo.search("jute", ListingFilter::All).await[0].id, bag.id);
        assert!(repo.search("jute", ListingFilter::Active).await.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_unknown_is_not_found() {
        let store = JsonStore::memory();
        let repo = ListingRepository::new(&store);
        let err = repo.toggle(&ListingId::new("nope"), true).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }
}
