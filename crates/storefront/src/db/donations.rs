//! Donation repository.

use recraft_core::DonationId;

use super::{RepositoryError, Snapshot, commit};
use crate::kv::{Batch, JsonStore, keys};
use crate::models::Donation;

/// Attempts at finding a free donation id before giving up.
const MAX_ID_ATTEMPTS: usize = 16;

/// Repository for donation records.
pub struct DonationRepository<'a> {
    store: &'a JsonStore,
}

impl<'a> DonationRepository<'a> {
    /// Create a new donation repository.
    #[must_use]
    pub const fn new(store: &'a JsonStore) -> Self {
        Self { store }
    }

    /// All donations, newest first.
    pub async fn all(&self) -> Vec<Donation> {
        let mut donations: Vec<Donation> = self.store.load(keys::DONATIONS).await;
        donations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        donations
    }

    /// Get a donation by id.
    pub async fn get(&self, id: &DonationId) -> Option<Donation> {
        self.store
            .load::<Donation>(keys::DONATIONS)
            .await
            .into_iter()
            .find(|d| &d.id == id)
    }

    /// Record a donation.
    ///
    /// If the id is already taken a fresh one is generated. Returns the
    /// donation as stored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if no free id could be found.
    /// Returns `RepositoryError::Storage` if the write fails.
    pub async fn insert(&self, donation: Donation) -> Result<Donation, RepositoryError> {
        let mut batch = self.store.write().await;
        let donation = self.stage_insert(&mut batch, donation).await?;
        commit(batch).await?;
        Ok(donation)
    }

    /// Stage a donation into `batch`, regenerating its id on collision.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if no free id could be found.
    pub async fn stage_insert(
        &self,
        batch: &mut Batch<'_>,
        mut donation: Donation,
    ) -> Result<Donation, RepositoryError> {
        let mut snapshot = Snapshot::<Donation>::read(self.store, keys::DONATIONS).await;

        let mut attempts = 0;
        while snapshot.items.iter().any(|d| d.id == donation.id) {
            attempts += 1;
            if attempts > MAX_ID_ATTEMPTS {
                return Err(RepositoryError::Conflict(
                    "could not allocate a donation id".to_owned(),
                ));
            }
            donation.id = DonationId::generate();
        }

        snapshot.items.push(donation.clone());
        snapshot.stage(batch)?;
        Ok(donation)
    }

    /// The most recent donation submitted through the intake workflow.
    pub async fn last(&self) -> Option<Donation> {
        self.store.load_value(keys::LAST_DONATION).await
    }

    /// Remember `donation` as the most recent submission.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if the write fails.
    pub async fn set_last(&self, donation: &Donation) -> Result<(), RepositoryError> {
        let mut batch = self.store.batch();
        Self::stage_set_last(&mut batch, donation)?;
        commit(batch).await
    }

    /// Stage remembering `donation` as the most recent submission.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if serialization fails.
    pub fn stage_set_last(batch: &mut Batch<'_>, donation: &Donation) -> Result<(), RepositoryError> {
        batch.put_value(keys::LAST_DONATION, donation)?;
        Ok(())
    }
}
