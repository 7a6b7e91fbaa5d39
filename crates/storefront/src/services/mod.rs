//! Business logic services for the marketplace.
//!
//! Services sit on top of the repositories in [`crate::db`] and own every
//! operation that touches more than one collection, committing those writes
//! as a single batch.
//!
//! # Services
//!
//! - `auth` - Registration, login and profile changes
//! - `session` - The signed-in user of a data directory
//! - `listings` - Seller listings and their storefront products
//! - `checkout` - Cart totals, coupons and order placement
//! - `donation` - Waste donation intake
//! - `serviceability` - Pickup serviceability lookups (local rule or remote)
//! - `uploads` - Uploaded file storage
//! - `validation` - Field-scoped form errors

pub mod auth;
pub mod checkout;
pub mod donation;
pub mod listings;
pub mod serviceability;
pub mod session;
pub mod uploads;
pub mod validation;

pub use auth::{AuthError, AuthService, ProfilePatch, Registration};
pub use checkout::{CartTotals, CheckoutError, CheckoutForm, CheckoutService, Coupon};
pub use donation::{DonationForm, DonationImage, IntakeError, IntakeState, IntakeWorkflow, PinStatus};
pub use listings::{ListingEdit, ListingError, ListingPhoto, ListingService, SellForm};
pub use serviceability::{ServiceabilityChecker, ServiceabilityError};
pub use session::SessionContext;
pub use uploads::{UploadError, UploadStore};
pub use validation::ValidationErrors;
