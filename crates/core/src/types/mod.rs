//! Core types for ReCraft.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod pincode;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use pincode::{Pincode, PincodeError, Serviceability, classify};
pub use price::{Price, PriceError};
pub use status::*;
