//! ReCraft Core - Shared types library.
//!
//! This crate provides common types used across all ReCraft components:
//! - `storefront` - Marketplace state stores and the REST API server
//! - `cli` - Command-line client driving the local stores
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no storage,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for identifiers, prices, emails, postal codes
//!   and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
