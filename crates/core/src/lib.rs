//! Packhouse Core - Shared types library.
//!
//! This crate provides common types used across all Packhouse components:
//! - `admin` - Back office and the Shopify order sync pipeline
//! - `cli` - Command-line tools for migrations, admin users and manual syncs
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
