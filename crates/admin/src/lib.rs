//! Packhouse back-office library.
//!
//! Mirrors Shopify orders into the shop database and exposes the sync over
//! an authenticated admin API. Shared by the `packhouse-admin` server binary
//! and the `pkh` CLI.
//!
//! # Security
//!
//! This crate contains HIGH PRIVILEGE access:
//! - Shopify Admin API (read access to every order and customer)
//! - Admin user management
//!
//! Only deploy on private infrastructure.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod shopify;
pub mod state;
pub mod sync;
