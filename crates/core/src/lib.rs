//! Headless Kit Core - Shared types library.
//!
//! This crate provides the types shared by the Headless Kit components:
//! - `storefront` - Cart controller, variant resolver and Shopify client
//! - `cli` - Command-line binding over the storefront library
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no async.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for Shopify global IDs, prices and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
