//! Headless Kit storefront library.
//!
//! Cart state management, product variant selection, a drop countdown and
//! newsletter sign-up on top of the Shopify Storefront API.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod drop_timer;
pub mod error;
pub mod newsletter;
pub mod product;
pub mod shopify;
