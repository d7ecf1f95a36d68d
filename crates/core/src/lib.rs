//! Storefront Cart Core - Cart state types.
//!
//! This crate provides the types shared by the cart widget and its host:
//! - `storefront` - Widget library (store, view, controller) and page host
//! - `integration-tests` - End-to-end scenarios
//!
//! # Architecture
//!
//! The core crate contains only types and pure state transitions - no I/O,
//! no storage access, no rendering. Persistence and presentation live in the
//! `storefront` crate.
//!
//! # Modules
//!
//! - [`types`] - Line item IDs, prices, product descriptors and the cart state

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
