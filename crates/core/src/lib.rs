//! Shanghuyun Core - Shared domain types.
//!
//! This crate provides the types shared by every Shanghuyun component:
//! - `marketplace` - Public marketplace site, cart, orders and payment webhooks
//! - `cli` - Command-line tools for migrations, seeding and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, order and stock statuses, money helpers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
