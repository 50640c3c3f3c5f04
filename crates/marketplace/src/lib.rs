//! Shanghuyun marketplace library.
//!
//! The server binary and the integration tests share this crate: catalog
//! and vendor pages, carts, orders, ECPay payments, news and site content.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
