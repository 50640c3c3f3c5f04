//! Business logic services for the marketplace.
//!
//! # Services
//!
//! - `auth` - Email/password accounts (argon2)
//! - `cart` - Session cart and merging it into the database cart
//! - `media` - Uploaded image storage
//! - `orders` - Order request parsing and stock planning
//! - `payment` - ECPay checkout parameters and `CheckMacValue`
//! - `sanitize` - Tag stripping for profile text
//! - `settings` - Cached site settings
//! - `slug` - URL slugs for taxonomy and posts

pub mod auth;
pub mod cart;
pub mod media;
pub mod orders;
pub mod payment;
pub mod sanitize;
pub mod settings;
pub mod slug;
