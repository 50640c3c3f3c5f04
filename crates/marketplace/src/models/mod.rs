//! Domain models for the marketplace.
//!
//! Row types double as domain types where no validation is needed on
//! load; accounts go through a row type so the email is re-validated.

pub mod cart;
pub mod catalog;
pub mod news;
pub mod order;
pub mod page;
pub mod pagination;
pub mod session;
pub mod settings;
pub mod user;

pub use cart::{Cart, CartItem, CartLine, CartTotals};
pub use catalog::{Product, Vendor, VendorCard, VendorCategory};
pub use news::{NewsAuthor, NewsCategory, NewsPost, NewsTag};
pub use order::{Order, OrderCounts, OrderDetail, OrderItem};
pub use page::HomePage;
pub use pagination::{PagerView, Paginated};
pub use session::{CurrentUser, keys as session_keys};
pub use settings::{LegalSetting, SiteBasicSetting, SocialLink};
pub use user::{Profile, User};
