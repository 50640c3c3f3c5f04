//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use shanghuyun_core::{Email, UserId};

/// A marketplace account.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Inactive users cannot sign in.
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    /// When the user signed up.
    pub date_joined: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Personal details shown on the profile page.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Profile {
    pub user_id: UserId,
    pub real_name: String,
    pub nickname: String,
    /// Media path of the portrait image.
    pub portrait: Option<String>,
    pub address: String,
    pub phone: String,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Name to greet the user with.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if !self.nickname.is_empty() {
            &self.nickname
        } else if !self.real_name.is_empty() {
            &self.real_name
        } else {
            ""
        }
    }
}

/// Field limits enforced on profile updates.
pub mod limits {
    pub const REAL_NAME: usize = 20;
    pub const NICKNAME: usize = 20;
    pub const ADDRESS: usize = 255;
    pub const PHONE: usize = 20;
}
