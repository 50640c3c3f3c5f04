//! Profile repository.

use sqlx::PgPool;

use shanghuyun_core::UserId;

use super::RepositoryError;
use crate::models::user::Profile;

/// Fields written by a profile update. `None` leaves a column unchanged.
#[derive(Debug, Default, Clone)]
pub struct ProfileUpdate {
    pub real_name: Option<String>,
    pub nickname: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    /// `Some(None)` clears the portrait.
    pub portrait: Option<Option<String>>,
}

/// Repository for profile database operations.
pub struct ProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetch a user's profile, creating an empty one if it is missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<Profile, RepositoryError> {
        sqlx::query(
            "INSERT INTO marketplace.profile (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;

        let profile = sqlx::query_as::<_, Profile>(
            r"
            SELECT user_id, real_name, nickname, portrait, address, phone, updated_at
            FROM marketplace.profile
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(profile)
    }

    /// Apply an update and return the new profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> Result<Profile, RepositoryError> {
        let (set_portrait, portrait) = match &update.portrait {
            Some(p) => (true, p.clone()),
            None => (false, None),
        };

        sqlx::query_as::<_, Profile>(
            r"
            UPDATE marketplace.profile SET
                real_name = COALESCE($2, real_name),
                nickname  = COALESCE($3, nickname),
                address   = COALESCE($4, address),
                phone     = COALESCE($5, phone),
                portrait  = CASE WHEN $6 THEN $7 ELSE portrait END,
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING user_id, real_name, nickname, portrait, address, phone, updated_at
            ",
        )
        .bind(user_id)
        .bind(update.real_name.as_deref())
        .bind(update.nickname.as_deref())
        .bind(update.address.as_deref())
        .bind(update.phone.as_deref())
        .bind(set_portrait)
        .bind(portrait)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
