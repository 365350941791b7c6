//! SQLite implementation of `PersistenceStore<Profile>`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::parse_datetime;
use crate::domain::errors::PersistenceError;
use crate::domain::models::{Profile, ProfilePatch, ProfileRole, Resource, UserId};
use crate::domain::ports::PersistenceStore;

const SELECT_PROFILE: &str =
    "SELECT id, email, full_name, avatar_url, role, created_at, updated_at FROM profiles WHERE id = ?";

#[derive(Clone)]
pub struct SqliteProfileStore {
    pool: SqlitePool,
}

impl SqliteProfileStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new profile, or overwrite an existing one with the same id.
    pub async fn upsert(&self, profile: &Profile) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"INSERT INTO profiles (id, email, full_name, avatar_url, role, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                 email = excluded.email, full_name = excluded.full_name,
                 avatar_url = excluded.avatar_url, role = excluded.role,
                 updated_at = excluded.updated_at"#,
        )
        .bind(profile.id.as_str())
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(&profile.avatar_url)
        .bind(profile.role.as_str())
        .bind(profile.created_at.to_rfc3339())
        .bind(profile.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl PersistenceStore<Profile> for SqliteProfileStore {
    async fn get(&self, id: &str) -> Result<Option<Profile>, PersistenceError> {
        let row: Option<ProfileRow> = sqlx::query_as(SELECT_PROFILE)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Profile::try_from).transpose()
    }

    async fn update(&self, id: &str, patch: &ProfilePatch) -> Result<Profile, PersistenceError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<ProfileRow> = sqlx::query_as(SELECT_PROFILE)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let mut profile = row
            .map(Profile::try_from)
            .transpose()?
            .ok_or_else(|| PersistenceError::NotFound {
                collection: Profile::COLLECTION,
                id: id.to_string(),
            })?;

        profile.apply_patch(patch, Utc::now())?;

        sqlx::query("UPDATE profiles SET full_name = ?, avatar_url = ?, updated_at = ? WHERE id = ?")
            .bind(&profile.full_name)
            .bind(&profile.avatar_url)
            .bind(profile.updated_at.to_rfc3339())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(profile)
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: String,
    email: Option<String>,
    full_name: Option<String>,
    avatar_url: Option<String>,
    role: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = PersistenceError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let role = ProfileRole::from_db_str(&row.role)
            .ok_or_else(|| PersistenceError::Serialization(format!("Invalid role: {}", row.role)))?;

        Ok(Profile {
            id: UserId::new(row.id),
            email: row.email,
            full_name: row.full_name,
            avatar_url: row.avatar_url,
            role,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}
