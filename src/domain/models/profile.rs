use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::resource::{FallbackHint, Resource};
use super::UserId;
use crate::domain::errors::PersistenceError;

/// Board-level role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileRole {
    #[default]
    User,
    Admin,
}

impl ProfileRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// User profile as stored in the `profiles` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub role: ProfileRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(id: impl Into<UserId>, email: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            email,
            full_name: None,
            avatar_url: None,
            role: ProfileRole::User,
            created_at: now,
            updated_at: now,
        }
    }

    /// Name to show in the UI: full name, else the email's local part.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.full_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        self.email
            .as_deref()
            .and_then(|e| e.split('@').next())
            .filter(|local| !local.is_empty())
            .map_or_else(|| self.id.to_string(), str::to_string)
    }
}

/// Partial profile update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Resource for Profile {
    const COLLECTION: &'static str = "profiles";
    type Patch = ProfilePatch;

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn apply_patch(&mut self, patch: &ProfilePatch, now: DateTime<Utc>) -> Result<(), PersistenceError> {
        if let Some(name) = &patch.full_name {
            if name.trim().is_empty() {
                return Err(PersistenceError::InvalidPatch("full_name cannot be blank".to_string()));
            }
            self.full_name = Some(name.clone());
        }
        if let Some(url) = &patch.avatar_url {
            self.avatar_url = Some(url.clone());
        }
        self.updated_at = now;
        Ok(())
    }

    fn from_fallback(id: &str, hint: &FallbackHint) -> Option<Self> {
        if hint.email.is_none() && hint.display_name.is_none() {
            return None;
        }
        let mut profile = Self::new(id, hint.email.clone());
        profile.full_name = hint.display_name.clone();
        Some(profile)
    }
}
