//! Lease-based edit lock stored on the edited entity itself.
//!
//! On the wire and in storage the lock is two nullable fields,
//! `editing_by` and `editing_at`. In memory it is a tagged state so the
//! "owner without timestamp" combination cannot be represented.
//!
//! ```text
//! Unlocked ── acquire ──→ LockedBy(user, at) ── release (owner) ──→ Unlocked
//!                                │
//!                   lease elapsed, seen by a reader: reinterpreted as free
//! ```
//!
//! Nothing renews the lease while an edit is open, so a long edit can be
//! taken over once the lease has elapsed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;
use crate::domain::errors::EditLockError;

/// Default lease for an edit lock, in milliseconds.
pub const DEFAULT_LEASE_MS: u64 = 5 * 60 * 1000;

/// Default lease for an edit lock.
pub fn default_lease() -> Duration {
    Duration::milliseconds(DEFAULT_LEASE_MS as i64)
}

/// Edit lock state of a single entity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "EditLockFields", into = "EditLockFields")]
pub enum EditLock {
    #[default]
    Unlocked,
    LockedBy { user: UserId, at: DateTime<Utc> },
}

impl EditLock {
    pub fn locked_by(user: impl Into<UserId>, at: DateTime<Utc>) -> Self {
        Self::LockedBy {
            user: user.into(),
            at,
        }
    }

    /// The recorded holder, regardless of lease age.
    pub fn holder(&self) -> Option<&UserId> {
        match self {
            Self::Unlocked => None,
            Self::LockedBy { user, .. } => Some(user),
        }
    }

    pub fn acquired_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Unlocked => None,
            Self::LockedBy { at, .. } => Some(*at),
        }
    }

    /// True when the lease has elapsed (or there is no lock at all).
    pub fn is_expired(&self, now: DateTime<Utc>, lease: Duration) -> bool {
        match self {
            Self::Unlocked => true,
            Self::LockedBy { at, .. } => now - *at >= lease,
        }
    }

    /// Locked and still inside the lease.
    pub fn is_active(&self, now: DateTime<Utc>, lease: Duration) -> bool {
        !self.is_expired(now, lease)
    }

    /// Build from the raw record fields.
    pub fn from_fields(
        editing_by: Option<UserId>,
        editing_at: Option<DateTime<Utc>>,
    ) -> Result<Self, EditLockError> {
        match (editing_by, editing_at) {
            (None, _) => Ok(Self::Unlocked),
            (Some(user), Some(at)) => Ok(Self::LockedBy { user, at }),
            (Some(user), None) => Err(EditLockError::MissingTimestamp { user }),
        }
    }

    /// Split into the raw record fields.
    pub fn into_fields(self) -> (Option<UserId>, Option<DateTime<Utc>>) {
        match self {
            Self::Unlocked => (None, None),
            Self::LockedBy { user, at } => (Some(user), Some(at)),
        }
    }
}

/// Record-level representation of [`EditLock`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditLockFields {
    #[serde(default)]
    pub editing_by: Option<UserId>,
    #[serde(default)]
    pub editing_at: Option<DateTime<Utc>>,
}

impl TryFrom<EditLockFields> for EditLock {
    type Error = EditLockError;

    fn try_from(fields: EditLockFields) -> Result<Self, Self::Error> {
        Self::from_fields(fields.editing_by, fields.editing_at)
    }
}

impl From<EditLock> for EditLockFields {
    fn from(lock: EditLock) -> Self {
        let (editing_by, editing_at) = lock.into_fields();
        Self {
            editing_by,
            editing_at,
        }
    }
}

/// Label shown on an idea card for its lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockLabel {
    /// Someone else is editing.
    Active,
    /// The current user is editing.
    Editing,
}

impl LockLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Editing => "Editing",
        }
    }
}

/// Presentation tuple consumed by the UI to render badges and gate edit controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LockBadge {
    pub label: Option<LockLabel>,
    pub disabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(minute: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap() + Duration::minutes(minute)
    }

    #[test]
    fn test_expiry_is_strict_at_lease_boundary() {
        let lock = EditLock::locked_by("userA", at(0));
        assert!(lock.is_active(at(4), default_lease()));
        assert!(lock.is_expired(at(5), default_lease()));
        assert!(lock.is_expired(at(6), default_lease()));
    }

    #[test]
    fn test_from_fields_rejects_owner_without_timestamp() {
        let result = EditLock::from_fields(Some(UserId::from("userA")), None);
        assert_eq!(
            result,
            Err(EditLockError::MissingTimestamp {
                user: UserId::from("userA")
            })
        );
    }

    #[test]
    fn test_from_fields_ignores_stray_timestamp() {
        let lock = EditLock::from_fields(None, Some(at(0))).unwrap();
        assert_eq!(lock, EditLock::Unlocked);
    }

    #[test]
    fn test_serializes_as_record_fields() {
        let lock = EditLock::locked_by("userA", at(0));
        let value = serde_json::to_value(&lock).unwrap();
        assert_eq!(value["editing_by"], "userA");
        assert!(value["editing_at"].is_string());

        let unlocked = serde_json::to_value(EditLock::Unlocked).unwrap();
        assert!(unlocked["editing_by"].is_null());
        assert!(unlocked["editing_at"].is_null());
    }

    #[test]
    fn test_deserialize_invalid_fields_fails() {
        let json = serde_json::json!({ "editing_by": "userA", "editing_at": null });
        assert!(serde_json::from_value::<EditLock>(json).is_err());
    }

    #[test]
    fn test_label_strings() {
        assert_eq!(LockLabel::Active.as_str(), "Active");
        assert_eq!(LockLabel::Editing.as_str(), "Editing");
    }
}
