use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::edit_lock::EditLock;
use super::resource::Resource;
use super::UserId;
use crate::domain::errors::PersistenceError;

/// Upper bound of each matrix axis.
pub const MATRIX_MAX: f64 = 100.0;

/// Position of an idea card on the priority matrix.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MatrixPosition {
    pub x: f64,
    pub y: f64,
}

impl MatrixPosition {
    pub fn new(x: f64, y: f64) -> Result<Self, PersistenceError> {
        let position = Self { x, y };
        position.validate()?;
        Ok(position)
    }

    pub fn validate(&self) -> Result<(), PersistenceError> {
        let in_range = |v: f64| (0.0..=MATRIX_MAX).contains(&v);
        if in_range(self.x) && in_range(self.y) {
            Ok(())
        } else {
            Err(PersistenceError::InvalidPatch(format!(
                "position ({}, {}) outside 0..={MATRIX_MAX}",
                self.x, self.y
            )))
        }
    }
}

/// An idea card placed on a project's priority matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub id: Uuid,
    pub project_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(flatten)]
    pub position: MatrixPosition,
    pub created_by: UserId,
    #[serde(flatten)]
    pub edit_lock: EditLock,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Idea {
    pub fn new(
        project_id: Uuid,
        content: impl Into<String>,
        position: MatrixPosition,
        created_by: impl Into<UserId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            content: content.into(),
            details: None,
            position,
            created_by: created_by.into(),
            edit_lock: EditLock::Unlocked,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial idea update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdeaPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<MatrixPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_lock: Option<EditLock>,
}

impl IdeaPatch {
    /// Patch touching only the lock fields.
    pub fn lock(edit_lock: EditLock) -> Self {
        Self {
            edit_lock: Some(edit_lock),
            ..Default::default()
        }
    }
}

impl Resource for Idea {
    const COLLECTION: &'static str = "ideas";
    type Patch = IdeaPatch;

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn apply_patch(&mut self, patch: &IdeaPatch, now: DateTime<Utc>) -> Result<(), PersistenceError> {
        if let Some(content) = &patch.content {
            if content.trim().is_empty() {
                return Err(PersistenceError::InvalidPatch("content cannot be blank".to_string()));
            }
        }
        if let Some(position) = &patch.position {
            position.validate()?;
        }

        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(details) = &patch.details {
            self.details = Some(details.clone());
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(lock) = &patch.edit_lock {
            self.edit_lock = lock.clone();
        }
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Idea {
        Idea::new(
            Uuid::new_v4(),
            "Self-serve onboarding",
            MatrixPosition::new(20.0, 80.0).unwrap(),
            "userA",
        )
    }

    #[test]
    fn test_position_bounds() {
        assert!(MatrixPosition::new(0.0, 100.0).is_ok());
        assert!(MatrixPosition::new(-1.0, 50.0).is_err());
        assert!(MatrixPosition::new(50.0, 100.5).is_err());
    }

    #[test]
    fn test_patch_validation_is_all_or_nothing() {
        let mut idea = sample();
        let before = idea.clone();
        let patch = IdeaPatch {
            content: Some("Renamed".to_string()),
            position: Some(MatrixPosition { x: 500.0, y: 0.0 }),
            ..Default::default()
        };
        assert!(idea.apply_patch(&patch, Utc::now()).is_err());
        assert_eq!(idea, before);
    }

    #[test]
    fn test_lock_patch_only_touches_lock() {
        let mut idea = sample();
        let now = Utc::now();
        idea.apply_patch(&IdeaPatch::lock(EditLock::locked_by("userB", now)), now)
            .unwrap();
        assert_eq!(idea.content, "Self-serve onboarding");
        assert_eq!(idea.edit_lock.holder(), Some(&UserId::from("userB")));
    }

    #[test]
    fn test_json_shape_uses_flat_lock_fields() {
        let mut idea = sample();
        idea.edit_lock = EditLock::locked_by("userB", Utc::now());
        let value = serde_json::to_value(&idea).unwrap();
        assert_eq!(value["editing_by"], "userB");
        assert_eq!(value["x"], 20.0);

        let back: Idea = serde_json::from_value(value).unwrap();
        assert_eq!(back.edit_lock, idea.edit_lock);
    }
}
