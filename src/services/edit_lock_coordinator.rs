//! Lease-based edit locks on ideas.
//!
//! Lock state lives on the idea record itself. Acquiring checks the caller's
//! current view of the record and then writes the lock fields; there is no
//! compare-and-set, so two clients that both see the idea unlocked can both
//! acquire it. The last write wins.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::domain::errors::PersistenceError;
use crate::domain::models::{
    default_lease, EditLock, Idea, IdeaPatch, LockBadge, LockConfig, LockLabel, Resource, UserId,
};
use crate::domain::ports::PersistenceStore;

/// Result of trying to take an edit lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired(EditLock),
    Refused { holder: UserId, since: DateTime<Utc> },
}

/// A lock as seen by one user at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockView {
    Unlocked,
    LockedBySelf,
    LockedByOther { holder: UserId, since: DateTime<Utc> },
}

/// Result of starting an edit session on an idea.
#[derive(Debug, Clone, PartialEq)]
pub enum EditAttempt {
    Started(Idea),
    Refused { holder: UserId, since: DateTime<Utc> },
}

#[derive(Debug, Clone, Copy)]
pub struct EditLockCoordinator {
    lease: Duration,
}

impl Default for EditLockCoordinator {
    fn default() -> Self {
        Self::new(default_lease())
    }
}

impl EditLockCoordinator {
    pub fn new(lease: Duration) -> Self {
        Self { lease }
    }

    pub fn from_config(config: &LockConfig) -> Self {
        Self::new(config.lease())
    }

    pub fn lease(&self) -> Duration {
        self.lease
    }

    /// Held by someone other than `user` and still inside the lease.
    pub fn is_locked_by_other(&self, lock: &EditLock, user: &UserId, now: DateTime<Utc>) -> bool {
        match lock {
            EditLock::LockedBy { user: holder, .. } => {
                holder != user && lock.is_active(now, self.lease)
            }
            EditLock::Unlocked => false,
        }
    }

    /// Held by `user`. The lease is not consulted.
    pub fn is_locked_by_self(&self, lock: &EditLock, user: &UserId) -> bool {
        lock.holder() == Some(user)
    }

    pub fn acquire(&self, lock: &EditLock, user: &UserId, now: DateTime<Utc>) -> AcquireOutcome {
        match self.view(lock, user, now) {
            LockView::LockedByOther { holder, since } => AcquireOutcome::Refused { holder, since },
            LockView::Unlocked | LockView::LockedBySelf => {
                AcquireOutcome::Acquired(EditLock::locked_by(user.clone(), now))
            }
        }
    }

    /// `Unlocked` when `user` holds the lock, otherwise the lock unchanged.
    pub fn release(&self, lock: &EditLock, user: &UserId) -> EditLock {
        if self.is_locked_by_self(lock, user) {
            EditLock::Unlocked
        } else {
            lock.clone()
        }
    }

    pub fn view(&self, lock: &EditLock, user: &UserId, now: DateTime<Utc>) -> LockView {
        match lock {
            EditLock::LockedBy { user: holder, .. } if holder == user => LockView::LockedBySelf,
            EditLock::LockedBy { user: holder, at } if lock.is_active(now, self.lease) => {
                LockView::LockedByOther {
                    holder: holder.clone(),
                    since: *at,
                }
            }
            _ => LockView::Unlocked,
        }
    }

    pub fn badge(&self, lock: &EditLock, user: &UserId, now: DateTime<Utc>) -> LockBadge {
        match self.view(lock, user, now) {
            LockView::LockedByOther { .. } => LockBadge {
                label: Some(LockLabel::Active),
                disabled: true,
            },
            LockView::LockedBySelf => LockBadge {
                label: Some(LockLabel::Editing),
                disabled: false,
            },
            LockView::Unlocked => LockBadge::default(),
        }
    }

    /// Take the edit lock on `idea` for `user` and persist it.
    ///
    /// The decision is made on `idea` as the caller last saw it. A refusal
    /// performs no write.
    pub async fn begin_edit(
        &self,
        store: &dyn PersistenceStore<Idea>,
        idea: &Idea,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<EditAttempt, PersistenceError> {
        match self.acquire(&idea.edit_lock, user, now) {
            AcquireOutcome::Refused { holder, since } => {
                debug!(idea = %idea.id, %holder, "Edit refused, idea locked by another user");
                Ok(EditAttempt::Refused { holder, since })
            }
            AcquireOutcome::Acquired(lock) => {
                let updated = store.update(&idea.id(), &IdeaPatch::lock(lock)).await?;
                info!(idea = %idea.id, %user, "Edit lock acquired");
                Ok(EditAttempt::Started(updated))
            }
        }
    }

    /// Clear the edit lock on `idea` if `user` holds it. Returns the updated
    /// idea, or `None` when nothing was written.
    pub async fn end_edit(
        &self,
        store: &dyn PersistenceStore<Idea>,
        idea: &Idea,
        user: &UserId,
    ) -> Result<Option<Idea>, PersistenceError> {
        if !self.is_locked_by_self(&idea.edit_lock, user) {
            debug!(idea = %idea.id, %user, "Not the lock holder, nothing to release");
            return Ok(None);
        }
        let released = self.release(&idea.edit_lock, user);
        let updated = store.update(&idea.id(), &IdeaPatch::lock(released)).await?;
        info!(idea = %idea.id, %user, "Edit lock released");
        Ok(Some(updated))
    }
}
