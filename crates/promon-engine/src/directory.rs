//! User directory: read-only role and assignment lookups
//!
//! The engine never owns users. Projects carry their implementing
//! office and field unit by reference; the directory answers whether a
//! referenced user is still active, who sits in the secretariat pool,
//! and who receives completion broadcasts. Production deployments back
//! this with the real user store.

use async_trait::async_trait;
use dashmap::DashMap;
use promon_types::{Result, UserId};

/// Trait for user-directory backends.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Whether the referenced user exists and is active.
    async fn is_active(&self, user: &UserId) -> Result<bool>;

    /// The oversight reviewers who receive compiled submissions.
    async fn secretariat_pool(&self) -> Result<Vec<UserId>>;

    /// Everyone notified when a project completes (executive viewers
    /// and monitoring staff, beyond the project's own parties).
    async fn broadcast_pool(&self) -> Result<Vec<UserId>>;
}

/// In-memory directory for tests and embedded use
#[derive(Default)]
pub struct StaticDirectory {
    active: DashMap<UserId, bool>,
    secretariat: Vec<UserId>,
    broadcast: Vec<UserId>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an active user.
    pub fn with_user(self, user: UserId) -> Self {
        self.active.insert(user, true);
        self
    }

    /// Register a deactivated user (kept for reference integrity).
    pub fn with_inactive_user(self, user: UserId) -> Self {
        self.active.insert(user, false);
        self
    }

    pub fn with_secretariat(mut self, user: UserId) -> Self {
        self.active.insert(user.clone(), true);
        self.secretariat.push(user);
        self
    }

    pub fn with_broadcast_member(mut self, user: UserId) -> Self {
        self.active.insert(user.clone(), true);
        self.broadcast.push(user);
        self
    }
}

#[async_trait]
impl UserDirectory for StaticDirectory {
    async fn is_active(&self, user: &UserId) -> Result<bool> {
        Ok(self.active.get(user).map(|a| *a).unwrap_or(false))
    }

    async fn secretariat_pool(&self) -> Result<Vec<UserId>> {
        Ok(self.secretariat.clone())
    }

    async fn broadcast_pool(&self) -> Result<Vec<UserId>> {
        Ok(self.broadcast.clone())
    }
}
