//! Storage contracts
//!
//! The services only ever see these traits. Two backends implement them:
//! [`memory::MemoryStore`] (dev mode and tests) and the MongoDB stores in
//! [`crate::db::stores`].
//!
//! Each method is a single store operation. Nothing here spans two
//! collections, so callers must tolerate a failure between, say, an incident
//! write and the notification that follows it.

pub mod memory;

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::model::{Incident, IncidentChanges, IncidentFilter, Notification, Role, User};
use crate::types::Result;

pub use memory::MemoryStore;

/// Fresh record identifier. ObjectId hex in both backends so ids look the
/// same whichever one is running.
pub fn new_id() -> String {
    bson::oid::ObjectId::new().to_hex()
}

// =============================================================================
// Identity Directory
// =============================================================================

#[async_trait::async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>>;

    /// `email` must already be lower-cased
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn count_users(&self) -> Result<u64>;

    /// Store a new user. Fails with `Conflict` if the email is taken.
    async fn insert_user(&self, user: &User) -> Result<String>;

    /// All users, oldest first
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Change a user's role; `None` if no such user
    async fn set_role(&self, id: &str, role: Role, at: DateTime<Utc>) -> Result<Option<User>>;
}

// =============================================================================
// Incident Store
// =============================================================================

#[async_trait::async_trait]
pub trait IncidentStore: Send + Sync {
    async fn insert(&self, incident: &Incident) -> Result<String>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Incident>>;

    /// All incidents, newest first
    async fn find_all(&self) -> Result<Vec<Incident>>;

    /// Apply changes and stamp `updated_at`. `false` if no such incident.
    async fn update(&self, id: &str, changes: &IncidentChanges, at: DateTime<Utc>) -> Result<bool>;

    /// Hard delete. `false` if no such incident.
    async fn delete(&self, id: &str) -> Result<bool>;

    async fn count(&self, filter: IncidentFilter) -> Result<u64>;

    /// Give every unowned incident whose reporter email equals `email` to
    /// `owner`, in one bulk write. Returns the number of records changed.
    async fn link_anonymous(&self, email: &str, owner: &str, at: DateTime<Utc>) -> Result<u64>;
}

// =============================================================================
// Notification Sink
// =============================================================================

#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn insert(&self, notification: &Notification) -> Result<String>;

    /// A user's notifications, newest first
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Notification>>;

    async fn count_unread(&self, user_id: &str) -> Result<u64>;

    /// Mark one notification read if it belongs to `user_id`
    async fn mark_read(&self, id: &str, user_id: &str) -> Result<bool>;

    /// Returns how many were unread
    async fn mark_all_read(&self, user_id: &str) -> Result<u64>;
}

/// The three stores, handed to services at construction
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn IdentityDirectory>,
    pub incidents: Arc<dyn IncidentStore>,
    pub notifications: Arc<dyn NotificationSink>,
}

impl Stores {
    /// All three backed by one shared in-memory store
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            incidents: store.clone(),
            notifications: store,
        }
    }
}
