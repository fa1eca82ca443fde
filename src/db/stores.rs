//! MongoDB-backed stores

use bson::{doc, DateTime, Document};
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use crate::db::mongo::{parse_oid, MongoClient, MongoCollection};
use crate::db::schemas::{
    changes_to_set, IncidentDoc, NotificationDoc, UserDoc, INCIDENT_COLLECTION,
    NOTIFICATION_COLLECTION, USER_COLLECTION,
};
use crate::model::{Incident, IncidentChanges, IncidentFilter, Notification, Role, User};
use crate::store::{IdentityDirectory, IncidentStore, NotificationSink, Stores};
use crate::types::{ReporterError, Result};

fn id_filter(id: &str) -> Option<Document> {
    parse_oid(id).map(|oid| doc! { "_id": oid })
}

// =============================================================================
// Identity Directory
// =============================================================================

pub struct MongoIdentityDirectory {
    users: MongoCollection<UserDoc>,
}

impl MongoIdentityDirectory {
    pub async fn open(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            users: mongo.collection(USER_COLLECTION).await?,
        })
    }
}

#[async_trait::async_trait]
impl IdentityDirectory for MongoIdentityDirectory {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let Some(filter) = id_filter(id) else {
            return Ok(None);
        };
        self.users
            .find_one(filter)
            .await?
            .map(UserDoc::into_user)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.users
            .find_one(doc! { "email": email })
            .await?
            .map(UserDoc::into_user)
            .transpose()
    }

    async fn count_users(&self) -> Result<u64> {
        self.users.count(doc! {}).await
    }

    async fn insert_user(&self, user: &User) -> Result<String> {
        let oid = self
            .users
            .insert_one(UserDoc::from_user(user)?)
            .await
            .map_err(|e| match e {
                ReporterError::Conflict(_) => {
                    ReporterError::Conflict("Email already registered".into())
                }
                other => other,
            })?;
        Ok(oid.to_hex())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.users
            .find_many(doc! {}, Some(doc! { "created_at": 1 }))
            .await?
            .into_iter()
            .map(UserDoc::into_user)
            .collect()
    }

    async fn set_role(
        &self,
        id: &str,
        role: Role,
        at: chrono::DateTime<Utc>,
    ) -> Result<Option<User>> {
        let Some(filter) = id_filter(id) else {
            return Ok(None);
        };
        let result = self
            .users
            .update_one(
                filter.clone(),
                doc! { "$set": {
                    "role": role.as_str(),
                    "is_admin": role.is_admin(),
                    "updated_at": DateTime::from_chrono(at),
                }},
            )
            .await?;
        if result.matched_count == 0 {
            return Ok(None);
        }
        self.users
            .find_one(filter)
            .await?
            .map(UserDoc::into_user)
            .transpose()
    }
}

// =============================================================================
// Incident Store
// =============================================================================

pub struct MongoIncidentStore {
    incidents: MongoCollection<IncidentDoc>,
}

impl MongoIncidentStore {
    pub async fn open(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            incidents: mongo.collection(INCIDENT_COLLECTION).await?,
        })
    }
}

fn filter_document(filter: IncidentFilter) -> Document {
    let mut query = doc! {};
    if let Some(status) = filter.status {
        query.insert("status", status.as_str());
    }
    if let Some(kind) = filter.kind {
        query.insert("type", kind.as_str());
    }
    query
}

#[async_trait::async_trait]
impl IncidentStore for MongoIncidentStore {
    async fn insert(&self, incident: &Incident) -> Result<String> {
        let oid = self
            .incidents
            .insert_one(IncidentDoc::from_incident(incident)?)
            .await?;
        Ok(oid.to_hex())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Incident>> {
        let Some(filter) = id_filter(id) else {
            return Ok(None);
        };
        self.incidents
            .find_one(filter)
            .await?
            .map(IncidentDoc::into_incident)
            .transpose()
    }

    async fn find_all(&self) -> Result<Vec<Incident>> {
        self.incidents
            .find_many(doc! {}, Some(doc! { "created_at": -1 }))
            .await?
            .into_iter()
            .map(IncidentDoc::into_incident)
            .collect()
    }

    async fn update(
        &self,
        id: &str,
        changes: &IncidentChanges,
        at: chrono::DateTime<Utc>,
    ) -> Result<bool> {
        let Some(filter) = id_filter(id) else {
            return Ok(false);
        };
        let set = changes_to_set(changes, DateTime::from_chrono(at));
        let result = self.incidents.update_one(filter, doc! { "$set": set }).await?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        match id_filter(id) {
            Some(filter) => self.incidents.delete_one(filter).await,
            None => Ok(false),
        }
    }

    async fn count(&self, filter: IncidentFilter) -> Result<u64> {
        self.incidents.count(filter_document(filter)).await
    }

    async fn link_anonymous(
        &self,
        email: &str,
        owner: &str,
        at: chrono::DateTime<Utc>,
    ) -> Result<u64> {
        let owner = parse_oid(owner)
            .ok_or_else(|| ReporterError::Internal(format!("Malformed owner id '{}'", owner)))?;
        let email = email.to_lowercase();

        let result = self
            .incidents
            .update_many(
                doc! {
                    "reporter_email": email.as_str(),
                    "is_anonymous": true,
                    "user_id": null,
                },
                doc! { "$set": {
                    "user_id": owner,
                    "is_anonymous": false,
                    "updated_at": DateTime::from_chrono(at),
                }},
            )
            .await?;

        debug!(email = %email, modified = result.modified_count, "Anonymous link pass");
        Ok(result.modified_count)
    }
}

// =============================================================================
// Notification Sink
// =============================================================================

pub struct MongoNotificationSink {
    notifications: MongoCollection<NotificationDoc>,
}

impl MongoNotificationSink {
    pub async fn open(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            notifications: mongo.collection(NOTIFICATION_COLLECTION).await?,
        })
    }
}

#[async_trait::async_trait]
impl NotificationSink for MongoNotificationSink {
    async fn insert(&self, notification: &Notification) -> Result<String> {
        let oid = self
            .notifications
            .insert_one(NotificationDoc::from_notification(notification)?)
            .await?;
        Ok(oid.to_hex())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Notification>> {
        let Some(user) = parse_oid(user_id) else {
            return Ok(Vec::new());
        };
        self.notifications
            .find_many(doc! { "user_id": user }, Some(doc! { "created_at": -1 }))
            .await?
            .into_iter()
            .map(NotificationDoc::into_notification)
            .collect()
    }

    async fn count_unread(&self, user_id: &str) -> Result<u64> {
        let Some(user) = parse_oid(user_id) else {
            return Ok(0);
        };
        self.notifications
            .count(doc! { "user_id": user, "read": false })
            .await
    }

    async fn mark_read(&self, id: &str, user_id: &str) -> Result<bool> {
        let (Some(id), Some(user)) = (parse_oid(id), parse_oid(user_id)) else {
            return Ok(false);
        };
        let result = self
            .notifications
            .update_one(
                doc! { "_id": id, "user_id": user },
                doc! { "$set": { "read": true } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn mark_all_read(&self, user_id: &str) -> Result<u64> {
        let Some(user) = parse_oid(user_id) else {
            return Ok(0);
        };
        let result = self
            .notifications
            .update_many(
                doc! { "user_id": user, "read": false },
                doc! { "$set": { "read": true } },
            )
            .await?;
        Ok(result.modified_count)
    }
}

impl Stores {
    /// Open all three collections on one MongoDB connection
    pub async fn mongo(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            users: Arc::new(MongoIdentityDirectory::open(mongo).await?),
            incidents: Arc::new(MongoIncidentStore::open(mongo).await?),
            notifications: Arc::new(MongoNotificationSink::open(mongo).await?),
        })
    }
}
