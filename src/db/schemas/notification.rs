//! Notification document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{parse_oid, IntoIndexes};
use crate::model::Notification;
use crate::types::{ReporterError, Result};

pub const NOTIFICATION_COLLECTION: &str = "notifications";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NotificationDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub user_id: ObjectId,
    /// May point at a deleted incident
    pub incident_id: ObjectId,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime,
}

impl NotificationDoc {
    pub fn from_notification(n: &Notification) -> Result<Self> {
        let oid = |field: &str, value: &str| {
            parse_oid(value)
                .ok_or_else(|| ReporterError::Internal(format!("Malformed {} '{}'", field, value)))
        };
        Ok(Self {
            _id: Some(oid("notification id", &n.id)?),
            user_id: oid("user id", &n.user_id)?,
            incident_id: oid("incident id", &n.incident_id)?,
            message: n.message.clone(),
            kind: n.kind.clone(),
            read: n.read,
            created_at: DateTime::from_chrono(n.created_at),
        })
    }

    pub fn into_notification(self) -> Result<Notification> {
        let id = self
            ._id
            .ok_or_else(|| ReporterError::Database("Notification document without _id".into()))?;
        Ok(Notification {
            id: id.to_hex(),
            user_id: self.user_id.to_hex(),
            incident_id: self.incident_id.to_hex(),
            message: self.message,
            kind: self.kind,
            read: self.read,
            created_at: self.created_at.to_chrono(),
        })
    }
}

impl IntoIndexes for NotificationDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        let named = |name: &str| Some(IndexOptions::builder().name(name.to_string()).build());
        vec![
            (doc! { "user_id": 1 }, named("user_id")),
            (doc! { "read": 1 }, named("read")),
            (doc! { "created_at": -1 }, named("created_at_desc")),
            (doc! { "user_id": 1, "read": 1 }, named("user_id_read")),
        ]
    }
}
