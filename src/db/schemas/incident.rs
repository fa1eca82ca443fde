//! Incident document schema
//!
//! `is_anonymous` is stored alongside `user_id` so the linking filter can be
//! expressed as a plain equality query; it is always written as
//! `user_id.is_none()` and never read back as a separate fact.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{parse_oid, IntoIndexes};
use crate::model::{Category, Incident, IncidentChanges, IncidentKind, IncidentStatus};
use crate::types::{ReporterError, Result};

pub const INCIDENT_COLLECTION: &str = "incidents";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct IncidentDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    pub title: String,
    pub description: String,

    #[serde(rename = "type")]
    pub kind: IncidentKind,

    #[serde(default)]
    pub category: Option<Category>,

    pub location: String,

    #[serde(default)]
    pub status: IncidentStatus,

    /// Owning user; null for anonymous reports
    #[serde(default)]
    pub user_id: Option<ObjectId>,

    #[serde(default)]
    pub is_anonymous: bool,

    #[serde(default)]
    pub reporter_email: Option<String>,

    #[serde(default)]
    pub reporter_name: Option<String>,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl IncidentDoc {
    pub fn from_incident(incident: &Incident) -> Result<Self> {
        let id = parse_oid(&incident.id).ok_or_else(|| {
            ReporterError::Internal(format!("Malformed incident id '{}'", incident.id))
        })?;
        let user_id = incident
            .owner
            .as_deref()
            .map(|owner| {
                parse_oid(owner)
                    .ok_or_else(|| ReporterError::Internal(format!("Malformed owner id '{}'", owner)))
            })
            .transpose()?;

        Ok(Self {
            _id: Some(id),
            title: incident.title.clone(),
            description: incident.description.clone(),
            kind: incident.kind,
            category: incident.category,
            location: incident.location.clone(),
            status: incident.status,
            is_anonymous: user_id.is_none(),
            user_id,
            reporter_email: incident.reporter_email.clone(),
            reporter_name: incident.reporter_name.clone(),
            created_at: DateTime::from_chrono(incident.created_at),
            updated_at: DateTime::from_chrono(incident.updated_at),
        })
    }

    pub fn into_incident(self) -> Result<Incident> {
        let id = self
            ._id
            .ok_or_else(|| ReporterError::Database("Incident document without _id".into()))?;
        Ok(Incident {
            id: id.to_hex(),
            title: self.title,
            description: self.description,
            kind: self.kind,
            category: self.category,
            location: self.location,
            status: self.status,
            owner: self.user_id.map(|oid| oid.to_hex()),
            reporter_email: self.reporter_email,
            reporter_name: self.reporter_name,
            created_at: self.created_at.to_chrono(),
            updated_at: self.updated_at.to_chrono(),
        })
    }
}

/// `$set` document for a change set, always including `updated_at`
pub fn changes_to_set(changes: &IncidentChanges, at: DateTime) -> Document {
    let mut set = doc! { "updated_at": at };
    if let Some(ref title) = changes.title {
        set.insert("title", title.as_str());
    }
    if let Some(ref description) = changes.description {
        set.insert("description", description.as_str());
    }
    if let Some(kind) = changes.kind {
        set.insert("type", kind.as_str());
    }
    if let Some(category) = changes.category {
        set.insert("category", category.as_str());
    }
    if let Some(ref location) = changes.location {
        set.insert("location", location.as_str());
    }
    if let Some(status) = changes.status {
        set.insert("status", status.as_str());
    }
    set
}

impl IntoIndexes for IncidentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        let named = |name: &str| Some(IndexOptions::builder().name(name.to_string()).build());
        vec![
            (doc! { "user_id": 1 }, named("user_id")),
            (doc! { "status": 1 }, named("status")),
            (doc! { "type": 1 }, named("type")),
            (doc! { "category": 1 }, named("category")),
            (doc! { "created_at": -1 }, named("created_at_desc")),
            (doc! { "location": 1 }, named("location")),
            (doc! { "user_id": 1, "status": 1 }, named("user_id_status")),
            (doc! { "type": 1, "status": 1 }, named("type_status")),
            (
                doc! { "reporter_email": 1, "is_anonymous": 1 },
                named("reporter_email_anonymous"),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{SubsecRound, Utc};

    fn incident(owner: Option<String>) -> Incident {
        let now = Utc::now().trunc_subsecs(3);
        Incident {
            id: ObjectId::new().to_hex(),
            title: "Inflated tender".into(),
            description: "Road tender priced at three times market rate".into(),
            kind: IncidentKind::Redflag,
            category: Some(Category::Fraud),
            location: "Ministry of Works".into(),
            status: IncidentStatus::Investigating,
            owner,
            reporter_email: None,
            reporter_name: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_anonymous_flag_follows_owner() {
        let anon = IncidentDoc::from_incident(&incident(None)).unwrap();
        assert!(anon.is_anonymous);
        assert!(anon.user_id.is_none());

        let owned = IncidentDoc::from_incident(&incident(Some(ObjectId::new().to_hex()))).unwrap();
        assert!(!owned.is_anonymous);
    }

    #[test]
    fn test_roundtrip() {
        let original = incident(Some(ObjectId::new().to_hex()));
        let back = IncidentDoc::from_incident(&original)
            .unwrap()
            .into_incident()
            .unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_set_document_only_carries_changes() {
        let changes = IncidentChanges {
            title: Some("Shorter title".into()),
            status: Some(IncidentStatus::Resolved),
            ..Default::default()
        };
        let set = changes_to_set(&changes, DateTime::now());
        assert_eq!(set.get_str("title").unwrap(), "Shorter title");
        assert_eq!(set.get_str("status").unwrap(), "resolved");
        assert!(set.get("description").is_none());
        assert!(set.get("updated_at").is_some());
    }

    #[test]
    fn test_serialized_type_key() {
        let doc = bson::to_document(&IncidentDoc::from_incident(&incident(None)).unwrap()).unwrap();
        assert_eq!(doc.get_str("type").unwrap(), "redflag");
        assert_eq!(doc.get_str("category").unwrap(), "fraud");
    }
}
