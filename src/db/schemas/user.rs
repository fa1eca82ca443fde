//! User document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{parse_oid, IntoIndexes};
use crate::model::{Role, User};
use crate::types::{ReporterError, Result};

pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    pub name: String,

    /// Lower-cased; unique index
    pub email: String,

    /// Argon2 PHC string
    pub password_hash: String,

    /// Older records may only carry `is_admin`
    #[serde(default)]
    pub role: Option<Role>,

    /// Mirrors `role`; kept for queries on admin count
    #[serde(default)]
    pub is_admin: bool,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl UserDoc {
    pub fn from_user(user: &User) -> Result<Self> {
        let id = parse_oid(&user.id)
            .ok_or_else(|| ReporterError::Internal(format!("Malformed user id '{}'", user.id)))?;
        Ok(Self {
            _id: Some(id),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: Some(user.role),
            is_admin: user.is_admin(),
            created_at: DateTime::from_chrono(user.created_at),
            updated_at: DateTime::from_chrono(user.updated_at),
        })
    }

    pub fn into_user(self) -> Result<User> {
        let id = self
            ._id
            .ok_or_else(|| ReporterError::Database("User document without _id".into()))?;
        let role = self.role.unwrap_or(if self.is_admin {
            Role::Admin
        } else {
            Role::User
        });
        Ok(User {
            id: id.to_hex(),
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            role,
            created_at: self.created_at.to_chrono(),
            updated_at: self.updated_at.to_chrono(),
        })
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "created_at": 1 },
                Some(IndexOptions::builder().name("created_at".to_string()).build()),
            ),
            (
                doc! { "is_admin": 1 },
                Some(IndexOptions::builder().name("is_admin".to_string()).build()),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{SubsecRound, Utc};

    #[test]
    fn test_legacy_role_from_is_admin() {
        let now = DateTime::now();
        let doc = UserDoc {
            _id: Some(ObjectId::new()),
            name: "Legacy".into(),
            email: "legacy@x.com".into(),
            password_hash: String::new(),
            role: None,
            is_admin: true,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(doc.into_user().unwrap().role, Role::Admin);
    }

    #[test]
    fn test_user_roundtrip_keeps_fields() {
        let now = Utc::now().trunc_subsecs(3);
        let user = User {
            id: ObjectId::new().to_hex(),
            name: "Ada".into(),
            email: "ada@x.com".into(),
            password_hash: "$argon2id$v=19$...".into(),
            role: Role::User,
            created_at: now,
            updated_at: now,
        };
        let doc = UserDoc::from_user(&user).unwrap();
        assert!(!doc.is_admin);
        assert_eq!(doc.into_user().unwrap(), user);
    }

    #[test]
    fn test_malformed_id_rejected() {
        let now = Utc::now();
        let user = User {
            id: "nope".into(),
            name: "Ada".into(),
            email: "ada@x.com".into(),
            password_hash: String::new(),
            role: Role::User,
            created_at: now,
            updated_at: now,
        };
        assert!(UserDoc::from_user(&user).is_err());
    }
}
