//! In-memory backend
//!
//! Used in dev mode when MongoDB is unreachable, and by the test suites.
//! Data lives only as long as the process.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::model::{Incident, IncidentChanges, IncidentFilter, Notification, Role, User};
use crate::store::{IdentityDirectory, IncidentStore, NotificationSink};
use crate::types::{ReporterError, Result};

/// Users, incidents and notifications in concurrent maps
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    /// email -> user id; the uniqueness index
    emails: DashMap<String, String>,
    incidents: DashMap<String, Incident>,
    notifications: DashMap<String, Notification>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl IdentityDirectory for MemoryStore {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let Some(id) = self.emails.get(email).map(|id| id.clone()) else {
            return Ok(None);
        };
        self.find_user_by_id(&id).await
    }

    async fn count_users(&self) -> Result<u64> {
        Ok(self.users.len() as u64)
    }

    async fn insert_user(&self, user: &User) -> Result<String> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => {
                return Err(ReporterError::Conflict("Email already registered".into()))
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
            }
        }
        self.users.insert(user.id.clone(), user.clone());
        Ok(user.id.clone())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.clone()).collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn set_role(&self, id: &str, role: Role, at: DateTime<Utc>) -> Result<Option<User>> {
        Ok(self.users.get_mut(id).map(|mut user| {
            user.role = role;
            user.updated_at = at;
            user.clone()
        }))
    }
}

#[async_trait::async_trait]
impl IncidentStore for MemoryStore {
    async fn insert(&self, incident: &Incident) -> Result<String> {
        self.incidents.insert(incident.id.clone(), incident.clone());
        Ok(incident.id.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Incident>> {
        Ok(self.incidents.get(id).map(|i| i.clone()))
    }

    async fn find_all(&self) -> Result<Vec<Incident>> {
        let mut all: Vec<Incident> = self.incidents.iter().map(|i| i.clone()).collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn update(&self, id: &str, changes: &IncidentChanges, at: DateTime<Utc>) -> Result<bool> {
        Ok(match self.incidents.get_mut(id) {
            Some(mut incident) => {
                changes.apply(&mut incident, at);
                true
            }
            None => false,
        })
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.incidents.remove(id).is_some())
    }

    async fn count(&self, filter: IncidentFilter) -> Result<u64> {
        Ok(self
            .incidents
            .iter()
            .filter(|i| filter.matches(i.value()))
            .count() as u64)
    }

    async fn link_anonymous(&self, email: &str, owner: &str, at: DateTime<Utc>) -> Result<u64> {
        let email = email.to_lowercase();
        let mut linked = 0;
        // The predicate is re-checked under each entry's lock, so a record
        // can only be claimed once even with concurrent callers.
        for mut entry in self.incidents.iter_mut() {
            let incident = entry.value_mut();
            let matches = incident.reporter_email.as_deref() == Some(email.as_str());
            if incident.owner.is_none() && matches {
                incident.owner = Some(owner.to_string());
                incident.updated_at = at;
                linked += 1;
            }
        }
        Ok(linked)
    }
}

#[async_trait::async_trait]
impl NotificationSink for MemoryStore {
    async fn insert(&self, notification: &Notification) -> Result<String> {
        self.notifications
            .insert(notification.id.clone(), notification.clone());
        Ok(notification.id.clone())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Notification>> {
        let mut list: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .map(|n| n.clone())
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn count_unread(&self, user_id: &str) -> Result<u64> {
        Ok(self
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.read)
            .count() as u64)
    }

    async fn mark_read(&self, id: &str, user_id: &str) -> Result<bool> {
        Ok(match self.notifications.get_mut(id) {
            Some(mut n) if n.user_id == user_id => {
                n.read = true;
                true
            }
            _ => false,
        })
    }

    async fn mark_all_read(&self, user_id: &str) -> Result<u64> {
        let mut changed = 0;
        for mut entry in self.notifications.iter_mut() {
            let n = entry.value_mut();
            if n.user_id == user_id && !n.read {
                n.read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IncidentKind, IncidentStatus};
    use crate::store::new_id;
    use chrono::Duration;

    fn user(email: &str) -> User {
        let now = Utc::now();
        User {
            id: new_id(),
            name: "Someone".into(),
            email: email.into(),
            password_hash: String::new(),
            role: Role::User,
            created_at: now,
            updated_at: now,
        }
    }

    fn incident(owner: Option<&str>, email: Option<&str>, at: DateTime<Utc>) -> Incident {
        Incident {
            id: new_id(),
            title: "Pothole on 5th".into(),
            description: "A pothole large enough to swallow a bike".into(),
            kind: IncidentKind::Intervention,
            category: None,
            location: "5th Avenue".into(),
            status: IncidentStatus::Pending,
            owner: owner.map(String::from),
            reporter_email: email.map(String::from),
            reporter_name: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.insert_user(&user("a@x.com")).await.unwrap();
        let err = store.insert_user(&user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, ReporterError::Conflict(_)));
        assert_eq!(store.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_all_newest_first() {
        let store = MemoryStore::new();
        let t0 = Utc::now();
        let old = incident(None, None, t0);
        let new = incident(None, None, t0 + Duration::seconds(5));
        IncidentStore::insert(&store, &old).await.unwrap();
        IncidentStore::insert(&store, &new).await.unwrap();

        let all = store.find_all().await.unwrap();
        assert_eq!(all[0].id, new.id);
        assert_eq!(all[1].id, old.id);
    }

    #[tokio::test]
    async fn test_link_only_unowned_matching() {
        let store = MemoryStore::new();
        let now = Utc::now();
        IncidentStore::insert(&store, &incident(None, Some("b@x.com"), now))
            .await
            .unwrap();
        IncidentStore::insert(&store, &incident(Some("other"), Some("b@x.com"), now))
            .await
            .unwrap();
        IncidentStore::insert(&store, &incident(None, Some("c@x.com"), now))
            .await
            .unwrap();

        assert_eq!(store.link_anonymous("B@x.com", "u-b", now).await.unwrap(), 1);
        assert_eq!(store.link_anonymous("b@x.com", "u-b", now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_read_checks_recipient() {
        let store = MemoryStore::new();
        let n = Notification::status_update("u1", "i1", "Title", IncidentStatus::Resolved).unwrap();
        NotificationSink::insert(&store, &n).await.unwrap();

        assert!(!store.mark_read(&n.id, "u2").await.unwrap());
        assert_eq!(store.count_unread("u1").await.unwrap(), 1);
        assert!(store.mark_read(&n.id, "u1").await.unwrap());
        assert_eq!(store.count_unread("u1").await.unwrap(), 0);
        assert_eq!(store.mark_all_read("u1").await.unwrap(), 0);
    }
}
