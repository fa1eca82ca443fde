//! Incident lifecycle
//!
//! Creation (authenticated and anonymous), reads, owner/admin edits, deletion
//! and admin status changes. The service keeps no state of its own; every
//! call reads what it needs from the stores.
//!
//! Status is a free graph: any status may move to any other. A move to a
//! different status on an owned incident notifies the owner, except a move
//! back to pending, which is silent.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::permissions::{can_change_status, require_modify, require_status_change};
use crate::model::{
    Actor, Incident, IncidentChanges, IncidentFilter, IncidentKind, IncidentStats,
    IncidentStatus, IncidentView, User, UNKNOWN_REPORTER,
};
use crate::services::notifications::NotificationService;
use crate::services::now;
use crate::services::validation::{validate_status, AnonymousDraft, IncidentDraft, IncidentPatch};
use crate::store::{new_id, IdentityDirectory, IncidentStore};
use crate::types::{ReporterError, Result};

pub const INCIDENT_NOT_FOUND: &str = "Incident not found";
pub const USER_NOT_FOUND: &str = "User not found";

#[derive(Clone)]
pub struct IncidentService {
    incidents: Arc<dyn IncidentStore>,
    users: Arc<dyn IdentityDirectory>,
    notifier: NotificationService,
}

impl IncidentService {
    pub fn new(
        incidents: Arc<dyn IncidentStore>,
        users: Arc<dyn IdentityDirectory>,
        notifier: NotificationService,
    ) -> Self {
        Self {
            incidents,
            users,
            notifier,
        }
    }

    /// The caller's current user record. Roles come from here, never from
    /// the token.
    async fn caller(&self, user_id: &str) -> Result<User> {
        self.users
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| ReporterError::not_found(USER_NOT_FOUND))
    }

    async fn load(&self, id: &str) -> Result<Incident> {
        self.incidents
            .find_by_id(id)
            .await?
            .ok_or_else(|| ReporterError::not_found(INCIDENT_NOT_FOUND))
    }

    async fn display_name(&self, incident: &Incident) -> Result<String> {
        match incident.owner.as_deref() {
            Some(owner) => Ok(self
                .users
                .find_user_by_id(owner)
                .await?
                .map(|u| u.name)
                .unwrap_or_else(|| UNKNOWN_REPORTER.to_string())),
            None => Ok(incident.reporter_display_name()),
        }
    }

    async fn view(&self, incident: Incident) -> Result<IncidentView> {
        let name = self.display_name(&incident).await?;
        Ok(IncidentView::new(incident, name))
    }

    /// Authenticated create: the caller becomes the owner
    pub async fn create(&self, caller_id: &str, draft: &IncidentDraft) -> Result<IncidentView> {
        let user = self.caller(caller_id).await?;
        let valid = draft.validate()?;
        let at = now();

        let incident = Incident {
            id: new_id(),
            title: valid.title,
            description: valid.description,
            kind: valid.kind,
            category: valid.category,
            location: valid.location,
            status: IncidentStatus::Pending,
            owner: Some(user.id.clone()),
            reporter_email: None,
            reporter_name: None,
            created_at: at,
            updated_at: at,
        };
        self.incidents.insert(&incident).await?;

        info!(
            incident_id = %incident.id,
            user_id = %user.id,
            kind = %incident.kind,
            "Incident created"
        );
        Ok(IncidentView::new(incident, user.name))
    }

    /// Anonymous create: no owner, optional contact email for later linking
    pub async fn create_anonymous(&self, draft: &AnonymousDraft) -> Result<IncidentView> {
        let valid = draft.incident.validate()?;
        let contact = draft.contact();
        let at = now();

        let incident = Incident {
            id: new_id(),
            title: valid.title,
            description: valid.description,
            kind: valid.kind,
            category: valid.category,
            location: valid.location,
            status: IncidentStatus::Pending,
            owner: None,
            reporter_email: contact.email,
            reporter_name: Some(contact.name.clone()),
            created_at: at,
            updated_at: at,
        };
        self.incidents.insert(&incident).await?;

        info!(
            incident_id = %incident.id,
            kind = %incident.kind,
            has_email = incident.reporter_email.is_some(),
            "Anonymous incident created"
        );
        Ok(IncidentView::new(incident, contact.name))
    }

    pub async fn read(&self, caller_id: &str, id: &str) -> Result<IncidentView> {
        self.caller(caller_id).await?;
        let incident = self.load(id).await?;
        self.view(incident).await
    }

    /// All incidents, newest first
    pub async fn list(&self, caller_id: &str) -> Result<Vec<IncidentView>> {
        self.caller(caller_id).await?;
        let incidents = self.incidents.find_all().await?;

        let mut names: HashMap<String, String> = HashMap::new();
        let mut views = Vec::with_capacity(incidents.len());
        for incident in incidents {
            let name = match incident.owner.as_deref() {
                Some(owner) => match names.get(owner) {
                    Some(name) => name.clone(),
                    None => {
                        let name = self.display_name(&incident).await?;
                        names.insert(owner.to_string(), name.clone());
                        name
                    }
                },
                None => incident.reporter_display_name(),
            };
            views.push(IncidentView::new(incident, name));
        }
        Ok(views)
    }

    /// Owner or admin edit.
    ///
    /// `status` in the patch is applied only for admins and follows the same
    /// notification rule as [`change_status`](Self::change_status).
    pub async fn update(
        &self,
        caller_id: &str,
        id: &str,
        patch: &IncidentPatch,
    ) -> Result<IncidentView> {
        let actor = Actor::from(&self.caller(caller_id).await?);
        let current = self.load(id).await?;
        require_modify(&current, &actor)?;

        let mut changes: IncidentChanges = patch.fields.validate(current.kind, current.category)?;
        match patch.status.as_deref() {
            Some(status) if can_change_status(&actor) => {
                changes.status = Some(validate_status(Some(status))?);
            }
            Some(_) => {
                debug!(
                    incident_id = %id,
                    user_id = %actor.user_id,
                    "Ignoring status from non-admin"
                );
            }
            None => {}
        }

        if !self.incidents.update(id, &changes, now()).await? {
            return Err(ReporterError::not_found(INCIDENT_NOT_FOUND));
        }
        let updated = self.load(id).await?;
        info!(incident_id = %id, user_id = %actor.user_id, "Incident updated");

        if let Some(new_status) = changes.status {
            self.notifier
                .notify_status_change(&updated, current.status, new_status)
                .await;
        }
        self.view(updated).await
    }

    /// Owner or admin hard delete. Notifications about the incident stay.
    pub async fn delete(&self, caller_id: &str, id: &str) -> Result<()> {
        let actor = Actor::from(&self.caller(caller_id).await?);
        let current = self.load(id).await?;
        require_modify(&current, &actor)?;

        if !self.incidents.delete(id).await? {
            return Err(ReporterError::not_found(INCIDENT_NOT_FOUND));
        }
        info!(incident_id = %id, user_id = %actor.user_id, "Incident deleted");
        Ok(())
    }

    /// Admin-only status change
    pub async fn change_status(
        &self,
        caller_id: &str,
        id: &str,
        status: Option<&str>,
    ) -> Result<IncidentView> {
        let actor = Actor::from(&self.caller(caller_id).await?);
        require_status_change(&actor)?;
        let current = self.load(id).await?;
        let new_status = validate_status(status)?;

        let changes = IncidentChanges {
            status: Some(new_status),
            ..Default::default()
        };
        if !self.incidents.update(id, &changes, now()).await? {
            return Err(ReporterError::not_found(INCIDENT_NOT_FOUND));
        }
        let updated = self.load(id).await?;
        info!(
            incident_id = %id,
            from = %current.status,
            to = %new_status,
            "Incident status changed"
        );

        self.notifier
            .notify_status_change(&updated, current.status, new_status)
            .await;
        self.view(updated).await
    }

    /// Every incident newest first, for the management CLI
    pub async fn all(&self) -> Result<Vec<Incident>> {
        self.incidents.find_all().await
    }

    pub async fn count(&self, filter: IncidentFilter) -> Result<u64> {
        self.incidents.count(filter).await
    }

    /// Totals by status and by type
    pub async fn stats(&self) -> Result<IncidentStats> {
        let mut stats = IncidentStats {
            total: self.incidents.count(IncidentFilter::all()).await?,
            ..Default::default()
        };
        for status in IncidentStatus::ALL {
            let count = self.incidents.count(IncidentFilter::status(status)).await?;
            stats.set_status_count(status, count);
        }
        for kind in IncidentKind::ALL {
            let count = self.incidents.count(IncidentFilter::kind(kind)).await?;
            stats.set_kind_count(kind, count);
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Notification, Role};
    use crate::services::validation::EditableFields;
    use crate::store::{MemoryStore, NotificationSink};
    use chrono::Utc;

    /// Sink whose writes always fail
    struct BrokenSink;

    #[async_trait::async_trait]
    impl NotificationSink for BrokenSink {
        async fn insert(&self, _: &Notification) -> Result<String> {
            Err(ReporterError::Database("sink offline".into()))
        }
        async fn list_for_user(&self, _: &str) -> Result<Vec<Notification>> {
            Ok(Vec::new())
        }
        async fn count_unread(&self, _: &str) -> Result<u64> {
            Ok(0)
        }
        async fn mark_read(&self, _: &str, _: &str) -> Result<bool> {
            Ok(false)
        }
        async fn mark_all_read(&self, _: &str) -> Result<u64> {
            Ok(0)
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        service: IncidentService,
        admin: String,
        alice: String,
        bob: String,
    }

    async fn add_user(store: &MemoryStore, name: &str, role: Role) -> String {
        let now = Utc::now();
        let user = User {
            id: new_id(),
            name: name.into(),
            email: format!("{}@x.com", name.to_lowercase()),
            password_hash: String::new(),
            role,
            created_at: now,
            updated_at: now,
        };
        store.insert_user(&user).await.unwrap()
    }

    async fn fixture_with_sink(sink: Option<Arc<dyn NotificationSink>>) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let admin = add_user(&store, "Admin", Role::Admin).await;
        let alice = add_user(&store, "Alice", Role::User).await;
        let bob = add_user(&store, "Bob", Role::User).await;
        let sink = sink.unwrap_or_else(|| store.clone() as Arc<dyn NotificationSink>);
        let service = IncidentService::new(
            store.clone(),
            store.clone(),
            NotificationService::new(sink),
        );
        Fixture {
            store,
            service,
            admin,
            alice,
            bob,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with_sink(None).await
    }

    fn draft() -> IncidentDraft {
        IncidentDraft {
            title: Some("Clinic has no water".into()),
            description: Some("The county clinic has had no running water for a week".into()),
            kind: Some("intervention".into()),
            category: Some("healthcare".into()),
            location: Some("Eastside clinic".into()),
        }
    }

    #[tokio::test]
    async fn test_create_sets_owner_and_pending() {
        let f = fixture().await;
        let view = f.service.create(&f.alice, &draft()).await.unwrap();

        assert_eq!(view.user_id.as_deref(), Some(f.alice.as_str()));
        assert!(!view.is_anonymous);
        assert_eq!(view.status, IncidentStatus::Pending);
        assert_eq!(view.user_name, "Alice");
        assert_eq!(view.created_at, view.updated_at);
    }

    #[tokio::test]
    async fn test_create_requires_known_caller() {
        let f = fixture().await;
        let err = f.service.create(&new_id(), &draft()).await.unwrap_err();
        assert!(matches!(err, ReporterError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_anonymous_create_has_no_owner() {
        let f = fixture().await;
        let anon = AnonymousDraft {
            incident: draft(),
            reporter_email: None,
            reporter_name: None,
        };
        let view = f.service.create_anonymous(&anon).await.unwrap();
        assert!(view.is_anonymous);
        assert!(view.user_id.is_none());
        assert_eq!(view.user_name, "Anonymous");
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let f = fixture().await;
        let err = f.service.read(&f.alice, &new_id()).await.unwrap_err();
        assert_eq!(err.to_string(), INCIDENT_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_read_shows_unknown_for_vanished_owner() {
        let f = fixture().await;
        let ghost = new_id();
        let at = now();
        let incident = Incident {
            id: new_id(),
            title: "Orphaned report".into(),
            description: "Owner account has since been removed".into(),
            kind: IncidentKind::Redflag,
            category: None,
            location: "Somewhere".into(),
            status: IncidentStatus::Pending,
            owner: Some(ghost),
            reporter_email: None,
            reporter_name: None,
            created_at: at,
            updated_at: at,
        };
        IncidentStore::insert(f.store.as_ref(), &incident).await.unwrap();

        let view = f.service.read(&f.alice, &incident.id).await.unwrap();
        assert_eq!(view.user_name, UNKNOWN_REPORTER);
    }

    #[tokio::test]
    async fn test_update_permissions() {
        let f = fixture().await;
        let created = f.service.create(&f.alice, &draft()).await.unwrap();
        let patch = IncidentPatch {
            fields: EditableFields {
                title: Some("Clinic still has no water".into()),
                ..Default::default()
            },
            status: None,
        };

        let err = f.service.update(&f.bob, &created.id, &patch).await.unwrap_err();
        assert!(matches!(err, ReporterError::Permission(_)));

        let by_owner = f.service.update(&f.alice, &created.id, &patch).await.unwrap();
        assert_eq!(by_owner.title, "Clinic still has no water");

        let by_admin = f.service.update(&f.admin, &created.id, &patch).await.unwrap();
        assert_eq!(by_admin.title, "Clinic still has no water");
    }

    #[tokio::test]
    async fn test_update_ignores_status_from_owner() {
        let f = fixture().await;
        let created = f.service.create(&f.alice, &draft()).await.unwrap();
        let patch = IncidentPatch {
            fields: EditableFields::default(),
            status: Some("resolved".into()),
        };

        let view = f.service.update(&f.alice, &created.id, &patch).await.unwrap();
        assert_eq!(view.status, IncidentStatus::Pending);
        assert!(view.updated_at >= view.created_at);
    }

    #[tokio::test]
    async fn test_admin_status_in_update_notifies() {
        let f = fixture().await;
        let created = f.service.create(&f.alice, &draft()).await.unwrap();
        let patch = IncidentPatch {
            fields: EditableFields::default(),
            status: Some("investigating".into()),
        };

        let view = f.service.update(&f.admin, &created.id, &patch).await.unwrap();
        assert_eq!(view.status, IncidentStatus::Investigating);
        assert_eq!(f.store.count_unread(&f.alice).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_permissions() {
        let f = fixture().await;
        let created = f.service.create(&f.alice, &draft()).await.unwrap();

        let err = f.service.delete(&f.bob, &created.id).await.unwrap_err();
        assert!(matches!(err, ReporterError::Permission(_)));

        f.service.delete(&f.alice, &created.id).await.unwrap();
        let err = f.service.read(&f.alice, &created.id).await.unwrap_err();
        assert!(matches!(err, ReporterError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_change_status_admin_only() {
        let f = fixture().await;
        let created = f.service.create(&f.alice, &draft()).await.unwrap();

        let err = f
            .service
            .change_status(&f.alice, &created.id, Some("resolved"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReporterError::Permission(_)));

        let err = f
            .service
            .change_status(&f.admin, &created.id, Some("archived"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReporterError::Validation(_)));
    }

    #[tokio::test]
    async fn test_same_status_twice_notifies_once() {
        let f = fixture().await;
        let created = f.service.create(&f.alice, &draft()).await.unwrap();

        for _ in 0..2 {
            f.service
                .change_status(&f.admin, &created.id, Some("resolved"))
                .await
                .unwrap();
        }

        let inbox = f.store.list_for_user(&f.alice).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(inbox[0].message.contains("has been resolved"));
    }

    #[tokio::test]
    async fn test_back_to_pending_is_silent() {
        let f = fixture().await;
        let created = f.service.create(&f.alice, &draft()).await.unwrap();

        f.service
            .change_status(&f.admin, &created.id, Some("rejected"))
            .await
            .unwrap();
        let view = f
            .service
            .change_status(&f.admin, &created.id, Some("pending"))
            .await
            .unwrap();

        assert_eq!(view.status, IncidentStatus::Pending);
        assert_eq!(f.store.list_for_user(&f.alice).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_anonymous_status_change_is_silent() {
        let f = fixture().await;
        let anon = AnonymousDraft {
            incident: draft(),
            reporter_email: Some("nobody@x.com".into()),
            reporter_name: Some("Nobody".into()),
        };
        let created = f.service.create_anonymous(&anon).await.unwrap();
        let view = f
            .service
            .change_status(&f.admin, &created.id, Some("investigating"))
            .await
            .unwrap();

        assert_eq!(view.status, IncidentStatus::Investigating);
        assert_eq!(view.user_name, "Nobody");
        for user in [&f.admin, &f.alice, &f.bob] {
            assert!(f.store.list_for_user(user).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_sink_failure_keeps_status() {
        let f = fixture_with_sink(Some(Arc::new(BrokenSink))).await;
        let created = f.service.create(&f.alice, &draft()).await.unwrap();

        let view = f
            .service
            .change_status(&f.admin, &created.id, Some("resolved"))
            .await
            .unwrap();
        assert_eq!(view.status, IncidentStatus::Resolved);

        let stored = f.service.read(&f.alice, &created.id).await.unwrap();
        assert_eq!(stored.status, IncidentStatus::Resolved);
    }

    #[tokio::test]
    async fn test_stats_counts() {
        let f = fixture().await;
        let first = f.service.create(&f.alice, &draft()).await.unwrap();
        let mut redflag = draft();
        redflag.kind = Some("redflag".into());
        redflag.category = Some("bribery".into());
        f.service.create(&f.bob, &redflag).await.unwrap();
        f.service
            .change_status(&f.admin, &first.id, Some("resolved"))
            .await
            .unwrap();

        let stats = f.service.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.investigating, 0);
        assert_eq!(stats.redflags, 1);
        assert_eq!(stats.interventions, 1);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let f = fixture().await;
        let first = f.service.create(&f.alice, &draft()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = f.service.create(&f.bob, &draft()).await.unwrap();

        let list = f.service.list(&f.admin).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, second.id);
        assert_eq!(list[1].id, first.id);
        assert_eq!(list[0].user_name, "Bob");
    }
}
