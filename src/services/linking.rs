//! Anonymous linking
//!
//! An anonymous reporter may leave an email. When someone registers or logs
//! in with that email, every still-unowned report carrying it becomes theirs.
//! The store's filter excludes owned records, so each report is claimed at
//! most once and repeated passes return 0.

use std::sync::Arc;
use tracing::{info, warn};

use crate::services::now;
use crate::store::IncidentStore;

#[derive(Clone)]
pub struct AnonymousLinker {
    incidents: Arc<dyn IncidentStore>,
}

impl AnonymousLinker {
    pub fn new(incidents: Arc<dyn IncidentStore>) -> Self {
        Self { incidents }
    }

    /// Link matching reports to `user_id`. Never fails: a store error is
    /// logged and counts as nothing linked.
    pub async fn link(&self, email: &str, user_id: &str) -> u64 {
        let email = email.trim().to_lowercase();
        match self.incidents.link_anonymous(&email, user_id, now()).await {
            Ok(linked) => {
                if linked > 0 {
                    info!(user_id = %user_id, linked, "Linked anonymous incidents");
                }
                linked
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Anonymous linking failed");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::JwtValidator;
    use crate::model::{Incident, IncidentChanges, IncidentFilter, IncidentKind, IncidentStatus};
    use crate::services::users::{LoginRequest, RegisterRequest, UserService};
    use crate::store::{new_id, MemoryStore};
    use crate::types::{ReporterError, Result};
    use chrono::{DateTime, Utc};

    /// Incident store that is down for everything
    struct OfflineIncidents;

    fn offline<T>() -> Result<T> {
        Err(ReporterError::Database("incidents offline".into()))
    }

    #[async_trait::async_trait]
    impl IncidentStore for OfflineIncidents {
        async fn insert(&self, _: &Incident) -> Result<String> {
            offline()
        }
        async fn find_by_id(&self, _: &str) -> Result<Option<Incident>> {
            offline()
        }
        async fn find_all(&self) -> Result<Vec<Incident>> {
            offline()
        }
        async fn update(&self, _: &str, _: &IncidentChanges, _: DateTime<Utc>) -> Result<bool> {
            offline()
        }
        async fn delete(&self, _: &str) -> Result<bool> {
            offline()
        }
        async fn count(&self, _: IncidentFilter) -> Result<u64> {
            offline()
        }
        async fn link_anonymous(&self, _: &str, _: &str, _: DateTime<Utc>) -> Result<u64> {
            offline()
        }
    }

    fn anonymous(email: &str) -> Incident {
        let at = Utc::now();
        Incident {
            id: new_id(),
            title: "Stolen relief supplies".into(),
            description: "Relief food was resold at the market.".into(),
            kind: IncidentKind::Redflag,
            category: None,
            location: "Market square".into(),
            status: IncidentStatus::Pending,
            owner: None,
            reporter_email: Some(email.into()),
            reporter_name: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn test_store_failure_links_nothing() {
        let linker = AnonymousLinker::new(Arc::new(OfflineIncidents));
        assert_eq!(linker.link("a@x.com", "u1").await, 0);
    }

    #[tokio::test]
    async fn test_register_and_login_survive_link_failure() {
        let users = Arc::new(MemoryStore::new());
        let svc = UserService::new(
            users,
            AnonymousLinker::new(Arc::new(OfflineIncidents)),
            JwtValidator::new_dev(),
        );

        let registered = svc
            .register(&RegisterRequest {
                name: Some("Ada".into()),
                email: Some("a@x.com".into()),
                password: Some("secret123".into()),
            })
            .await
            .unwrap();
        assert_eq!(registered.linked_incidents, 0);
        assert!(!registered.token.is_empty());

        let login = svc
            .login(&LoginRequest {
                email: Some("a@x.com".into()),
                password: Some("secret123".into()),
            })
            .await
            .unwrap();
        assert_eq!(login.linked_incidents, 0);
        assert_eq!(login.user.id, registered.user.id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_links_claim_each_record_once() {
        let store = Arc::new(MemoryStore::new());
        for _ in 0..20 {
            IncidentStore::insert(&*store, &anonymous("c@x.com")).await.unwrap();
        }
        IncidentStore::insert(&*store, &anonymous("other@x.com"))
            .await
            .unwrap();

        let linker = AnonymousLinker::new(store.clone());
        let first = tokio::spawn({
            let linker = linker.clone();
            async move { linker.link("c@x.com", "u1").await }
        });
        let second = tokio::spawn({
            let linker = linker.clone();
            async move { linker.link("C@x.com", "u2").await }
        });
        let (first, second) = tokio::join!(first, second);
        assert_eq!(first.unwrap() + second.unwrap(), 20);

        let unowned = store
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .filter(|i| i.owner.is_none())
            .count();
        assert_eq!(unowned, 1);
        assert_eq!(linker.link("c@x.com", "u3").await, 0);
    }
}
