//! Status-change notifications and the per-user inbox

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::model::{Inbox, Incident, IncidentStatus, Notification};
use crate::store::NotificationSink;
use crate::types::{ReporterError, Result};

#[derive(Clone)]
pub struct NotificationService {
    sink: Arc<dyn NotificationSink>,
}

impl NotificationService {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Tell the owner their incident moved from `old` to `new`.
    ///
    /// Runs after the status write has landed. The two writes are not
    /// atomic: if this one fails the status change stands, the failure is
    /// logged and the owner simply gets no message.
    pub async fn notify_status_change(
        &self,
        incident: &Incident,
        old: IncidentStatus,
        new: IncidentStatus,
    ) -> Option<Notification> {
        if old == new {
            return None;
        }
        let owner = incident.owner.as_deref()?;
        let Some(notification) =
            Notification::status_update(owner, &incident.id, &incident.title, new)
        else {
            debug!(incident_id = %incident.id, status = %new, "No message for status");
            return None;
        };

        match self.sink.insert(&notification).await {
            Ok(_) => {
                info!(
                    incident_id = %incident.id,
                    user_id = %owner,
                    status = %new,
                    "Status notification sent"
                );
                Some(notification)
            }
            Err(e) => {
                warn!(
                    incident_id = %incident.id,
                    user_id = %owner,
                    error = %e,
                    "Failed to write status notification"
                );
                None
            }
        }
    }

    /// Newest first, with the unread count
    pub async fn inbox(&self, user_id: &str) -> Result<Inbox> {
        let notifications = self.sink.list_for_user(user_id).await?;
        let unread_count = self.sink.count_unread(user_id).await?;
        Ok(Inbox {
            notifications,
            unread_count,
        })
    }

    /// Only the recipient may mark a notification; anyone else sees not found
    pub async fn mark_read(&self, user_id: &str, notification_id: &str) -> Result<()> {
        if self.sink.mark_read(notification_id, user_id).await? {
            Ok(())
        } else {
            Err(ReporterError::not_found("Notification not found"))
        }
    }

    pub async fn mark_all_read(&self, user_id: &str) -> Result<u64> {
        self.sink.mark_all_read(user_id).await
    }
}
