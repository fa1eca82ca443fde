//! Status-change notifications

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;

use super::incident::IncidentStatus;

/// Kind tag carried by every notification this service emits
pub const STATUS_UPDATE: &str = "status_update";

/// A message to one registered user about one of their incidents
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub incident_id: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Build the unread notice for a transition into `status`.
    ///
    /// Returns `None` for statuses that carry no message.
    pub fn status_update(
        user_id: impl Into<String>,
        incident_id: impl Into<String>,
        title: &str,
        status: IncidentStatus,
    ) -> Option<Self> {
        let message = status_message(title, status)?;
        Some(Self {
            id: crate::store::new_id(),
            user_id: user_id.into(),
            incident_id: incident_id.into(),
            message,
            kind: STATUS_UPDATE.to_string(),
            read: false,
            created_at: Utc::now().trunc_subsecs(3),
        })
    }
}

/// Message text for a transition into `status`. Moving back to pending is silent.
pub fn status_message(title: &str, status: IncidentStatus) -> Option<String> {
    let message = match status {
        IncidentStatus::Investigating => {
            format!("Your incident '{}' is now under investigation.", title)
        }
        IncidentStatus::Resolved => format!("Your incident '{}' has been resolved!", title),
        IncidentStatus::Rejected => {
            format!("Your incident '{}' has been reviewed and rejected.", title)
        }
        IncidentStatus::Pending => return None,
    };
    Some(message)
}

/// A user's notifications, newest first, with the unread count
#[derive(Debug, Clone, Serialize)]
pub struct Inbox {
    pub notifications: Vec<Notification>,
    pub unread_count: u64,
}
