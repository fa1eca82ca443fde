//! MongoDB document structures for users, incidents and notifications

mod incident;
mod notification;
mod user;

pub use incident::{changes_to_set, IncidentDoc, INCIDENT_COLLECTION};
pub use notification::{NotificationDoc, NOTIFICATION_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};
