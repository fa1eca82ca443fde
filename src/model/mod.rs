//! Domain records for incidents, users and notifications

pub mod incident;
pub mod notification;
pub mod user;

pub use incident::{
    Category, Incident, IncidentChanges, IncidentFilter, IncidentKind, IncidentStats,
    IncidentStatus, IncidentView, ANONYMOUS_REPORTER, UNKNOWN_REPORTER,
};
pub use notification::{Inbox, Notification};
pub use user::{Actor, Role, User, UserView};
