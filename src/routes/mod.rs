//! HTTP routes for iReporter

pub mod admin_users;
pub mod auth_routes;
pub mod health;
pub mod incidents;
pub mod notifications;
pub mod response;

pub use admin_users::{list_users, set_user_role};
pub use auth_routes::{login, me, register};
pub use health::{health_check, service_info, version_info};
pub use incidents::{
    change_incident_status, create_anonymous_incident, create_incident, delete_incident,
    get_incident, incident_stats, list_incidents, update_incident,
};
pub use notifications::{inbox, mark_all_read, mark_read};
pub use response::{
    cors_preflight, error_response, json_response, not_found_response, BoxBody, BoxError,
};
