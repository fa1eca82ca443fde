//! iReporter - citizen reporting of corruption (red flags) and requests
//! for government intervention
//!
//! Incidents move through an admin-driven lifecycle (pending,
//! investigating, resolved, rejected). Owners are notified when their
//! report changes status. Reports can be filed anonymously; those left
//! with a contact email are claimed by the account that later registers
//! or logs in with it.

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod routes;
pub mod server;
pub mod services;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use services::Services;
pub use types::{ReporterError, Result};
