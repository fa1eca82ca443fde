//! Services
//!
//! - [`incidents`]: the incident lifecycle
//! - [`linking`]: claiming anonymous reports on register/login
//! - [`notifications`]: status-change messages and the inbox
//! - [`users`]: accounts and role administration
//! - [`validation`]: payload checks at the boundary

pub mod incidents;
pub mod linking;
pub mod notifications;
pub mod users;
pub mod validation;

use chrono::{DateTime, SubsecRound, Utc};

pub use incidents::IncidentService;
pub use linking::AnonymousLinker;
pub use notifications::NotificationService;
pub use users::{AuthOutcome, UserService};

use crate::auth::JwtValidator;
use crate::store::Stores;

/// Current time at millisecond precision, the resolution MongoDB stores.
/// Keeps in-memory and persisted timestamps comparable.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// All services wired to one set of stores
#[derive(Clone)]
pub struct Services {
    pub incidents: IncidentService,
    pub users: UserService,
    pub notifications: NotificationService,
    pub linker: AnonymousLinker,
}

impl Services {
    pub fn new(stores: Stores, jwt: JwtValidator) -> Self {
        let notifications = NotificationService::new(stores.notifications.clone());
        let linker = AnonymousLinker::new(stores.incidents.clone());
        Self {
            incidents: IncidentService::new(
                stores.incidents.clone(),
                stores.users.clone(),
                notifications.clone(),
            ),
            users: UserService::new(stores.users.clone(), linker.clone(), jwt),
            notifications,
            linker,
        }
    }
}
