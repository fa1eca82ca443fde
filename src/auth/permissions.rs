//! Authorization policy
//!
//! Two predicates govern everything: an incident may be modified by its
//! owner or any admin, and status changes and user administration belong to
//! admins alone. Anonymous incidents have no owner, so only admins can touch
//! them.

use crate::model::{Actor, Incident};
use crate::types::{ReporterError, Result};

pub const PERMISSION_DENIED: &str = "Permission denied";
pub const ADMIN_REQUIRED: &str = "Admin access required";

/// Owner or admin
pub fn can_modify(incident: &Incident, actor: &Actor) -> bool {
    incident.is_owned_by(&actor.user_id) || actor.is_admin()
}

/// Admin only
pub fn can_change_status(actor: &Actor) -> bool {
    actor.is_admin()
}

/// Admin only
pub fn can_manage_users(actor: &Actor) -> bool {
    actor.is_admin()
}

pub fn require_modify(incident: &Incident, actor: &Actor) -> Result<()> {
    if can_modify(incident, actor) {
        Ok(())
    } else {
        Err(ReporterError::permission(PERMISSION_DENIED))
    }
}

pub fn require_status_change(actor: &Actor) -> Result<()> {
    if can_change_status(actor) {
        Ok(())
    } else {
        Err(ReporterError::permission(ADMIN_REQUIRED))
    }
}

pub fn require_user_admin(actor: &Actor) -> Result<()> {
    if can_manage_users(actor) {
        Ok(())
    } else {
        Err(ReporterError::permission(ADMIN_REQUIRED))
    }
}
