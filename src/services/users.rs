//! Accounts: registration, login, profile and role administration

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::permissions::require_user_admin;
use crate::auth::{hash_password, verify_password, JwtValidator};
use crate::model::{Actor, Role, User, UserView};
use crate::services::incidents::USER_NOT_FOUND;
use crate::services::linking::AnonymousLinker;
use crate::services::now;
use crate::services::validation::{validate_email, validate_name, validate_password};
use crate::store::{new_id, IdentityDirectory};
use crate::types::{ReporterError, Result};

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const EMAIL_TAKEN: &str = "User already exists";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleChange {
    #[serde(default)]
    pub role: Option<String>,
}

/// Result of a successful register or login
#[derive(Debug, Clone, Serialize)]
pub struct AuthOutcome {
    pub user: UserView,
    pub token: String,
    pub linked_incidents: u64,
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn IdentityDirectory>,
    linker: AnonymousLinker,
    jwt: JwtValidator,
}

impl UserService {
    pub fn new(
        users: Arc<dyn IdentityDirectory>,
        linker: AnonymousLinker,
        jwt: JwtValidator,
    ) -> Self {
        Self { users, linker, jwt }
    }

    pub fn jwt(&self) -> &JwtValidator {
        &self.jwt
    }

    async fn find(&self, id: &str) -> Result<User> {
        self.users
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| ReporterError::not_found(USER_NOT_FOUND))
    }

    async fn insert_new(
        &self,
        name: String,
        email: String,
        password: &str,
        role: Role,
    ) -> Result<User> {
        if self.users.find_user_by_email(&email).await?.is_some() {
            return Err(ReporterError::Conflict(EMAIL_TAKEN.into()));
        }
        let at = now();
        let user = User {
            id: new_id(),
            name,
            email,
            password_hash: hash_password(password)?,
            role,
            created_at: at,
            updated_at: at,
        };
        self.users.insert_user(&user).await.map_err(|e| match e {
            ReporterError::Conflict(_) => ReporterError::Conflict(EMAIL_TAKEN.into()),
            other => other,
        })?;
        Ok(user)
    }

    /// Create an account. The very first account is an admin.
    pub async fn register(&self, req: &RegisterRequest) -> Result<AuthOutcome> {
        let name = validate_name(req.name.as_deref().unwrap_or_default())?;
        let email = validate_email(req.email.as_deref().unwrap_or_default())?;
        let password = req.password.as_deref().unwrap_or_default().trim();
        validate_password(password)?;

        // Two racing first registrations can both see zero; both become admin.
        let role = if self.users.count_users().await? == 0 {
            Role::Admin
        } else {
            Role::User
        };
        let user = self.insert_new(name, email, password, role).await?;
        info!(user_id = %user.id, role = %user.role, "User registered");

        let linked_incidents = self.linker.link(&user.email, &user.id).await;
        let token = self.jwt.generate_token(&user)?;
        Ok(AuthOutcome {
            user: UserView::from(&user),
            token,
            linked_incidents,
        })
    }

    /// Check credentials, link any waiting anonymous reports, issue a token
    pub async fn login(&self, req: &LoginRequest) -> Result<AuthOutcome> {
        let email = req.email.as_deref().unwrap_or_default().trim().to_lowercase();
        let password = req.password.as_deref().unwrap_or_default().trim();
        if email.is_empty() || password.is_empty() {
            return Err(ReporterError::validation("Email and password are required"));
        }

        let Some(user) = self.users.find_user_by_email(&email).await? else {
            return Err(ReporterError::Unauthorized(INVALID_CREDENTIALS.into()));
        };
        let matches = verify_password(password, &user.password_hash).unwrap_or_else(|e| {
            warn!(user_id = %user.id, error = %e, "Unreadable password hash");
            false
        });
        if !matches {
            return Err(ReporterError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
        info!(user_id = %user.id, "User logged in");

        let linked_incidents = self.linker.link(&user.email, &user.id).await;
        let token = self.jwt.generate_token(&user)?;
        Ok(AuthOutcome {
            user: UserView::from(&user),
            token,
            linked_incidents,
        })
    }

    pub async fn me(&self, caller_id: &str) -> Result<UserView> {
        Ok(UserView::from(&self.find(caller_id).await?))
    }

    /// Admin-only, oldest first
    pub async fn list_users(&self, caller_id: &str) -> Result<Vec<UserView>> {
        require_user_admin(&Actor::from(&self.find(caller_id).await?))?;
        Ok(self.users.list_users().await?.iter().map(UserView::from).collect())
    }

    /// Admin-only role change; keeps `is_admin` in step with the role
    pub async fn set_role(
        &self,
        caller_id: &str,
        target_id: &str,
        role: Option<&str>,
    ) -> Result<UserView> {
        require_user_admin(&Actor::from(&self.find(caller_id).await?))?;
        self.find(target_id).await?;
        let role: Role = role.unwrap_or_default().parse()?;

        let user = self
            .users
            .set_role(target_id, role, now())
            .await?
            .ok_or_else(|| ReporterError::not_found(USER_NOT_FOUND))?;
        info!(user_id = %target_id, by = %caller_id, role = %role, "Role changed");
        Ok(UserView::from(&user))
    }

    /// Create an admin directly; for the management CLI
    pub async fn create_admin(&self, name: &str, email: &str, password: &str) -> Result<UserView> {
        let name = validate_name(name)?;
        let email = validate_email(email)?;
        validate_password(password)?;

        let user = self.insert_new(name, email, password, Role::Admin).await?;
        info!(user_id = %user.id, "Admin created");
        Ok(UserView::from(&user))
    }

    pub async fn count(&self) -> Result<u64> {
        self.users.count_users().await
    }

    /// Every user, for the management CLI
    pub async fn all_users(&self) -> Result<Vec<UserView>> {
        Ok(self.users.list_users().await?.iter().map(UserView::from).collect())
    }
}
