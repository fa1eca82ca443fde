//! Authentication and authorization
//!
//! - [`password`]: argon2id hashing
//! - [`jwt`]: session tokens
//! - [`permissions`]: owner/admin policy

pub mod jwt;
pub mod password;
pub mod permissions;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenValidationResult};
pub use password::{hash_password, verify_password};
pub use permissions::{
    can_change_status, can_manage_users, can_modify, require_modify, require_status_change,
    require_user_admin,
};
