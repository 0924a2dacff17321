//! engine::gate
//!
//! Authorization Gate: may the acting identity push to the repository?
//!
//! # Invariants
//!
//! - The permission is queried on every mutating run; nothing is cached
//! - The triggering event alone never grants anything
//! - Fails closed: any error while asking counts as "not authorized"

use tracing::{info, warn};

use crate::forge::Forge;

/// Result of the permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationDecision {
    /// Who asked
    pub login: String,
    pub can_push: bool,
    /// Permission level reported by the forge, when the query succeeded
    pub level: Option<String>,
    /// Why the query failed, when it did
    pub error: Option<String>,
}

/// Ask the forge whether `login` may push.
pub async fn authorize(forge: &dyn Forge, login: &str) -> AuthorizationDecision {
    match forge.permission(login).await {
        Ok(permission) => {
            info!(login, level = %permission.level, can_push = permission.can_push, "permission");
            AuthorizationDecision {
                login: login.to_string(),
                can_push: permission.can_push,
                level: Some(permission.level),
                error: None,
            }
        }
        Err(e) => {
            warn!(login, error = %e, "permission query failed; treating as denied");
            AuthorizationDecision {
                login: login.to_string(),
                can_push: false,
                level: None,
                error: Some(e.to_string()),
            }
        }
    }
}
