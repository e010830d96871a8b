/// Role and resource checks
///
/// Access rules are expressed against an [`AuthContext`]:
///
/// 1. **Role**: some endpoints are restricted to clients, taskers, or admins
/// 2. **Participation**: task resources are visible to the task's client and
///    its assigned tasker
/// 3. **Ownership**: single-owner resources (notifications, schedules)
///
/// # Example
///
/// ```
/// use taskafy_shared::auth::authorization::{require_participant, require_role};
/// use taskafy_shared::auth::middleware::AuthContext;
/// use taskafy_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// let client = Uuid::new_v4();
/// let auth = AuthContext::new(client, UserRole::Client);
///
/// assert!(require_role(&auth, &[UserRole::Client]).is_ok());
/// assert!(require_role(&auth, &[UserRole::Tasker]).is_err());
/// assert!(require_participant(&auth, client, None).is_ok());
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::user::UserRole;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Caller's role is not allowed
    #[error("Only {0} can perform this action")]
    RoleRequired(String),

    /// Caller doesn't own or participate in the resource
    #[error("Not authorized to access this resource")]
    NotAuthorized,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Requires the caller to hold one of `allowed`
pub fn require_role(auth: &AuthContext, allowed: &[UserRole]) -> Result<(), AuthzError> {
    if allowed.contains(&auth.role) {
        return Ok(());
    }

    let names: Vec<String> = allowed.iter().map(|r| format!("{}s", r.as_str())).collect();
    Err(AuthzError::RoleRequired(names.join(" or ")))
}

/// Requires the admin role
pub fn require_admin(auth: &AuthContext) -> Result<(), AuthzError> {
    require_role(auth, &[UserRole::Admin])
}

/// Requires the caller to be the task's client or its assigned tasker
pub fn require_participant(
    auth: &AuthContext,
    client_id: Uuid,
    assigned_tasker_id: Option<Uuid>,
) -> Result<(), AuthzError> {
    if auth.user_id == client_id || assigned_tasker_id == Some(auth.user_id) {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}

/// Requires the caller to own a resource
pub fn require_ownership(auth: &AuthContext, owner_id: Uuid) -> Result<(), AuthzError> {
    if auth.user_id == owner_id {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_role() {
        let tasker = AuthContext::new(Uuid::new_v4(), UserRole::Tasker);

        assert!(require_role(&tasker, &[UserRole::Tasker]).is_ok());
        assert!(require_role(&tasker, &[UserRole::Client, UserRole::Tasker]).is_ok());

        let err = require_role(&tasker, &[UserRole::Client]).unwrap_err();
        assert_eq!(err.to_string(), "Only clients can perform this action");
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&AuthContext::new(Uuid::new_v4(), UserRole::Admin)).is_ok());
        assert!(matches!(
            require_admin(&AuthContext::new(Uuid::new_v4(), UserRole::Client)),
            Err(AuthzError::RoleRequired(_))
        ));
    }

    #[test]
    fn test_require_participant() {
        let client_id = Uuid::new_v4();
        let tasker_id = Uuid::new_v4();

        let client = AuthContext::new(client_id, UserRole::Client);
        let tasker = AuthContext::new(tasker_id, UserRole::Tasker);
        let stranger = AuthContext::new(Uuid::new_v4(), UserRole::Tasker);

        assert!(require_participant(&client, client_id, Some(tasker_id)).is_ok());
        assert!(require_participant(&tasker, client_id, Some(tasker_id)).is_ok());
        assert!(require_participant(&stranger, client_id, Some(tasker_id)).is_err());
        assert!(require_participant(&tasker, client_id, None).is_err());
    }

    #[test]
    fn test_require_ownership() {
        let owner = Uuid::new_v4();
        let auth = AuthContext::new(owner, UserRole::Client);

        assert!(require_ownership(&auth, owner).is_ok());
        assert!(matches!(
            require_ownership(&auth, Uuid::new_v4()),
            Err(AuthzError::NotAuthorized)
        ));
    }
}
