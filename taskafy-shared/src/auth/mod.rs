/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`jwt`]: access/refresh token issuance and validation
/// - [`middleware`]: request-scoped [`middleware::AuthContext`] and bearer parsing
/// - [`authorization`]: role and task-participant checks
///
/// # Example
///
/// ```no_run
/// use taskafy_shared::auth::password::{hash_password, verify_password};
/// use taskafy_shared::auth::jwt::{create_token, Claims, TokenType};
/// use taskafy_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("kofi2024pass")?;
/// assert!(verify_password("kofi2024pass", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), UserRole::Client, TokenType::Access);
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long!")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
