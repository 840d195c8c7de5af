//! User service.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use quickpoll_common::{AppError, AppResult, Config, IdGenerator};
use quickpoll_db::{SharedUserStore, entities::User};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// User service for accounts and sessions.
#[derive(Clone)]
pub struct UserService {
    store: SharedUserStore,
    id_gen: IdGenerator,
    secret: String,
    token_ttl_secs: i64,
}

/// Input for registering a new user.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 128))]
    pub username: String,

    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Public view of a user account. Never carries the password hash.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            created_at: user.created_at,
        }
    }
}

/// An authenticated session: the user plus a signed token.
#[derive(Debug, Serialize)]
pub struct AuthSession {
    pub user: UserView,
    pub token: String,
}

/// Session token claims.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    username: String,
    iat: i64,
    exp: i64,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub fn new(store: SharedUserStore, config: &Config) -> Self {
        Self {
            store,
            id_gen: IdGenerator::new(),
            secret: config.auth.secret.clone(),
            token_ttl_secs: config.auth.token_ttl_secs,
        }
    }

    /// Register a new account and sign it in directly.
    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthSession> {
        input.validate()?;

        if self
            .store
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "Username \"{}\" is already taken",
                input.username
            )));
        }

        let user = User {
            id: self.id_gen.generate(),
            username: input.username,
            password_hash: hash_password(&input.password)?,
            created_at: Utc::now(),
        };
        let user = self.store.insert(user).await?;
        tracing::debug!(user_id = %user.id, "Registered user");

        self.session(user)
    }

    /// Authenticate with username and password.
    ///
    /// An unknown username and a wrong password fail identically.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<AuthSession> {
        let Some(user) = self.store.find_by_username(username).await? else {
            return Err(AppError::Unauthorized);
        };
        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        self.session(user)
    }

    /// Resolve a session token back to its user.
    ///
    /// Returns `None` for malformed, expired, or revoked tokens. A token is
    /// revoked once its account no longer exists.
    pub async fn verify_token(&self, token: &str) -> AppResult<Option<UserView>> {
        let validation = Validation::default();
        let Ok(data) = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        ) else {
            return Ok(None);
        };

        Ok(self
            .store
            .find_by_id(&data.claims.sub)
            .await?
            .map(UserView::from))
    }

    fn session(&self, user: User) -> AppResult<AuthSession> {
        let token = self.issue_token(&user)?;
        Ok(AuthSession {
            user: user.into(),
            token,
        })
    }

    fn issue_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            iat: now,
            exp: now + self.token_ttl_secs,
        };

        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }
}

/// Hash a password with Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use quickpoll_common::config::{AuthConfig, ServerConfig};
    use quickpoll_db::MemoryUserStore;
    use std::sync::Arc;

    fn test_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 4000,
            },
            auth: AuthConfig {
                secret: "test-secret".to_string(),
                token_ttl_secs: 3600,
            },
        }
    }

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryUserStore::new()), &test_config())
    }

    fn register_input(username: &str, password: &str) -> RegisterInput {
        RegisterInput {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_hash_password() {
        let hash = hash_password("test_password").unwrap();
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn test_verify_password_correct() {
        let hash = hash_password("test_password").unwrap();
        assert!(verify_password("test_password", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_incorrect() {
        let hash = hash_password("test_password").unwrap();
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("test", "invalid_hash").is_err());
    }

    #[tokio::test]
    async fn test_register_rejects_missing_params() {
        let service = service();

        let result = service.register(RegisterInput::default()).await;
        assert!(matches!(result, Err(AppError::WrongParams(_))));

        let result = service.register(register_input("adrien", "")).await;
        assert!(matches!(result, Err(AppError::WrongParams(_))));

        let result = service.register(register_input("", "test")).await;
        assert!(matches!(result, Err(AppError::WrongParams(_))));
    }

    #[tokio::test]
    async fn test_register_returns_session_without_hash() {
        let service = service();
        let session = service
            .register(register_input("adrien", "test"))
            .await
            .unwrap();

        assert!(!session.user.id.is_empty());
        assert_eq!(session.user.username, "adrien");
        assert!(!session.token.is_empty());

        let json = serde_json::to_value(&session).unwrap();
        assert!(json["user"].get("passwordHash").is_none());
        assert!(json["user"].get("hash").is_none());
    }

    #[tokio::test]
    async fn test_register_rejects_taken_username() {
        let service = service();
        service
            .register(register_input("adrien", "test"))
            .await
            .unwrap();

        let result = service.register(register_input("adrien", "testtest")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_authenticate_round_trip() {
        let service = service();
        service
            .register(register_input("adrien", "test"))
            .await
            .unwrap();

        let session = service.authenticate("adrien", "test").await.unwrap();
        let verified = service.verify_token(&session.token).await.unwrap();
        assert_eq!(verified.unwrap().username, "adrien");
    }

    #[tokio::test]
    async fn test_authenticate_wrong_credentials() {
        let service = service();
        service
            .register(register_input("adrien", "test"))
            .await
            .unwrap();

        let result = service.authenticate("adrien", "wrong").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));

        let result = service.authenticate("nobody", "test").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_verify_token_garbage_is_none() {
        let service = service();
        let verified = service.verify_token("not-a-token").await.unwrap();
        assert!(verified.is_none());
    }

    #[tokio::test]
    async fn test_verify_token_revoked_when_user_gone() {
        // same secret, different (empty) store: the account behind the
        // token no longer exists
        let issuing = service();
        let session = issuing
            .register(register_input("adrien", "test"))
            .await
            .unwrap();

        let other = service();
        let verified = other.verify_token(&session.token).await.unwrap();
        assert!(verified.is_none());
    }
}
