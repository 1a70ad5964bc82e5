use serde::Serialize;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::{Error, PasswordHasher, Result, TokenIssuer};
use taskboard_core::{validation, Store, User};

/// A signed-in user and the bearer token that identifies them.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user: User,
    pub token: String,
    pub expires_in: i64,
}

/// Verified against when an email is unknown, so both failures cost one hash.
const DECOY_PASSWORD: &str = "taskboard-decoy-password";

#[derive(Clone)]
pub struct Accounts {
    store: Arc<dyn Store>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
    dummy_hash: Arc<OnceCell<String>>,
}

impl Accounts {
    pub fn new(store: Arc<dyn Store>, tokens: TokenIssuer) -> Self {
        Self {
            store,
            hasher: PasswordHasher::new(),
            tokens,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Argon2 is CPU bound; it runs on the blocking pool, off the runtime workers.
    async fn blocking<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(PasswordHasher) -> T + Send + 'static,
        T: Send + 'static,
    {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || work(hasher))
            .await
            .map_err(|e| Error::Hashing(format!("hashing task failed: {}", e)))
    }

    async fn dummy_hash(&self) -> Result<String> {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| async { self.blocking(|h| h.hash(DECOY_PASSWORD)).await? })
            .await?;
        Ok(hash.clone())
    }

    fn session(&self, user: User) -> Result<Session> {
        let token = self.tokens.issue(&user)?;
        Ok(Session {
            user,
            token,
            expires_in: self.tokens.ttl().num_seconds(),
        })
    }

    pub async fn sign_up(&self, email: &str, display_name: &str, password: &str) -> Result<Session> {
        let email = validation::email(email)?;
        let display_name = validation::name("display_name", display_name)?;
        let password = password.to_string();
        let password_hash = self.blocking(move |h| h.hash(&password)).await??;

        let user = User::new(&email, display_name, password_hash);
        self.store.create_user(&user).await?;

        tracing::info!("Registered user {} ({})", user.email, user.id);
        self.session(user)
    }

    /// Unknown email and wrong password fail identically.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let user = self.store.find_user_by_email(email).await?;
        let stored_hash = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.dummy_hash().await?,
        };

        let password = password.to_string();
        let verified = self.blocking(move |h| h.verify(&password, &stored_hash)).await?;

        match user {
            Some(user) if verified => self.session(user),
            Some(user) => {
                tracing::warn!("Failed sign-in for {}", user.email);
                Err(Error::InvalidCredentials)
            }
            None => Err(Error::InvalidCredentials),
        }
    }

    /// Round-trips a token for a throwaway user to prove the signing keys work.
    pub fn self_check(&self) -> Result<()> {
        let canary = User::new("health@taskboard.local", "health".to_string(), String::new());
        let token = self.tokens.issue(&canary)?;
        let claims = self.tokens.verify(&token)?;
        if claims.sub != canary.id {
            return Err(Error::InvalidToken("token round-trip mismatch".to_string()));
        }
        Ok(())
    }

    /// Resolves a bearer token to a live user.
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let claims = self.tokens.verify(token)?;
        self.store
            .get_user(claims.sub)
            .await?
            .ok_or_else(|| Error::InvalidToken("user no longer exists".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use taskboard_core::MemoryStore;

    fn accounts() -> Accounts {
        Accounts::new(
            Arc::new(MemoryStore::new()),
            TokenIssuer::new("test-secret", Duration::hours(1)),
        )
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let accounts = accounts();
        let session = accounts
            .sign_up("Grace@Example.com", "Grace", "hopper-1906")
            .await
            .unwrap();
        assert_eq!(session.user.email, "grace@example.com");
        assert_eq!(session.expires_in, 3600);

        let again = accounts.sign_in("grace@example.com", "hopper-1906").await.unwrap();
        assert_eq!(again.user.id, session.user.id);

        let user = accounts.authenticate(&again.token).await.unwrap();
        assert_eq!(user.id, session.user.id);
    }

    #[test]
    fn test_self_check() {
        assert!(accounts().self_check().is_ok());
    }

    #[tokio::test]
    async fn test_bad_credentials_look_the_same() {
        let accounts = accounts();
        accounts
            .sign_up("ada@example.com", "Ada", "analytical")
            .await
            .unwrap();

        let wrong_password = accounts.sign_in("ada@example.com", "difference").await.unwrap_err();
        let unknown_email = accounts.sign_in("nobody@example.com", "analytical").await.unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_unknown_email_still_verifies_a_hash() {
        let accounts = accounts();
        assert!(!accounts.dummy_hash.initialized());

        let err = accounts.sign_in("ghost@example.com", "whatever-1").await.unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials));
        assert!(accounts.dummy_hash.initialized());
    }

    #[tokio::test]
    async fn test_hashing_runs_off_the_runtime_thread() {
        let accounts = accounts();
        let caller = std::thread::current().id();
        let worker = accounts
            .blocking(|_| std::thread::current().id())
            .await
            .unwrap();
        assert_ne!(caller, worker);
    }

    #[tokio::test]
    async fn test_duplicate_sign_up_conflicts() {
        let accounts = accounts();
        accounts.sign_up("dup@example.com", "One", "password-1").await.unwrap();

        let err = accounts
            .sign_up("DUP@example.com", "Two", "password-2")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Core(taskboard_core::Error::Conflict(_))));
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let err = accounts()
            .sign_up("not-an-email", "X", "password-1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Core(taskboard_core::Error::Validation(_))));
    }
}
