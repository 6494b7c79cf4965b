use crate::{
    auth::password::{hash_password, verify_password},
    db::DbPool,
    entities::user::Model as UserModel,
    errors::ServiceError,
    repositories::{user_repository::NewUser, UserRepository},
};
use metrics::counter;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Validated registration input; `password` is still plain text here
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegisterOutcome {
    Registered(UserModel),
    UsernameTaken,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Authenticated(UserModel),
    UnknownUser,
    InvalidPassword,
}

/// Staff account registration and credential checks
#[derive(Debug, Clone)]
pub struct AccountService {
    users: UserRepository,
}

async fn run_blocking<T, F>(f: F) -> Result<T, ServiceError>
where
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServiceError::InternalError(format!("hashing task failed: {}", e)))?
}

impl AccountService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self {
            users: UserRepository::new(db),
        }
    }

    /// Creates the account unless the username is already in use
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(
        &self,
        registration: Registration,
    ) -> Result<RegisterOutcome, ServiceError> {
        if self.users.username_exists(&registration.username).await? {
            counter!("foodcourt_auth.register", 1, "outcome" => "username_taken");
            info!("registration refused, username taken");
            return Ok(RegisterOutcome::UsernameTaken);
        }

        let Registration {
            name,
            email,
            username,
            password,
        } = registration;
        let password_hash = run_blocking(move || Ok(hash_password(&password)?)).await?;

        let user = self
            .users
            .create(NewUser {
                name,
                email,
                username,
                password_hash,
            })
            .await?;

        counter!("foodcourt_auth.register", 1, "outcome" => "registered");
        info!(user_id = user.id, "user registered");
        Ok(RegisterOutcome::Registered(user))
    }

    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome, ServiceError> {
        let Some(user) = self.users.find_by_username(username).await? else {
            counter!("foodcourt_auth.login", 1, "outcome" => "unknown_user");
            return Ok(LoginOutcome::UnknownUser);
        };

        let candidate = password.to_string();
        let stored = user.password.clone();
        let matches = run_blocking(move || Ok(verify_password(&candidate, &stored)?)).await?;

        if matches {
            counter!("foodcourt_auth.login", 1, "outcome" => "success");
            info!(user_id = user.id, "login succeeded");
            Ok(LoginOutcome::Authenticated(user))
        } else {
            counter!("foodcourt_auth.login", 1, "outcome" => "invalid_password");
            warn!("login failed, password mismatch");
            Ok(LoginOutcome::InvalidPassword)
        }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<UserModel>, ServiceError> {
        self.users.find_by_username(username).await
    }

    pub async fn user_count(&self) -> Result<u64, ServiceError> {
        self.users.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use assert_matches::assert_matches;

    async fn service() -> AccountService {
        let pool = establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Default::default()
        })
        .await
        .unwrap();
        run_migrations(&pool).await.unwrap();
        AccountService::new(Arc::new(pool))
    }

    fn alice(password: &str) -> Registration {
        Registration {
            name: "Alice".into(),
            email: "alice@x.com".into(),
            username: "alice".into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn register_then_authenticate() {
        let accounts = service().await;
        let registered = accounts.register(alice("secret1")).await.unwrap();
        assert_matches!(registered, RegisterOutcome::Registered(ref u) if u.username == "alice");

        assert_matches!(
            accounts.authenticate("alice", "secret1").await.unwrap(),
            LoginOutcome::Authenticated(_)
        );
        assert_eq!(
            accounts.authenticate("alice", "wrongpw").await.unwrap(),
            LoginOutcome::InvalidPassword
        );
        assert_eq!(
            accounts.authenticate("bob", "anything").await.unwrap(),
            LoginOutcome::UnknownUser
        );
    }

    #[tokio::test]
    async fn duplicate_username_keeps_original_hash() {
        let accounts = service().await;
        accounts.register(alice("secret1")).await.unwrap();
        let before = accounts.find_by_username("alice").await.unwrap().unwrap();

        assert_eq!(
            accounts.register(alice("other-pw")).await.unwrap(),
            RegisterOutcome::UsernameTaken
        );

        let after = accounts.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(before.password, after.password);
        assert_eq!(accounts.user_count().await.unwrap(), 1);
    }
}
