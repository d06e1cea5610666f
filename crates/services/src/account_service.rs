use std::sync::Arc;

use rand::Rng;
use tracing::info;

use cube_core::document::encode_session_log;
use cube_core::model::{Credentials, PasswordHash, SessionLog, StageProgress};
use storage::repository::{NewUserRecord, StorageError, UserRecord, UserRepository};

use crate::Clock;
use crate::error::AccountServiceError;

const SALT_LEN: usize = 16;

/// Registration and sign-in against the user records.
#[derive(Clone)]
pub struct AccountService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
}

impl AccountService {
    #[must_use]
    pub fn new(clock: Clock, users: Arc<dyn UserRepository>) -> Self {
        Self { clock, users }
    }

    /// Create an account with all-pending progress and a seeded empty week of statistics.
    ///
    /// # Errors
    ///
    /// Returns `AccountServiceError::Credentials` if validation fails,
    /// `AccountServiceError::UsernameTaken` if the name exists, or
    /// `AccountServiceError::Storage` on persistence failures.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserRecord, AccountServiceError> {
        let credentials = Credentials::for_registration(username, password)?;
        if self
            .users
            .find_by_username(credentials.username())
            .await?
            .is_some()
        {
            return Err(AccountServiceError::UsernameTaken(
                credentials.username().to_string(),
            ));
        }

        let hash = PasswordHash::derive(credentials.password(), &fresh_salt());
        let new_user = NewUserRecord {
            username: credentials.username().to_string(),
            password_hash: hash.encode(),
            stages_progress: StageProgress::initial().encode(),
            statistic: encode_session_log(&SessionLog::seeded_week(self.clock.today())),
            created_at: self.clock.now(),
        };

        let record = self
            .users
            .create_user(new_user)
            .await
            .map_err(|err| match err {
                StorageError::Conflict => {
                    AccountServiceError::UsernameTaken(credentials.username().to_string())
                }
                other => other.into(),
            })?;

        info!(user = %record.id, username = %record.username, "registered account");
        Ok(record)
    }

    /// Verify credentials and return the matching record.
    ///
    /// # Errors
    ///
    /// Returns `AccountServiceError::UnknownUser` or `AccountServiceError::WrongPassword`
    /// when the credentials do not match, or other errors on storage failures.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserRecord, AccountServiceError> {
        let credentials = Credentials::for_login(username, password)?;
        let record = self.lookup(credentials.username()).await?;

        let hash: PasswordHash = record.password_hash.parse()?;
        if !hash.verify(credentials.password()) {
            return Err(AccountServiceError::WrongPassword);
        }
        Ok(record)
    }

    /// Find a record by username without checking the password.
    ///
    /// # Errors
    ///
    /// Returns `AccountServiceError::UnknownUser` if no such user exists.
    pub async fn lookup(&self, username: &str) -> Result<UserRecord, AccountServiceError> {
        let username = username.trim();
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| AccountServiceError::UnknownUser(username.to_string()))
    }
}

fn fresh_salt() -> [u8; SALT_LEN] {
    rand::rng().random()
}
