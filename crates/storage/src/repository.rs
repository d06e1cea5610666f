use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cube_core::model::UserId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of a user record.
///
/// `stages_progress` and `statistic` are kept as the raw stored text; decoding
/// happens in the services layer so a malformed field never fails a read.
/// `revision` increases on every field update and guards conditional writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub stages_progress: Option<String>,
    pub statistic: Option<String>,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
}

/// Insert shape for a user record; the repository assigns the id.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub username: String,
    pub password_hash: String,
    pub stages_progress: String,
    pub statistic: String,
    pub created_at: DateTime<Utc>,
}

/// Repository contract for user records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user and return the stored record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the username is taken, or other storage errors.
    async fn create_user(&self, user: NewUserRecord) -> Result<UserRecord, StorageError>;

    /// Fetch a user by ID. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>, StorageError>;

    /// Fetch a user by exact username. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StorageError>;

    /// Replace the progress bitstring if the record is still at `expected_revision`.
    ///
    /// Returns the new revision.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the revision moved, `StorageError::NotFound`
    /// if the user does not exist, or other storage errors.
    async fn update_stages_progress(
        &self,
        id: UserId,
        expected_revision: u64,
        stages_progress: &str,
    ) -> Result<u64, StorageError>;

    /// Replace the statistic document if the record is still at `expected_revision`.
    ///
    /// Returns the new revision.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the revision moved, `StorageError::NotFound`
    /// if the user does not exist, or other storage errors.
    async fn update_statistic(
        &self,
        id: UserId,
        expected_revision: u64,
        statistic: &str,
    ) -> Result<u64, StorageError>;
}

#[derive(Default)]
struct InMemoryUsers {
    next_id: u64,
    users: HashMap<UserId, UserRecord>,
}

impl InMemoryUsers {
    fn update(
        &mut self,
        id: UserId,
        expected_revision: u64,
        apply: impl FnOnce(&mut UserRecord),
    ) -> Result<u64, StorageError> {
        let record = self.users.get_mut(&id).ok_or(StorageError::NotFound)?;
        if record.revision != expected_revision {
            return Err(StorageError::Conflict);
        }
        apply(record);
        record.revision += 1;
        Ok(record.revision)
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    users: Arc<Mutex<InMemoryUsers>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_users<T>(
        &self,
        f: impl FnOnce(&mut InMemoryUsers) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        f(&mut guard)
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn create_user(&self, user: NewUserRecord) -> Result<UserRecord, StorageError> {
        self.with_users(|state| {
            if state.users.values().any(|u| u.username == user.username) {
                return Err(StorageError::Conflict);
            }
            state.next_id += 1;
            let record = UserRecord {
                id: UserId::new(state.next_id),
                username: user.username,
                password_hash: user.password_hash,
                stages_progress: Some(user.stages_progress),
                statistic: Some(user.statistic),
                revision: 0,
                created_at: user.created_at,
            };
            state.users.insert(record.id, record.clone());
            Ok(record)
        })
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>, StorageError> {
        self.with_users(|state| Ok(state.users.get(&id).cloned()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StorageError> {
        self.with_users(|state| {
            Ok(state
                .users
                .values()
                .find(|u| u.username == username)
                .cloned())
        })
    }

    async fn update_stages_progress(
        &self,
        id: UserId,
        expected_revision: u64,
        stages_progress: &str,
    ) -> Result<u64, StorageError> {
        self.with_users(|state| {
            state.update(id, expected_revision, |record| {
                record.stages_progress = Some(stages_progress.to_string());
            })
        })
    }

    async fn update_statistic(
        &self,
        id: UserId,
        expected_revision: u64,
        statistic: &str,
    ) -> Result<u64, StorageError> {
        self.with_users(|state| {
            state.update(id, expected_revision, |record| {
                record.statistic = Some(statistic.to_string());
            })
        })
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let users: Arc<dyn UserRepository> = Arc::new(InMemoryRepository::new());
        Self { users }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cube_core::time::fixed_now;

    fn new_user(name: &str) -> NewUserRecord {
        NewUserRecord {
            username: name.to_string(),
            password_hash: "00$00".to_string(),
            stages_progress: "00000000".to_string(),
            statistic: String::new(),
            created_at: fixed_now(),
        }
    }

    #[tokio::test]
    async fn creates_and_finds_users() {
        let repo = InMemoryRepository::new();
        let created = repo.create_user(new_user("alice")).await.unwrap();
        assert_eq!(created.revision, 0);

        let by_id = repo.get_user(created.id).await.unwrap().unwrap();
        let by_name = repo.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_id, created);
        assert_eq!(by_name, created);
        assert!(repo.find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let repo = InMemoryRepository::new();
        repo.create_user(new_user("alice")).await.unwrap();
        let err = repo.create_user(new_user("alice")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn stale_revision_is_rejected() {
        let repo = InMemoryRepository::new();
        let user = repo.create_user(new_user("alice")).await.unwrap();

        let revision = repo
            .update_stages_progress(user.id, 0, "10000000")
            .await
            .unwrap();
        assert_eq!(revision, 1);

        let err = repo.update_statistic(user.id, 0, "{}").await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        let stored = repo.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(stored.stages_progress.as_deref(), Some("10000000"));
        assert_eq!(stored.statistic.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn updating_missing_user_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo
            .update_statistic(UserId::new(9), 0, "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
