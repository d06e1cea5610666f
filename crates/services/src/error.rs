//! Shared error types for the services crate.

use thiserror::Error;

use cube_core::model::{AccountError, StageSlot, UserId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("unknown user {0}")]
    UnknownUser(UserId),
    #[error("no stage at slot {0}")]
    UnknownStage(StageSlot),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AccountService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AccountServiceError {
    #[error(transparent)]
    Credentials(#[from] AccountError),
    #[error("a user named {0:?} already exists")]
    UsernameTaken(String),
    #[error("user {0:?} not found")]
    UnknownUser(String),
    #[error("wrong password")]
    WrongPassword,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
