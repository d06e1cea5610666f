use cube_core::model::UserId;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{StorageError, UserRecord};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    u64::try_from(v)
        .map(UserId::new)
        .map_err(|_| StorageError::Serialization("user_id sign overflow".into()))
}

pub(crate) fn user_id_to_i64(id: UserId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("user_id overflow".into()))
}

pub(crate) fn revision_to_i64(revision: u64) -> Result<i64, StorageError> {
    i64::try_from(revision).map_err(|_| StorageError::Serialization("revision overflow".into()))
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<UserRecord, StorageError> {
    let revision: i64 = row.try_get("revision").map_err(ser)?;
    Ok(UserRecord {
        id: user_id_from_i64(row.try_get("id").map_err(ser)?)?,
        username: row.try_get("username").map_err(ser)?,
        password_hash: row.try_get("password_hash").map_err(ser)?,
        stages_progress: row.try_get("stages_progress").map_err(ser)?,
        statistic: row.try_get("statistic").map_err(ser)?,
        revision: u64::try_from(revision)
            .map_err(|_| StorageError::Serialization("revision sign overflow".into()))?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}
