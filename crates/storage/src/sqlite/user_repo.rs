use cube_core::model::UserId;

use super::SqliteRepository;
use super::mapping::{map_user_row, revision_to_i64, user_id_from_i64, user_id_to_i64};
use crate::repository::{NewUserRecord, StorageError, UserRecord, UserRepository};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

const SELECT_USER: &str = r"
    SELECT id, username, password_hash, stages_progress, statistic, revision, created_at
    FROM users
";

const UPDATE_STAGES_PROGRESS: &str = r"
    UPDATE users
    SET stages_progress = ?1, revision = revision + 1
    WHERE id = ?2 AND revision = ?3
";

const UPDATE_STATISTIC: &str = r"
    UPDATE users
    SET statistic = ?1, revision = revision + 1
    WHERE id = ?2 AND revision = ?3
";

impl SqliteRepository {
    async fn conditional_update(
        &self,
        sql: &'static str,
        id: UserId,
        expected_revision: u64,
        value: &str,
    ) -> Result<u64, StorageError> {
        let id_value = user_id_to_i64(id)?;
        let res = sqlx::query(sql)
            .bind(value)
            .bind(id_value)
            .bind(revision_to_i64(expected_revision)?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 1 {
            return Ok(expected_revision + 1);
        }

        // Nothing matched: either the row moved on or it never existed.
        let exists = sqlx::query("SELECT 1 FROM users WHERE id = ?1")
            .bind(id_value)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        if exists.is_some() {
            Err(StorageError::Conflict)
        } else {
            Err(StorageError::NotFound)
        }
    }
}

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn create_user(&self, user: NewUserRecord) -> Result<UserRecord, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO users (username, password_hash, stages_progress, statistic, revision, created_at)
            VALUES (?1, ?2, ?3, ?4, 0, ?5)
            ",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.stages_progress)
        .bind(&user.statistic)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => StorageError::Conflict,
            _ => conn(&e),
        })?;

        Ok(UserRecord {
            id: user_id_from_i64(res.last_insert_rowid())?,
            username: user.username,
            password_hash: user.password_hash,
            stages_progress: Some(user.stages_progress),
            statistic: Some(user.statistic),
            revision: 0,
            created_at: user.created_at,
        })
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>, StorageError> {
        let row = sqlx::query(&format!("{SELECT_USER} WHERE id = ?1"))
            .bind(user_id_to_i64(id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_user_row).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StorageError> {
        let row = sqlx::query(&format!("{SELECT_USER} WHERE username = ?1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_user_row).transpose()
    }

    async fn update_stages_progress(
        &self,
        id: UserId,
        expected_revision: u64,
        stages_progress: &str,
    ) -> Result<u64, StorageError> {
        self.conditional_update(UPDATE_STAGES_PROGRESS, id, expected_revision, stages_progress)
            .await
    }

    async fn update_statistic(
        &self,
        id: UserId,
        expected_revision: u64,
        statistic: &str,
    ) -> Result<u64, StorageError> {
        self.conditional_update(UPDATE_STATISTIC, id, expected_revision, statistic)
            .await
    }
}
