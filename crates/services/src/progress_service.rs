use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use cube_core::document::DocumentError;
use cube_core::model::{self, CatalogEntry, StageProgress, StageSlot, StageStatus, UserId};
use cube_core::stats::{self, ChartSeries};
use storage::repository::{StorageError, UserRecord, UserRepository};

use crate::Clock;
use crate::error::ProgressServiceError;

/// Attempts per read-modify-write before a revision conflict is surfaced.
const MAX_WRITE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy)]
enum Field {
    StagesProgress,
    Statistic,
}

/// One catalog row: the static entry plus the user's status, if signed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub entry: &'static CatalogEntry,
    pub status: Option<StageStatus>,
}

/// Home-screen data: catalog rows and the weekly chart.
///
/// Guests get rows without status and no chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogView {
    pub items: Vec<CatalogItem>,
    pub chart: Option<ChartSeries>,
}

/// Records stage visits and completions against the user record.
///
/// Every mutation is a read-modify-write of one text field, guarded by the
/// record revision and retried a bounded number of times on conflict.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, users: Arc<dyn UserRepository>) -> Self {
        Self { clock, users }
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::new(
            clock,
            Arc::new(storage::repository::InMemoryRepository::new()),
        )
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Record that the user opened `stage` today.
    ///
    /// An unreadable statistic document is replaced by a fresh log.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::UnknownStage` if `stage` is not in the catalog,
    /// `ProgressServiceError::UnknownUser` if the user does not exist, or
    /// `ProgressServiceError::Storage` if reads/writes fail or conflicts persist.
    pub async fn record_visit(
        &self,
        user: UserId,
        stage: StageSlot,
    ) -> Result<(), ProgressServiceError> {
        ensure_in_catalog(stage)?;
        let today = self.today();
        self.read_modify_write(user, Field::Statistic, |record| {
            let update = stats::apply_visit(
                record.statistic.as_deref().unwrap_or_default(),
                stage,
                today,
            );
            match &update.reset {
                None | Some(DocumentError::Empty) => {}
                Some(reason) => warn!(
                    user = %record.id,
                    %reason,
                    "statistic document unreadable; starting a fresh log"
                ),
            }
            ((), Some(update.document))
        })
        .await
    }

    /// Mark `slot` as completed and return the resulting progress.
    ///
    /// Nothing is written when the slot is already completed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::UnknownStage` if `slot` is not in the catalog,
    /// `ProgressServiceError::UnknownUser` if the user does not exist, or
    /// `ProgressServiceError::Storage` if reads/writes fail or conflicts persist.
    pub async fn mark_completed(
        &self,
        user: UserId,
        slot: StageSlot,
    ) -> Result<StageProgress, ProgressServiceError> {
        ensure_in_catalog(slot)?;
        self.read_modify_write(user, Field::StagesProgress, |record| {
            let mut progress = decode_progress(record);
            if progress.mark_completed(slot) {
                let text = progress.encode();
                (progress, Some(text))
            } else {
                (progress, None)
            }
        })
        .await
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError` if the user cannot be loaded.
    pub async fn progress(&self, user: UserId) -> Result<StageProgress, ProgressServiceError> {
        let record = self.load(user).await?;
        Ok(decode_progress(&record))
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError` if the user cannot be loaded.
    pub async fn is_completed(
        &self,
        user: UserId,
        slot: StageSlot,
    ) -> Result<bool, ProgressServiceError> {
        Ok(self.progress(user).await?.is_completed(slot))
    }

    /// Distinct stages per day for the week ending today.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError` if the user cannot be loaded.
    pub async fn weekly_chart(&self, user: UserId) -> Result<ChartSeries, ProgressServiceError> {
        let today = self.today();
        let record = self.load(user).await?;
        Ok(chart_of(&record, today))
    }

    /// Catalog rows with completion status, plus the weekly chart.
    ///
    /// `None` is guest mode: no status and no chart, and storage is not touched.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError` if the user cannot be loaded.
    pub async fn catalog(&self, user: Option<UserId>) -> Result<CatalogView, ProgressServiceError> {
        let Some(user) = user else {
            let items = model::catalog()
                .iter()
                .map(|entry| CatalogItem {
                    entry,
                    status: None,
                })
                .collect();
            return Ok(CatalogView { items, chart: None });
        };

        let today = self.today();
        let record = self.load(user).await?;
        let progress = decode_progress(&record);
        let items = model::catalog()
            .iter()
            .map(|entry| CatalogItem {
                entry,
                status: Some(progress.status(entry.slot())),
            })
            .collect();

        Ok(CatalogView {
            items,
            chart: Some(chart_of(&record, today)),
        })
    }

    async fn load(&self, user: UserId) -> Result<UserRecord, ProgressServiceError> {
        self.users
            .get_user(user)
            .await?
            .ok_or(ProgressServiceError::UnknownUser(user))
    }

    /// Load the record, compute a value and an optional replacement for `field`,
    /// and write it back conditioned on the revision that was read.
    async fn read_modify_write<T, F>(
        &self,
        user: UserId,
        field: Field,
        mut compute: F,
    ) -> Result<T, ProgressServiceError>
    where
        T: Send,
        F: FnMut(&UserRecord) -> (T, Option<String>) + Send,
    {
        let mut attempt = 1;
        loop {
            let record = self.load(user).await?;
            let (value, replacement) = compute(&record);
            let Some(text) = replacement else {
                return Ok(value);
            };

            let written = match field {
                Field::StagesProgress => {
                    self.users
                        .update_stages_progress(user, record.revision, &text)
                        .await
                }
                Field::Statistic => {
                    self.users
                        .update_statistic(user, record.revision, &text)
                        .await
                }
            };

            match written {
                Ok(_) => return Ok(value),
                Err(StorageError::Conflict) if attempt < MAX_WRITE_ATTEMPTS => {
                    debug!(%user, attempt, ?field, "user record changed during update; retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn ensure_in_catalog(slot: StageSlot) -> Result<(), ProgressServiceError> {
    match model::entry(slot) {
        Some(_) => Ok(()),
        None => Err(ProgressServiceError::UnknownStage(slot)),
    }
}

fn decode_progress(record: &UserRecord) -> StageProgress {
    StageProgress::decode(record.stages_progress.as_deref()).unwrap_or_else(|err| {
        warn!(user = %record.id, %err, "stored progress unreadable; using the registration default");
        StageProgress::initial()
    })
}

fn chart_of(record: &UserRecord, today: NaiveDate) -> ChartSeries {
    stats::chart_series(record.statistic.as_deref().unwrap_or_default(), today)
}
