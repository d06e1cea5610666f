mod account;
mod catalog;
mod ids;
mod progress;
mod session_log;

pub use account::{
    AccountError, Credentials, MIN_PASSWORD_LEN, MIN_USERNAME_LEN, PasswordHash,
};
pub use catalog::{CatalogEntry, STAGE_COUNT, catalog, entry};
pub use ids::{ParseIdError, StageSlot, UserId};
pub use progress::{INITIAL_SLOTS, ProgressError, StageProgress, StageStatus};
pub use session_log::{MAX_SESSIONS, Session, SessionLog};
