use thiserror::Error;

use crate::document::DocumentError;
use crate::model::{AccountError, ParseIdError, ProgressError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    ParseId(#[from] ParseIdError),
}
