use thiserror::Error;

use crate::calendar::CalendarError;
use crate::model::{IdError, ProtocolError, UnknownCategory};
use crate::progress::ProgressError;

/// Umbrella over the domain errors of this crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Id(#[from] IdError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Category(#[from] UnknownCategory),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
}
