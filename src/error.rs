//! Centralized error handling.
//!
//! The adapter layer neither catches nor reclassifies anything: database
//! failures surface as the wrapped [`sea_orm::DbErr`] and validation failures
//! as the wrapped [`validator::ValidationErrors`], unchanged.

use sea_orm::DbErr;

/// Errors surfaced by the `Connection` and `Query` contracts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("record not found")]
    NotFound,

    #[error(transparent)]
    Database(#[from] DbErr),

    #[error(transparent)]
    Validation(#[from] validator::ValidationErrors),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for Option -> Error conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> Result<T> {
        self.ok_or(Error::NotFound)
    }
}
