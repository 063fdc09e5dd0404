//! Store failures are logged once, where a `StoreError` turns into a
//! `DomainError`. Classification is unchanged: the error passes through as
//! `DomainError::StoreFailure`.

use domains::{DomainError, StoreError};
use tracing::error;
use uuid::Uuid;

/// `map_err` adapter for store calls scoped to one board.
pub(crate) fn store_failure(board_id: Uuid) -> impl FnOnce(StoreError) -> DomainError {
    move |e| {
        error!(%board_id, error = %e, "store failure");
        DomainError::StoreFailure(e)
    }
}

/// Same as [`store_failure`] for lookups keyed by shareable link.
pub(crate) fn link_store_failure(code: &str) -> impl FnOnce(StoreError) -> DomainError + '_ {
    move |e| {
        error!(link = %code, error = %e, "store failure");
        DomainError::StoreFailure(e)
    }
}
