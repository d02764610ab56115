//! Error mapping shared by the Diesel adapters.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::RecordRepositoryError;

use super::pool::PoolError;

/// Pool failures mean the database is unreachable.
pub(crate) fn map_pool_error(error: PoolError) -> RecordRepositoryError {
    RecordRepositoryError::connection(error.into_message())
}

/// Map Diesel failures to record repository errors.
///
/// Only a closed connection counts as a connection failure; everything else
/// is a query failure. Database messages are logged at debug level and not
/// forwarded.
pub(crate) fn map_diesel_error(error: DieselError) -> RecordRepositoryError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(error = %error, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            RecordRepositoryError::connection("database connection error")
        }
        DieselError::NotFound => RecordRepositoryError::query("record not found"),
        DieselError::QueryBuilderError(_) => RecordRepositoryError::query("database query error"),
        DieselError::RollbackTransaction | DieselError::RollbackErrorOnCommit { .. } => {
            RecordRepositoryError::query("transaction rolled back")
        }
        _ => RecordRepositoryError::query("database error"),
    }
}
