//! Conversions from external infrastructure errors into domain errors.

use rusqlite::Error as SqlError;
use sheetsync_domain::SheetSyncError;

/// Error newtype that keeps conversions on the infrastructure side and can
/// be converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SheetSyncError);

impl From<InfraError> for SheetSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SheetSyncError> for InfraError {
    fn from(value: SheetSyncError) -> Self {
        InfraError(value)
    }
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → SheetSyncError */
/* -------------------------------------------------------------------------- */

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        use rusqlite::ffi::ErrorCode;

        let mapped = match value {
            SqlError::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => SheetSyncError::Store("database is busy".into()),
                    ErrorCode::DatabaseLocked => {
                        SheetSyncError::Store("database is locked".into())
                    }
                    ErrorCode::ConstraintViolation => SheetSyncError::Store(format!(
                        "constraint violation (code {}): {}",
                        err.extended_code, message
                    )),
                    _ => SheetSyncError::Store(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            SqlError::QueryReturnedNoRows => {
                SheetSyncError::NotFound("no rows returned by query".into())
            }
            SqlError::FromSqlConversionFailure(_, _, cause) => {
                SheetSyncError::Store(format!("failed to convert sqlite value: {cause}"))
            }
            SqlError::InvalidColumnType(_, _, ty) => {
                SheetSyncError::Store(format!("invalid column type: {ty}"))
            }
            SqlError::InvalidQuery => SheetSyncError::Store("invalid SQL query".into()),
            other => SheetSyncError::Store(other.to_string()),
        };

        InfraError(mapped)
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → SheetSyncError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(SheetSyncError::Store(format!("connection pool error: {value}")))
    }
}
