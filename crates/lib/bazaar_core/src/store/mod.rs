//! Persistence layer.
//!
//! Each aggregate is reached through an `async_trait` repository so services
//! can hold `Arc<dyn ...>` handles. The PostgreSQL implementations live next
//! to their trait; [`memory`] provides an in-process stand-in for tests.

pub mod categories;
pub mod identities;
pub mod images;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod products;
pub mod tokens;

use sqlx::postgres::PgArguments;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use tracing::{error, warn};

pub use categories::{CategoryRepository, PgCategoryRepository};
pub use identities::{IdentityRepository, PgIdentityRepository};
pub use images::{ImageRepository, PgImageRepository};
pub use products::{PgProductRepository, ProductRepository};
pub use tokens::{PgTokenStore, TokenStore};

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("referenced record does not exist: {0}")]
    MissingReference(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("rollback failed ({rollback}) after: {cause}")]
    Rollback { rollback: sqlx::Error, cause: String },
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = e {
            return StoreError::NotFound;
        }
        if let Some(db) = e.as_database_error() {
            let constraint = db.constraint().unwrap_or_default().to_string();
            if db.is_unique_violation() {
                return StoreError::Conflict(constraint);
            }
            if db.is_foreign_key_violation() {
                return StoreError::MissingReference(constraint);
            }
        }
        StoreError::Database(e)
    }
}

/// Commit on success; otherwise roll back and hand back the original error.
///
/// A failed rollback replaces the original error, which survives only as
/// text inside [`StoreError::Rollback`].
pub(crate) async fn finish<T>(
    tx: Transaction<'_, Postgres>,
    result: Result<T, StoreError>,
) -> Result<T, StoreError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(cause) => match tx.rollback().await {
            Ok(()) => {
                warn!(error = %cause, "transaction rolled back");
                Err(cause)
            }
            Err(rollback) => {
                error!(error = %cause, rollback_error = %rollback, "transaction rollback failed");
                Err(StoreError::Rollback {
                    rollback,
                    cause: cause.to_string(),
                })
            }
        },
    }
}

/// Run one statement inside its own transaction, returning rows affected.
pub(crate) async fn execute_in_tx<'q>(
    pool: &PgPool,
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
) -> Result<u64, StoreError> {
    let mut tx = pool.begin().await?;
    let result = query
        .execute(&mut *tx)
        .await
        .map(|r| r.rows_affected())
        .map_err(StoreError::from);
    finish(tx, result).await
}
