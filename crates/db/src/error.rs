//! Errors surfaced by the workflow store.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// The query itself failed: connection, syntax, constraint.
    #[error("workflow store query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// No workflow row has the requested id.
    #[error("no workflow row with that id")]
    NotFound,

    #[error("workflow store migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
