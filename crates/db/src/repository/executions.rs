//! Execution history stored inside the workflow document.

use chrono::Utc;
use sqlx::PgPool;

use crate::DbError;

/// Append one execution record to the document's `executions` array.
///
/// The append is a single `UPDATE`, so concurrent appends to the same
/// workflow are serialised by Postgres row locking and none are lost.
pub async fn append_execution(
    pool: &PgPool,
    workflow_id: &str,
    execution: serde_json::Value,
) -> Result<(), DbError> {
    let result = sqlx::query(
        r#"
        UPDATE workflows
        SET document = jsonb_set(
                document,
                '{executions}',
                COALESCE(document->'executions', '[]'::jsonb) || jsonb_build_array($2::jsonb)
            ),
            updated_at = $3
        WHERE id = $1
        "#,
    )
    .bind(workflow_id)
    .bind(execution)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
