//! Workflow document CRUD operations.

use chrono::Utc;
use sqlx::PgPool;

use crate::{DbError, models::WorkflowRow};

const COLUMNS: &str = "id, user_id, document, created_at, updated_at";

/// Insert a workflow document, or replace the document of an existing row.
///
/// On replace the stored `executions` array and `created_at` are kept;
/// history only ever grows through `executions::append_execution`.
pub async fn upsert_workflow(
    pool: &PgPool,
    id: &str,
    user_id: &str,
    document: serde_json::Value,
) -> Result<WorkflowRow, DbError> {
    let now = Utc::now();

    let row = sqlx::query_as::<_, WorkflowRow>(&format!(
        r#"
        INSERT INTO workflows (id, user_id, document, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $4)
        ON CONFLICT (id) DO UPDATE
            SET user_id = EXCLUDED.user_id,
                document = EXCLUDED.document || jsonb_build_object(
                    'executions', COALESCE(workflows.document->'executions', '[]'::jsonb)
                ),
                updated_at = EXCLUDED.updated_at
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(user_id)
    .bind(document)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetch a single workflow by its primary key.
pub async fn get_workflow(pool: &PgPool, id: &str) -> Result<WorkflowRow, DbError> {
    let row = sqlx::query_as::<_, WorkflowRow>(&format!(
        "SELECT {COLUMNS} FROM workflows WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Return a user's workflows ordered by creation time (newest first).
///
/// `search`, when given, keeps rows whose id or document name contains it
/// (case-insensitive).
pub async fn list_workflows(
    pool: &PgPool,
    user_id: &str,
    search: Option<&str>,
) -> Result<Vec<WorkflowRow>, DbError> {
    let rows = sqlx::query_as::<_, WorkflowRow>(&format!(
        r#"
        SELECT {COLUMNS} FROM workflows
        WHERE user_id = $1
          AND ($2::text IS NULL
               OR id ILIKE $2 ESCAPE '\'
               OR document->>'name' ILIKE $2 ESCAPE '\')
        ORDER BY created_at DESC
        "#
    ))
    .bind(user_id)
    .bind(search.map(contains_pattern))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// `ILIKE` pattern matching `term` anywhere, with its wildcards taken literally.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Permanently delete a workflow by its primary key.
///
/// Returns `DbError::NotFound` if no row was deleted.
pub async fn delete_workflow(pool: &PgPool, id: &str) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM workflows WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
