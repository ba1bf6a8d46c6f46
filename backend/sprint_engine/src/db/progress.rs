//! Progress history.

use chrono::{DateTime, Utc};
use sprint_rules::ProgressEntry;
use sqlx::SqlitePool;

use super::{from_ts, to_ts};
use crate::errors::Result;

#[derive(Debug, Clone, sqlx::FromRow)]
struct ProgressRow {
    id: i64,
    project_id: i64,
    amount: i64,
    recorded_at: i64,
}

impl From<ProgressRow> for ProgressEntry {
    fn from(row: ProgressRow) -> Self {
        ProgressEntry {
            id: row.id,
            project_id: row.project_id,
            amount: row.amount,
            recorded_at: from_ts(row.recorded_at),
        }
    }
}

pub async fn insert_entry(
    pool: &SqlitePool,
    project_id: i64,
    amount: i64,
    recorded_at: DateTime<Utc>,
) -> Result<i64> {
    let id = sqlx::query(
        "INSERT INTO progress_entries (project_id, amount, recorded_at) VALUES (?1, ?2, ?3)",
    )
    .bind(project_id)
    .bind(amount)
    .bind(to_ts(recorded_at))
    .execute(pool)
    .await?
    .last_insert_rowid();
    Ok(id)
}

/// All entries for a project, oldest first.
pub async fn entries_for_project(pool: &SqlitePool, project_id: i64) -> Result<Vec<ProgressEntry>> {
    let rows = sqlx::query_as::<_, ProgressRow>(
        r#"
        SELECT id, project_id, amount, recorded_at
        FROM   progress_entries
        WHERE  project_id = ?1
        ORDER  BY recorded_at ASC, id ASC
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(ProgressEntry::from).collect())
}

/// Cumulative amount recorded for a project; zero with no history.
pub async fn total_for_project(pool: &SqlitePool, project_id: i64) -> Result<i64> {
    let (total,): (i64,) =
        sqlx::query_as("SELECT COALESCE(SUM(amount), 0) FROM progress_entries WHERE project_id = ?1")
            .bind(project_id)
            .fetch_one(pool)
            .await?;
    Ok(total)
}
