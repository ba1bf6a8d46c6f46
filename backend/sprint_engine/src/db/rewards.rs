//! Badges and milestones.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sprint_rules::badges::BadgeSpec;
use sprint_rules::{Badge, Milestone};
use sqlx::{SqliteConnection, SqlitePool};

use super::{from_ts, to_ts};
use crate::errors::Result;

#[derive(Debug, Clone, sqlx::FromRow)]
struct BadgeRow {
    id: i64,
    project_id: i64,
    event_id: Option<i64>,
    name: String,
    description: String,
    icon: String,
    awarded_at: i64,
}

impl From<BadgeRow> for Badge {
    fn from(row: BadgeRow) -> Self {
        Badge {
            id: row.id,
            project_id: row.project_id,
            event_id: row.event_id,
            name: row.name,
            description: row.description,
            icon: row.icon,
            awarded_at: from_ts(row.awarded_at),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct MilestoneRow {
    id: i64,
    project_id: i64,
    name: String,
    target_amount: i64,
    position: i64,
    completed: bool,
    completed_at: Option<i64>,
}

impl From<MilestoneRow> for Milestone {
    fn from(row: MilestoneRow) -> Self {
        Milestone {
            id: row.id,
            project_id: row.project_id,
            name: row.name,
            target_amount: row.target_amount,
            position: row.position,
            completed: row.completed,
            completed_at: row.completed_at.map(from_ts),
        }
    }
}

// ─────────────────────────────────────────────────────────
// Badges
// ─────────────────────────────────────────────────────────

/// Names of badges the project holds outside any event.
pub async fn project_badge_names(pool: &SqlitePool, project_id: i64) -> Result<HashSet<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT name FROM badges WHERE project_id = ?1 AND event_id IS NULL")
            .bind(project_id)
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(name,)| name).collect())
}

/// Persist a batch of badges in one transaction. A badge that already exists
/// for the same project, event and name is silently skipped by the unique
/// index, which re-checks idempotency at write time. Returns how many rows
/// were actually inserted.
pub async fn insert_badges(
    pool: &SqlitePool,
    project_id: i64,
    event_id: Option<i64>,
    badges: &[BadgeSpec],
    awarded_at: DateTime<Utc>,
) -> Result<usize> {
    if badges.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut count = 0usize;
    for badge in badges {
        if insert_badge(&mut tx, project_id, event_id, badge, awarded_at).await? {
            count += 1;
        }
    }
    tx.commit().await?;
    Ok(count)
}

/// Single insert-or-ignore on a caller's connection, so it can share a
/// transaction with another write. Returns `true` if a row was inserted.
pub(crate) async fn insert_badge(
    conn: &mut SqliteConnection,
    project_id: i64,
    event_id: Option<i64>,
    badge: &BadgeSpec,
    awarded_at: DateTime<Utc>,
) -> Result<bool> {
    let rows_affected = sqlx::query(
        r#"
        INSERT OR IGNORE INTO badges
            (project_id, event_id, name, description, icon, awarded_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(project_id)
    .bind(event_id)
    .bind(badge.name)
    .bind(badge.description)
    .bind(badge.icon)
    .bind(to_ts(awarded_at))
    .execute(conn)
    .await?
    .rows_affected();
    Ok(rows_affected == 1)
}

/// Every badge of a project, oldest first.
pub async fn badges_for_project(pool: &SqlitePool, project_id: i64) -> Result<Vec<Badge>> {
    let rows = sqlx::query_as::<_, BadgeRow>(
        r#"
        SELECT id, project_id, event_id, name, description, icon, awarded_at
        FROM   badges
        WHERE  project_id = ?1
        ORDER  BY awarded_at ASC, id ASC
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Badge::from).collect())
}

// ─────────────────────────────────────────────────────────
// Milestones
// ─────────────────────────────────────────────────────────

pub async fn insert_milestone(
    pool: &SqlitePool,
    project_id: i64,
    name: &str,
    target_amount: i64,
    position: i64,
) -> Result<i64> {
    let id = sqlx::query(
        "INSERT INTO milestones (project_id, name, target_amount, position) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(project_id)
    .bind(name)
    .bind(target_amount)
    .bind(position)
    .execute(pool)
    .await?
    .last_insert_rowid();
    Ok(id)
}

pub async fn incomplete_milestones(pool: &SqlitePool, project_id: i64) -> Result<Vec<Milestone>> {
    milestones_where(pool, project_id, "AND completed = 0").await
}

pub async fn milestones_for_project(pool: &SqlitePool, project_id: i64) -> Result<Vec<Milestone>> {
    milestones_where(pool, project_id, "").await
}

async fn milestones_where(pool: &SqlitePool, project_id: i64, filter: &str) -> Result<Vec<Milestone>> {
    let rows = sqlx::query_as::<_, MilestoneRow>(&format!(
        r#"
        SELECT id, project_id, name, target_amount, position, completed, completed_at
        FROM   milestones
        WHERE  project_id = ?1 {filter}
        ORDER  BY position ASC, id ASC
        "#
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Milestone::from).collect())
}

/// Mark a milestone completed unless it already is. Returns `true` if this
/// call completed it.
pub async fn complete_milestone(pool: &SqlitePool, id: i64, at: DateTime<Utc>) -> Result<bool> {
    let rows = sqlx::query(
        "UPDATE milestones SET completed = 1, completed_at = ?1 WHERE id = ?2 AND completed = 0",
    )
    .bind(to_ts(at))
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(rows == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enrollments::insert_project;
    use crate::db::test_pool;
    use chrono::TimeZone;
    use sprint_rules::badges::{EVENT_WINNER, FIRST_STEP, HUNDRED_WORDS};
    use sprint_rules::GoalUnit;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 11, 3, 10, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn duplicate_badges_are_ignored_at_write_time() {
        let pool = test_pool().await;
        let project = insert_project(&pool, 1, "Draft", None, GoalUnit::Words).await.unwrap();

        let inserted = insert_badges(&pool, project, None, &[FIRST_STEP, HUNDRED_WORDS], now())
            .await
            .unwrap();
        assert_eq!(inserted, 2);

        let inserted = insert_badges(&pool, project, None, &[FIRST_STEP], now()).await.unwrap();
        assert_eq!(inserted, 0);
        assert_eq!(badges_for_project(&pool, project).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn event_badges_are_scoped_per_event() {
        let pool = test_pool().await;
        let project = insert_project(&pool, 1, "Draft", None, GoalUnit::Words).await.unwrap();

        assert_eq!(insert_badges(&pool, project, Some(1), &[EVENT_WINNER], now()).await.unwrap(), 1);
        assert_eq!(insert_badges(&pool, project, Some(2), &[EVENT_WINNER], now()).await.unwrap(), 1);
        assert_eq!(insert_badges(&pool, project, Some(1), &[EVENT_WINNER], now()).await.unwrap(), 0);

        // Event badges do not count as project-level badges.
        assert!(project_badge_names(&pool, project).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn milestone_completion_is_monotonic() {
        let pool = test_pool().await;
        let project = insert_project(&pool, 1, "Draft", None, GoalUnit::Words).await.unwrap();
        let id = insert_milestone(&pool, project, "Act one", 10_000, 0).await.unwrap();

        assert!(complete_milestone(&pool, id, now()).await.unwrap());
        assert!(!complete_milestone(&pool, id, now() + chrono::Duration::days(1)).await.unwrap());

        let all = milestones_for_project(&pool, project).await.unwrap();
        assert_eq!(all[0].completed_at, Some(now()));
        assert!(incomplete_milestones(&pool, project).await.unwrap().is_empty());
    }
}
