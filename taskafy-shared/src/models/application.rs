/// Tasker applications to open (`posted`) tasks
///
/// One application per tasker per task, enforced by a unique constraint.
/// Assignment accepts one application and rejects its siblings in the same
/// transaction as the task update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "application_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

const APPLICATION_COLUMNS: &str =
    "id, task_id, tasker_id, proposed_rate, estimated_hours, message, status, created_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskApplication {
    pub id: Uuid,
    pub task_id: Uuid,
    pub tasker_id: Uuid,
    pub proposed_rate: f64,
    pub estimated_hours: f64,
    pub message: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateApplication {
    pub task_id: Uuid,
    pub tasker_id: Uuid,
    pub proposed_rate: f64,
    pub estimated_hours: f64,
    pub message: Option<String>,
}

impl TaskApplication {
    /// Inserts an application
    ///
    /// A second application from the same tasker fails with a unique violation.
    pub async fn create(pool: &PgPool, data: CreateApplication) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO task_applications (task_id, tasker_id, proposed_rate, estimated_hours, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {APPLICATION_COLUMNS}
            "#
        );

        sqlx::query_as::<_, TaskApplication>(&query)
            .bind(data.task_id)
            .bind(data.tasker_id)
            .bind(data.proposed_rate)
            .bind(data.estimated_hours)
            .bind(data.message)
            .fetch_one(pool)
            .await
    }

    pub async fn exists(pool: &PgPool, task_id: Uuid, tasker_id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM task_applications WHERE task_id = $1 AND tasker_id = $2)",
        )
        .bind(task_id)
        .bind(tasker_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_pending<'e>(
        executor: impl PgExecutor<'e>,
        task_id: Uuid,
        tasker_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {APPLICATION_COLUMNS} FROM task_applications \
             WHERE task_id = $1 AND tasker_id = $2 AND status = 'pending'"
        );

        sqlx::query_as::<_, TaskApplication>(&query)
            .bind(task_id)
            .bind(tasker_id)
            .fetch_optional(executor)
            .await
    }

    pub async fn list_for_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {APPLICATION_COLUMNS} FROM task_applications WHERE task_id = $1 ORDER BY created_at ASC"
        );

        sqlx::query_as::<_, TaskApplication>(&query)
            .bind(task_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_for_tasker(pool: &PgPool, tasker_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {APPLICATION_COLUMNS} FROM task_applications \
             WHERE tasker_id = $1 ORDER BY created_at DESC LIMIT 100"
        );

        sqlx::query_as::<_, TaskApplication>(&query)
            .bind(tasker_id)
            .fetch_all(pool)
            .await
    }

    /// Accepts `tasker_id`'s application and rejects every other pending one
    ///
    /// Returns the number of rejected siblings.
    pub async fn accept_and_reject_others(
        conn: &mut sqlx::PgConnection,
        task_id: Uuid,
        tasker_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        sqlx::query(
            "UPDATE task_applications SET status = 'accepted' WHERE task_id = $1 AND tasker_id = $2",
        )
        .bind(task_id)
        .bind(tasker_id)
        .execute(&mut *conn)
        .await?;

        let rejected = sqlx::query(
            "UPDATE task_applications SET status = 'rejected' \
             WHERE task_id = $1 AND tasker_id <> $2 AND status = 'pending'",
        )
        .bind(task_id)
        .bind(tasker_id)
        .execute(&mut *conn)
        .await?;

        Ok(rejected.rows_affected())
    }
}
