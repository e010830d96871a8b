/// Disputes over completed tasks
///
/// One dispute per task. Only admins move a dispute through its statuses;
/// resolving or closing one records the resolution and who made it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "dispute_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DisputeStatus {
    Open,
    Investigating,
    Resolved,
    Closed,
}

impl DisputeStatus {
    /// Resolved and closed disputes need resolution text
    pub fn requires_resolution(&self) -> bool {
        matches!(self, DisputeStatus::Resolved | DisputeStatus::Closed)
    }
}

const DISPUTE_COLUMNS: &str = "id, task_id, raised_by, against_user, reason, description, status, \
     resolution, resolved_by, resolved_at, created_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Dispute {
    pub id: Uuid,
    pub task_id: Uuid,
    pub raised_by: Uuid,
    pub against_user: Uuid,
    pub reason: String,
    pub description: String,
    pub status: DisputeStatus,
    pub resolution: Option<String>,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateDispute {
    pub task_id: Uuid,
    pub raised_by: Uuid,
    pub against_user: Uuid,
    pub reason: String,
    pub description: String,
}

impl Dispute {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.raised_by == user_id || self.against_user == user_id
    }

    pub async fn create(pool: &PgPool, data: CreateDispute) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO disputes (task_id, raised_by, against_user, reason, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {DISPUTE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Dispute>(&query)
            .bind(data.task_id)
            .bind(data.raised_by)
            .bind(data.against_user)
            .bind(data.reason)
            .bind(data.description)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {DISPUTE_COLUMNS} FROM disputes WHERE id = $1");

        sqlx::query_as::<_, Dispute>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn exists_for_task(pool: &PgPool, task_id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM disputes WHERE task_id = $1)")
            .bind(task_id)
            .fetch_one(pool)
            .await
    }

    /// Lists disputes, newest first
    ///
    /// `involving` restricts to disputes the user raised or is named in.
    pub async fn list(
        pool: &PgPool,
        involving: Option<Uuid>,
        status: Option<DisputeStatus>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {DISPUTE_COLUMNS} FROM disputes WHERE TRUE"));

        if let Some(user_id) = involving {
            qb.push(" AND (raised_by = ")
                .push_bind(user_id)
                .push(" OR against_user = ")
                .push_bind(user_id)
                .push(")");
        }
        if let Some(status) = status {
            qb.push(" AND status = ").push_bind(status);
        }

        qb.push(" ORDER BY created_at DESC LIMIT 100");

        qb.build_query_as::<Dispute>().fetch_all(pool).await
    }

    /// Sets the status; resolution fields are written only for final statuses
    pub async fn update_status(
        pool: &PgPool,
        id: Uuid,
        status: DisputeStatus,
        resolution: Option<String>,
        admin_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE disputes SET
                status = $2,
                resolution = COALESCE($3, resolution),
                resolved_by = CASE WHEN $4 THEN $5 ELSE resolved_by END,
                resolved_at = CASE WHEN $4 THEN NOW() ELSE resolved_at END
            WHERE id = $1
            RETURNING {DISPUTE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Dispute>(&query)
            .bind(id)
            .bind(status)
            .bind(resolution)
            .bind(status.requires_resolution())
            .bind(admin_id)
            .fetch_optional(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_resolution() {
        assert!(!DisputeStatus::Open.requires_resolution());
        assert!(!DisputeStatus::Investigating.requires_resolution());
        assert!(DisputeStatus::Resolved.requires_resolution());
        assert!(DisputeStatus::Closed.requires_resolution());
    }
}
