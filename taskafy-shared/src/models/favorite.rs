/// Client bookmarks of taskers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Favorite {
    pub id: Uuid,
    pub client_id: Uuid,
    pub tasker_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Favorite {
    /// Adds a favorite; `None` if the pair already exists
    pub async fn add(pool: &PgPool, client_id: Uuid, tasker_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Favorite>(
            r#"
            INSERT INTO favorites (client_id, tasker_id) VALUES ($1, $2)
            ON CONFLICT (client_id, tasker_id) DO NOTHING
            RETURNING id, client_id, tasker_id, created_at
            "#,
        )
        .bind(client_id)
        .bind(tasker_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn remove(pool: &PgPool, client_id: Uuid, tasker_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM favorites WHERE client_id = $1 AND tasker_id = $2")
            .bind(client_id)
            .bind(tasker_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn exists(pool: &PgPool, client_id: Uuid, tasker_id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM favorites WHERE client_id = $1 AND tasker_id = $2)",
        )
        .bind(client_id)
        .bind(tasker_id)
        .fetch_one(pool)
        .await
    }

    pub async fn list_for_client(pool: &PgPool, client_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Favorite>(
            r#"
            SELECT id, client_id, tasker_id, created_at FROM favorites
            WHERE client_id = $1
            ORDER BY created_at DESC
            LIMIT 100
            "#,
        )
        .bind(client_id)
        .fetch_all(pool)
        .await
    }
}
