/// Last reported tasker position per task
///
/// Keyed by `(tasker_id, task_id)`; each report overwrites the previous one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskerLocation {
    pub tasker_id: Uuid,
    pub task_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub is_en_route: bool,
    pub estimated_arrival_minutes: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

impl TaskerLocation {
    /// Inserts or replaces the position for `(tasker_id, task_id)`
    pub async fn upsert(
        pool: &PgPool,
        tasker_id: Uuid,
        task_id: Uuid,
        latitude: f64,
        longitude: f64,
        estimated_arrival_minutes: Option<i32>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, TaskerLocation>(
            r#"
            INSERT INTO tasker_locations (tasker_id, task_id, latitude, longitude, is_en_route, estimated_arrival_minutes)
            VALUES ($1, $2, $3, $4, TRUE, $5)
            ON CONFLICT (tasker_id, task_id) DO UPDATE SET
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                is_en_route = TRUE,
                estimated_arrival_minutes = EXCLUDED.estimated_arrival_minutes,
                updated_at = NOW()
            RETURNING tasker_id, task_id, latitude, longitude, is_en_route, estimated_arrival_minutes, updated_at
            "#,
        )
        .bind(tasker_id)
        .bind(task_id)
        .bind(latitude)
        .bind(longitude)
        .bind(estimated_arrival_minutes)
        .fetch_one(pool)
        .await
    }

    pub async fn find(
        pool: &PgPool,
        tasker_id: Uuid,
        task_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskerLocation>(
            r#"
            SELECT tasker_id, task_id, latitude, longitude, is_en_route, estimated_arrival_minutes, updated_at
            FROM tasker_locations
            WHERE tasker_id = $1 AND task_id = $2
            "#,
        )
        .bind(tasker_id)
        .bind(task_id)
        .fetch_optional(pool)
        .await
    }
}
