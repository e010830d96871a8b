/// Recurring booking schedules
///
/// A schedule books the same tasker at a fixed time on a daily, weekly,
/// biweekly, or monthly cadence. The worker claims due schedules with
/// `FOR UPDATE SKIP LOCKED`, materializes a task for the occurrence, and
/// advances `next_occurrence` in the same transaction.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::recurrence::RecurrenceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "recurrence_frequency", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

impl RecurrenceFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceFrequency::Daily => "daily",
            RecurrenceFrequency::Weekly => "weekly",
            RecurrenceFrequency::Biweekly => "biweekly",
            RecurrenceFrequency::Monthly => "monthly",
        }
    }
}

impl FromStr for RecurrenceFrequency {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(RecurrenceFrequency::Daily),
            "weekly" => Ok(RecurrenceFrequency::Weekly),
            "biweekly" => Ok(RecurrenceFrequency::Biweekly),
            "monthly" => Ok(RecurrenceFrequency::Monthly),
            other => Err(RecurrenceError::UnknownFrequency(other.to_string())),
        }
    }
}

const RECURRING_COLUMNS: &str = "id, client_id, assigned_tasker_id, title, description, category_id, \
     frequency, scheduled_time, day_of_week, day_of_month, hourly_rate, estimated_hours, \
     next_occurrence, is_active, created_at, last_generated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecurringTask {
    pub id: Uuid,
    pub client_id: Uuid,
    pub assigned_tasker_id: Uuid,
    pub title: String,
    pub description: String,
    pub category_id: Uuid,
    pub frequency: RecurrenceFrequency,
    /// `HH:MM`, UTC
    pub scheduled_time: String,
    /// 0 = Monday
    pub day_of_week: Option<i32>,
    pub day_of_month: Option<i32>,
    pub hourly_rate: f64,
    pub estimated_hours: f64,
    pub next_occurrence: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_generated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateRecurringTask {
    pub client_id: Uuid,
    pub assigned_tasker_id: Uuid,
    pub title: String,
    pub description: String,
    pub category_id: Uuid,
    pub frequency: RecurrenceFrequency,
    pub scheduled_time: String,
    pub day_of_week: Option<i32>,
    pub day_of_month: Option<i32>,
    pub hourly_rate: f64,
    pub estimated_hours: f64,
    pub next_occurrence: DateTime<Utc>,
}

impl RecurringTask {
    pub async fn create(pool: &PgPool, data: CreateRecurringTask) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO recurring_tasks (
                client_id, assigned_tasker_id, title, description, category_id, frequency,
                scheduled_time, day_of_week, day_of_month, hourly_rate, estimated_hours, next_occurrence
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {RECURRING_COLUMNS}
            "#
        );

        sqlx::query_as::<_, RecurringTask>(&query)
            .bind(data.client_id)
            .bind(data.assigned_tasker_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.category_id)
            .bind(data.frequency)
            .bind(data.scheduled_time)
            .bind(data.day_of_week)
            .bind(data.day_of_month)
            .bind(data.hourly_rate)
            .bind(data.estimated_hours)
            .bind(data.next_occurrence)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {RECURRING_COLUMNS} FROM recurring_tasks WHERE id = $1");

        sqlx::query_as::<_, RecurringTask>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_client(pool: &PgPool, client_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {RECURRING_COLUMNS} FROM recurring_tasks WHERE client_id = $1 ORDER BY next_occurrence ASC LIMIT 100"
        );

        sqlx::query_as::<_, RecurringTask>(&query)
            .bind(client_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_for_tasker(pool: &PgPool, tasker_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {RECURRING_COLUMNS} FROM recurring_tasks WHERE assigned_tasker_id = $1 ORDER BY next_occurrence ASC LIMIT 100"
        );

        sqlx::query_as::<_, RecurringTask>(&query)
            .bind(tasker_id)
            .fetch_all(pool)
            .await
    }

    /// Pauses or resumes a schedule
    ///
    /// `next_occurrence` replaces the stored one when given, so a resumed
    /// schedule doesn't fire for occurrences missed while paused.
    pub async fn set_active(
        pool: &PgPool,
        id: Uuid,
        is_active: bool,
        next_occurrence: Option<DateTime<Utc>>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE recurring_tasks
            SET is_active = $2, next_occurrence = COALESCE($3, next_occurrence)
            WHERE id = $1
            RETURNING {RECURRING_COLUMNS}
            "#
        );

        sqlx::query_as::<_, RecurringTask>(&query)
            .bind(id)
            .bind(is_active)
            .bind(next_occurrence)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM recurring_tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Locks the oldest due active schedule, skipping rows other workers hold
    pub async fn claim_next_due(
        conn: &mut PgConnection,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {RECURRING_COLUMNS} FROM recurring_tasks
            WHERE is_active AND next_occurrence <= $1
            ORDER BY next_occurrence ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#
        );

        sqlx::query_as::<_, RecurringTask>(&query)
            .bind(now)
            .fetch_optional(conn)
            .await
    }

    /// Moves the schedule past the occurrence just generated
    pub async fn advance(
        conn: &mut PgConnection,
        id: Uuid,
        next_occurrence: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE recurring_tasks SET next_occurrence = $2, last_generated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(next_occurrence)
        .execute(conn)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_parse() {
        assert_eq!("biweekly".parse::<RecurrenceFrequency>().unwrap(), RecurrenceFrequency::Biweekly);
        assert_eq!(
            "yearly".parse::<RecurrenceFrequency>(),
            Err(RecurrenceError::UnknownFrequency("yearly".into()))
        );
        assert_eq!(RecurrenceFrequency::Monthly.as_str(), "monthly");
    }
}
