/// Task bookings and their lifecycle
///
/// # State Machine
///
/// ```text
/// posted      → assigned | cancelled
/// assigned    → in_progress | posted (tasker rejects) | cancelled
/// in_progress → completed | cancelled
/// ```
///
/// `completed` and `cancelled` are terminal.
///
/// Every state-changing method is a conditional `UPDATE ... WHERE status = ...`
/// that returns `Option<Task>`: `None` means the row was not in the expected
/// state (or doesn't exist), which callers surface as a conflict. Methods that
/// take a generic executor are called from inside transactions.
///
/// # Example
///
/// ```no_run
/// use taskafy_shared::models::task::{Task, TaskStatus};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, task_id: Uuid, tasker_id: Uuid) -> Result<(), sqlx::Error> {
/// match Task::accept(&pool, task_id, tasker_id).await? {
///     Some(task) => assert_eq!(task.status, TaskStatus::InProgress),
///     None => println!("someone else moved the task first"),
/// }
/// # Ok(())
/// # }
/// ```

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::payment::PaymentMethod;

/// Booking status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Open for applications, no tasker yet
    Posted,
    /// A tasker is booked
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Posted => "posted",
            TaskStatus::Assigned => "assigned",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        use TaskStatus::*;

        matches!(
            (self, target),
            (Posted, Assigned)
                | (Posted, Cancelled)
                | (Assigned, InProgress)
                | (Assigned, Posted)
                | (Assigned, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "posted" => Ok(TaskStatus::Posted),
            "assigned" => Ok(TaskStatus::Assigned),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(format!("Invalid status: {}", other)),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) const TASK_COLUMNS: &str = "id, client_id, assigned_tasker_id, title, description, \
     category_id, subcategory, duration_hours, hourly_rate, total_cost, task_date, address, city, \
     latitude, longitude, special_instructions, status, is_paid, payment_method, is_tracking, \
     tracking_started_at, current_latitude, current_longitude, last_location_update, \
     is_timer_running, timer_started_at, timer_stopped_at, actual_hours_worked, cancelled_by, \
     cancellation_reason, penalty_amount, recurring_task_id, created_at, updated_at, completed_at";

/// Hours elapsed in the running timer segment
const RUNNING_SEGMENT_HOURS: &str =
    "EXTRACT(EPOCH FROM (NOW() - timer_started_at))::DOUBLE PRECISION / 3600.0";

/// Booking row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub client_id: Uuid,
    pub assigned_tasker_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub category_id: Uuid,
    pub subcategory: Option<String>,
    pub duration_hours: f64,
    pub hourly_rate: f64,
    pub total_cost: f64,
    pub task_date: DateTime<Utc>,
    pub address: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub special_instructions: Option<String>,
    pub status: TaskStatus,

    pub is_paid: bool,
    pub payment_method: Option<PaymentMethod>,

    pub is_tracking: bool,
    pub tracking_started_at: Option<DateTime<Utc>>,
    pub current_latitude: Option<f64>,
    pub current_longitude: Option<f64>,
    pub last_location_update: Option<DateTime<Utc>>,

    pub is_timer_running: bool,
    pub timer_started_at: Option<DateTime<Utc>>,
    pub timer_stopped_at: Option<DateTime<Utc>>,
    pub actual_hours_worked: f64,

    pub cancelled_by: Option<Uuid>,
    pub cancellation_reason: Option<String>,
    pub penalty_amount: f64,

    pub recurring_task_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// True for the client or the assigned tasker
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.client_id == user_id || self.assigned_tasker_id == Some(user_id)
    }

    pub fn is_assigned_to(&self, user_id: Uuid) -> bool {
        self.assigned_tasker_id == Some(user_id)
    }

    /// The participant on the other side of `user_id`
    pub fn counterpart_of(&self, user_id: Uuid) -> Option<Uuid> {
        if user_id == self.client_id {
            self.assigned_tasker_id
        } else if self.assigned_tasker_id == Some(user_id) {
            Some(self.client_id)
        } else {
            None
        }
    }

    /// Task site coordinates, if both are set
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    /// Hours in the currently running timer segment, 0 when stopped
    pub fn current_session_hours(&self, now: DateTime<Utc>) -> f64 {
        match (self.is_timer_running, self.timer_started_at) {
            (true, Some(started)) => ((now - started).num_milliseconds() as f64 / 3_600_000.0).max(0.0),
            _ => 0.0,
        }
    }

    /// Accumulated hours plus the running segment
    pub fn hours_worked(&self, now: DateTime<Utc>) -> f64 {
        self.actual_hours_worked + self.current_session_hours(now)
    }
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub client_id: Uuid,
    pub assigned_tasker_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub category_id: Uuid,
    pub subcategory: Option<String>,
    pub duration_hours: f64,
    pub hourly_rate: f64,
    pub total_cost: f64,
    pub task_date: DateTime<Utc>,
    pub address: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub special_instructions: Option<String>,
    pub status: TaskStatus,
    pub recurring_task_id: Option<Uuid>,
}

/// Filters for task listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub category_id: Option<Uuid>,
    pub city: Option<String>,
    pub client_id: Option<Uuid>,
    pub tasker_id: Option<Uuid>,
    pub limit: Option<i64>,
}

/// Aggregated earnings for a tasker
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EarningsSummary {
    pub total_earnings: f64,
    pub total_tasks: i64,
    pub pending_earnings: f64,
    pub pending_count: i64,
    pub week_earnings: f64,
    pub month_earnings: f64,
}

impl Task {
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        data: CreateTask,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO tasks (
                client_id, assigned_tasker_id, title, description, category_id, subcategory,
                duration_hours, hourly_rate, total_cost, task_date, address, city,
                latitude, longitude, special_instructions, status, recurring_task_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(data.client_id)
            .bind(data.assigned_tasker_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.category_id)
            .bind(data.subcategory)
            .bind(data.duration_hours)
            .bind(data.hourly_rate)
            .bind(data.total_cost)
            .bind(data.task_date)
            .bind(data.address)
            .bind(data.city)
            .bind(data.latitude)
            .bind(data.longitude)
            .bind(data.special_instructions)
            .bind(data.status)
            .bind(data.recurring_task_id)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Lists tasks, newest first
    ///
    /// Unassigned tasks are hidden unless `status = posted` is requested.
    pub async fn list(pool: &PgPool, filter: &TaskFilter) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks WHERE TRUE"));

        match filter.status {
            Some(TaskStatus::Posted) => {
                qb.push(" AND status = 'posted'");
            }
            Some(status) => {
                qb.push(" AND assigned_tasker_id IS NOT NULL AND status = ")
                    .push_bind(status);
            }
            None => {
                qb.push(" AND assigned_tasker_id IS NOT NULL");
            }
        }

        if let Some(category_id) = filter.category_id {
            qb.push(" AND category_id = ").push_bind(category_id);
        }
        if let Some(city) = &filter.city {
            qb.push(" AND city ILIKE ").push_bind(format!("%{}%", city));
        }
        if let Some(client_id) = filter.client_id {
            qb.push(" AND client_id = ").push_bind(client_id);
        }
        if let Some(tasker_id) = filter.tasker_id {
            qb.push(" AND assigned_tasker_id = ").push_bind(tasker_id);
        }

        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.limit.unwrap_or(100).clamp(1, 100));

        qb.build_query_as::<Task>().fetch_all(pool).await
    }

    /// Plain status move guarded on the current status
    ///
    /// Moving back to `posted` releases the tasker.
    pub async fn transition<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks
            SET status = $3,
                assigned_tasker_id = CASE WHEN $3 = 'posted'::task_status THEN NULL ELSE assigned_tasker_id END,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(from)
            .bind(to)
            .fetch_optional(executor)
            .await
    }

    /// `assigned → in_progress` by the assigned tasker
    pub async fn accept(
        pool: &PgPool,
        id: Uuid,
        tasker_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks
            SET status = 'in_progress', updated_at = NOW()
            WHERE id = $1 AND status = 'assigned' AND assigned_tasker_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(tasker_id)
            .fetch_optional(pool)
            .await
    }

    /// `assigned → posted`, releasing the tasker and stopping any tracking
    pub async fn reject(
        pool: &PgPool,
        id: Uuid,
        tasker_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks
            SET status = 'posted',
                assigned_tasker_id = NULL,
                is_tracking = FALSE,
                current_latitude = NULL,
                current_longitude = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'assigned' AND assigned_tasker_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(tasker_id)
            .fetch_optional(pool)
            .await
    }

    /// `posted → assigned` from an accepted application
    ///
    /// The booking is repriced at the application's rate.
    pub async fn assign_from_application<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        tasker_id: Uuid,
        hourly_rate: f64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks
            SET status = 'assigned',
                assigned_tasker_id = $2,
                hourly_rate = $3,
                total_cost = ROUND((duration_hours * $3)::NUMERIC, 2)::DOUBLE PRECISION,
                updated_at = NOW()
            WHERE id = $1 AND status = 'posted'
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(tasker_id)
            .bind(hourly_rate)
            .fetch_optional(executor)
            .await
    }

    /// `in_progress → completed`, folding a running timer segment into the total
    pub async fn complete<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks
            SET status = 'completed',
                completed_at = NOW(),
                actual_hours_worked = actual_hours_worked
                    + CASE WHEN is_timer_running THEN {RUNNING_SEGMENT_HOURS} ELSE 0 END,
                timer_stopped_at = CASE WHEN is_timer_running THEN NOW() ELSE timer_stopped_at END,
                is_timer_running = FALSE,
                is_tracking = FALSE,
                updated_at = NOW()
            WHERE id = $1 AND status = 'in_progress'
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Cancels from `expected`, recording who, why, and the penalty
    ///
    /// Stops the timer and tracking.
    pub async fn cancel<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        expected: TaskStatus,
        cancelled_by: Uuid,
        reason: Option<&str>,
        penalty_amount: f64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks
            SET status = 'cancelled',
                cancelled_by = $3,
                cancellation_reason = $4,
                penalty_amount = $5,
                actual_hours_worked = actual_hours_worked
                    + CASE WHEN is_timer_running THEN {RUNNING_SEGMENT_HOURS} ELSE 0 END,
                timer_stopped_at = CASE WHEN is_timer_running THEN NOW() ELSE timer_stopped_at END,
                is_timer_running = FALSE,
                is_tracking = FALSE,
                current_latitude = NULL,
                current_longitude = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(expected)
            .bind(cancelled_by)
            .bind(reason)
            .bind(penalty_amount)
            .fetch_optional(executor)
            .await
    }

    /// Flags a completed task as paid; `None` if it already was
    pub async fn mark_paid<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        method: PaymentMethod,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks
            SET is_paid = TRUE, payment_method = $2, updated_at = NOW()
            WHERE id = $1 AND NOT is_paid
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(method)
            .fetch_optional(executor)
            .await
    }

    /// Starts a timer segment; `None` if one is already running
    pub async fn start_timer(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks
            SET is_timer_running = TRUE,
                timer_started_at = NOW(),
                timer_stopped_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'in_progress' AND NOT is_timer_running
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Closes the running segment into `actual_hours_worked`
    pub async fn stop_timer(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks
            SET actual_hours_worked = actual_hours_worked + {RUNNING_SEGMENT_HOURS},
                is_timer_running = FALSE,
                timer_stopped_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND is_timer_running
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Enables GPS tracking; `None` if already tracking or not trackable
    pub async fn start_tracking(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks
            SET is_tracking = TRUE, tracking_started_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status IN ('assigned', 'in_progress') AND NOT is_tracking
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn stop_tracking(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks
            SET is_tracking = FALSE,
                current_latitude = NULL,
                current_longitude = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Stores the tasker's live position; `None` if tracking is off
    pub async fn update_current_location(
        pool: &PgPool,
        id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks
            SET current_latitude = $2,
                current_longitude = $3,
                last_location_update = NOW()
            WHERE id = $1 AND is_tracking
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(latitude)
            .bind(longitude)
            .fetch_optional(pool)
            .await
    }

    /// Earnings totals; `since` bounds the paid totals by `completed_at`
    pub async fn earnings_summary(
        pool: &PgPool,
        tasker_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<EarningsSummary, sqlx::Error> {
        sqlx::query_as::<_, EarningsSummary>(
            r#"
            SELECT
                COALESCE(SUM(total_cost) FILTER (
                    WHERE is_paid AND ($2::TIMESTAMPTZ IS NULL OR completed_at >= $2)
                ), 0) AS total_earnings,
                COUNT(*) FILTER (
                    WHERE is_paid AND ($2::TIMESTAMPTZ IS NULL OR completed_at >= $2)
                ) AS total_tasks,
                COALESCE(SUM(total_cost) FILTER (WHERE NOT is_paid), 0) AS pending_earnings,
                COUNT(*) FILTER (WHERE NOT is_paid) AS pending_count,
                COALESCE(SUM(total_cost) FILTER (
                    WHERE is_paid AND completed_at >= NOW() - INTERVAL '7 days'
                ), 0) AS week_earnings,
                COALESCE(SUM(total_cost) FILTER (
                    WHERE is_paid AND completed_at >= NOW() - INTERVAL '30 days'
                ), 0) AS month_earnings
            FROM tasks
            WHERE assigned_tasker_id = $1 AND status = 'completed'
            "#,
        )
        .bind(tasker_id)
        .bind(since)
        .fetch_one(pool)
        .await
    }

    /// Latest 50 completed tasks for a tasker, most recent first
    pub async fn earnings_history(
        pool: &PgPool,
        tasker_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {TASK_COLUMNS} FROM tasks
            WHERE assigned_tasker_id = $1 AND status = 'completed'
              AND ($2::TIMESTAMPTZ IS NULL OR completed_at >= $2)
            ORDER BY completed_at DESC
            LIMIT 50
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(tasker_id)
            .bind(since)
            .fetch_all(pool)
            .await
    }

    /// Completed and paid tasks performed by a tasker
    pub async fn count_paid_for_tasker(pool: &PgPool, tasker_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM tasks WHERE assigned_tasker_id = $1 AND status = 'completed' AND is_paid",
        )
        .bind(tasker_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Completed and paid tasks booked by a client
    pub async fn count_paid_for_client(pool: &PgPool, client_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM tasks WHERE client_id = $1 AND status = 'completed' AND is_paid",
        )
        .bind(client_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// `(completed, cancelled)` counts for a tasker's assigned tasks
    pub async fn outcome_counts(pool: &PgPool, tasker_id: Uuid) -> Result<(i64, i64), sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT COUNT(*) FILTER (WHERE status = 'completed'),
                   COUNT(*) FILTER (WHERE status = 'cancelled')
            FROM tasks
            WHERE assigned_tasker_id = $1
            "#,
        )
        .bind(tasker_id)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_task() -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            assigned_tasker_id: Some(Uuid::new_v4()),
            title: "Assemble wardrobe".into(),
            description: "Two-door wardrobe".into(),
            category_id: Uuid::new_v4(),
            subcategory: None,
            duration_hours: 2.0,
            hourly_rate: 5000.0,
            total_cost: 10000.0,
            task_date: now + Duration::days(2),
            address: "Rue 12".into(),
            city: "Abidjan".into(),
            latitude: Some(5.36),
            longitude: None,
            special_instructions: None,
            status: TaskStatus::Assigned,
            is_paid: false,
            payment_method: None,
            is_tracking: false,
            tracking_started_at: None,
            current_latitude: None,
            current_longitude: None,
            last_location_update: None,
            is_timer_running: false,
            timer_started_at: None,
            timer_stopped_at: None,
            actual_hours_worked: 0.0,
            cancelled_by: None,
            cancellation_reason: None,
            penalty_amount: 0.0,
            recurring_task_id: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    #[test]
    fn test_task_status_as_str() {
        assert_eq!(TaskStatus::Posted.as_str(), "posted");
        assert_eq!(TaskStatus::InProgress.as_str(), "in_progress");
        assert_eq!(TaskStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_task_status_parse() {
        assert_eq!("in_progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert!("done".parse::<TaskStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }

    #[test]
    fn test_task_status_is_terminal() {
        assert!(!TaskStatus::Posted.is_terminal());
        assert!(!TaskStatus::Assigned.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_task_status_transitions() {
        use TaskStatus::*;

        assert!(Posted.can_transition_to(Assigned));
        assert!(Posted.can_transition_to(Cancelled));
        assert!(!Posted.can_transition_to(InProgress));

        assert!(Assigned.can_transition_to(InProgress));
        assert!(Assigned.can_transition_to(Posted));
        assert!(Assigned.can_transition_to(Cancelled));
        assert!(!Assigned.can_transition_to(Completed));

        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Cancelled));
        assert!(!InProgress.can_transition_to(Assigned));

        for target in [Posted, Assigned, InProgress, Completed, Cancelled] {
            assert!(!Completed.can_transition_to(target));
            assert!(!Cancelled.can_transition_to(target));
        }
    }

    #[test]
    fn test_participants() {
        let task = sample_task();
        let tasker = task.assigned_tasker_id.unwrap();

        assert!(task.is_participant(task.client_id));
        assert!(task.is_participant(tasker));
        assert!(!task.is_participant(Uuid::new_v4()));
        assert_eq!(task.counterpart_of(task.client_id), Some(tasker));
        assert_eq!(task.counterpart_of(tasker), Some(task.client_id));
        assert_eq!(task.counterpart_of(Uuid::new_v4()), None);
    }

    #[test]
    fn test_coordinates_need_both_axes() {
        let mut task = sample_task();
        assert!(task.coordinates().is_none());
        task.longitude = Some(-4.0);
        assert_eq!(task.coordinates(), Some((5.36, -4.0)));
    }

    #[test]
    fn test_hours_worked_includes_running_segment() {
        let now = Utc::now();
        let mut task = sample_task();
        task.actual_hours_worked = 1.5;
        assert_eq!(task.hours_worked(now), 1.5);

        task.is_timer_running = true;
        task.timer_started_at = Some(now - Duration::minutes(30));
        assert!((task.current_session_hours(now) - 0.5).abs() < 1e-9);
        assert!((task.hours_worked(now) - 2.0).abs() < 1e-9);
    }
}
