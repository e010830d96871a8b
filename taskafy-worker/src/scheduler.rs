/// Recurring booking scheduler
///
/// Turns due recurring schedules into real bookings.
///
/// # Flow
///
/// ```text
/// every poll interval
///   repeat up to batch_size times, one transaction each:
///     claim the earliest due active schedule (FOR UPDATE SKIP LOCKED)
///     insert an `assigned` task dated at the occurrence
///     notify the tasker
///     advance next_occurrence / last_generated_at
/// ```
///
/// Row locks let several worker replicas share the table without
/// generating the same occurrence twice.
///
/// # Example
///
/// ```no_run
/// use taskafy_worker::scheduler::{RecurringScheduler, SchedulerConfig};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> anyhow::Result<()> {
/// let scheduler = RecurringScheduler::new(pool, SchedulerConfig::default());
/// let shutdown = scheduler.shutdown_token();
///
/// tokio::spawn(async move {
///     let _ = tokio::signal::ctrl_c().await;
///     shutdown.cancel();
/// });
///
/// scheduler.run().await;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use std::time::Duration;
use taskafy_shared::{
    models::{
        notification::{Notification, NotificationKind},
        recurring::RecurringTask,
        task::{CreateTask, Task, TaskStatus},
        user::User,
    },
    pricing,
    recurrence::{self, RecurrenceError},
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Address used when the client has none on file
pub const ADDRESS_FALLBACK: &str = "To be confirmed";

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The stored schedule no longer yields a valid next occurrence
    #[error("Schedule {id} is invalid: {source}")]
    InvalidSchedule {
        id: Uuid,
        #[source]
        source: RecurrenceError,
    },
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub poll_interval: Duration,

    /// Schedules materialized per scan
    pub batch_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            poll_interval: Duration::from_secs(60),
            batch_size: 20,
        }
    }
}

/// One generated booking
#[derive(Debug, Clone)]
pub struct GeneratedTask {
    pub schedule_id: Uuid,
    pub task: Task,
    pub next_occurrence: DateTime<Utc>,
}

pub struct RecurringScheduler {
    db: PgPool,
    config: SchedulerConfig,
    shutdown_token: CancellationToken,
}

impl RecurringScheduler {
    pub fn new(db: PgPool, config: SchedulerConfig) -> Self {
        RecurringScheduler {
            db,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Cancelling the token stops [`run`](Self::run) after the current scan
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Scans until shutdown
    pub async fn run(&self) {
        tracing::info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            batch_size = self.config.batch_size,
            "Recurring scheduler starting"
        );

        loop {
            match self.run_once(Utc::now()).await {
                Ok(0) => {}
                Ok(count) => tracing::info!(count, "Generated recurring bookings"),
                Err(e) => tracing::error!(error = %e, "Recurring scan failed"),
            }

            tokio::select! {
                _ = self.shutdown_token.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        tracing::info!("Recurring scheduler stopped");
    }

    /// Materializes up to `batch_size` schedules due at `now`
    ///
    /// An invalid schedule is deactivated and the batch continues. A
    /// database error ends the scan.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<usize, SchedulerError> {
        let mut generated = 0;

        for _ in 0..self.config.batch_size {
            if self.shutdown_token.is_cancelled() {
                break;
            }

            match self.generate_next(now).await {
                Ok(Some(result)) => {
                    generated += 1;
                    tracing::info!(
                        schedule_id = %result.schedule_id,
                        task_id = %result.task.id,
                        task_date = %result.task.task_date,
                        next_occurrence = %result.next_occurrence,
                        "Recurring booking created"
                    );
                }
                Ok(None) => break,
                Err(SchedulerError::InvalidSchedule { id, source }) => {
                    tracing::warn!(schedule_id = %id, error = %source, "Deactivating invalid schedule");
                    deactivate(&self.db, id).await?;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(generated)
    }

    /// Claims and materializes the earliest due schedule, if any
    pub async fn generate_next(&self, now: DateTime<Utc>) -> Result<Option<GeneratedTask>, SchedulerError> {
        let mut tx = self.db.begin().await?;

        let Some(schedule) = RecurringTask::claim_next_due(&mut *tx, now).await? else {
            return Ok(None);
        };

        let next_occurrence = following_occurrence(&schedule, now)?;
        let task = create_booking(&mut *tx, &schedule).await?;

        Notification::create(
            &mut *tx,
            schedule.assigned_tasker_id,
            NotificationKind::RecurringTaskGenerated,
            "New recurring booking",
            &format!(
                "\"{}\" is booked for {}",
                schedule.title,
                schedule.next_occurrence.format("%Y-%m-%d %H:%M UTC")
            ),
            Some(task.id),
        )
        .await?;

        RecurringTask::advance(&mut *tx, schedule.id, next_occurrence).await?;

        tx.commit().await?;

        Ok(Some(GeneratedTask {
            schedule_id: schedule.id,
            task,
            next_occurrence,
        }))
    }
}

/// Next occurrence after the one being generated
///
/// Occurrences missed while the worker was down are skipped: if stepping
/// from the current occurrence still lands in the past, the schedule
/// restarts from `now`.
pub fn following_occurrence(
    schedule: &RecurringTask,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, SchedulerError> {
    let step = |after: DateTime<Utc>| {
        recurrence::next_occurrence(
            after,
            schedule.frequency,
            &schedule.scheduled_time,
            schedule.day_of_week,
            schedule.day_of_month,
        )
        .map_err(|source| SchedulerError::InvalidSchedule {
            id: schedule.id,
            source,
        })
    };

    let next = step(schedule.next_occurrence)?;
    if next > now {
        Ok(next)
    } else {
        step(now)
    }
}

async fn create_booking(conn: &mut PgConnection, schedule: &RecurringTask) -> Result<Task, SchedulerError> {
    let client = User::find_by_id(&mut *conn, schedule.client_id).await?;

    let (address, city, latitude, longitude) = match client {
        Some(user) => (user.address, user.city, user.latitude, user.longitude),
        None => (None, None, None, None),
    };

    let task = Task::create(
        &mut *conn,
        CreateTask {
            client_id: schedule.client_id,
            assigned_tasker_id: Some(schedule.assigned_tasker_id),
            title: schedule.title.clone(),
            description: schedule.description.clone(),
            category_id: schedule.category_id,
            subcategory: None,
            duration_hours: schedule.estimated_hours,
            hourly_rate: schedule.hourly_rate,
            total_cost: pricing::total_cost(schedule.estimated_hours, schedule.hourly_rate),
            task_date: schedule.next_occurrence,
            address: non_empty_or(address, ADDRESS_FALLBACK),
            city: non_empty_or(city, ADDRESS_FALLBACK),
            latitude,
            longitude,
            special_instructions: None,
            status: TaskStatus::Assigned,
            recurring_task_id: Some(schedule.id),
        },
    )
    .await?;

    Ok(task)
}

fn non_empty_or(value: Option<String>, fallback: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

async fn deactivate(db: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE recurring_tasks SET is_active = FALSE WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use taskafy_shared::models::recurring::RecurrenceFrequency;

    fn schedule(frequency: RecurrenceFrequency, next: DateTime<Utc>) -> RecurringTask {
        RecurringTask {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            assigned_tasker_id: Uuid::new_v4(),
            title: "Garden upkeep".into(),
            description: "Mow and trim".into(),
            category_id: Uuid::new_v4(),
            frequency,
            scheduled_time: "08:00".into(),
            day_of_week: None,
            day_of_month: None,
            hourly_rate: 3000.0,
            estimated_hours: 2.0,
            next_occurrence: next,
            is_active: true,
            created_at: next - ChronoDuration::days(30),
            last_generated_at: None,
        }
    }

    #[test]
    fn test_following_occurrence_steps_from_current() {
        let occurrence = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();
        let now = occurrence + ChronoDuration::minutes(5);

        let next = following_occurrence(&schedule(RecurrenceFrequency::Daily, occurrence), now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 11, 8, 0, 0).unwrap());

        let next = following_occurrence(&schedule(RecurrenceFrequency::Biweekly, occurrence), now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 24, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_following_occurrence_skips_missed_runs() {
        let occurrence = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();

        let next = following_occurrence(&schedule(RecurrenceFrequency::Daily, occurrence), now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 11, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_invalid_schedule_is_reported() {
        let occurrence = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();
        let broken = schedule(RecurrenceFrequency::Weekly, occurrence);

        let err = following_occurrence(&broken, occurrence).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::InvalidSchedule { source: RecurrenceError::MissingDayOfWeek, .. }
        ));
    }

    #[test]
    fn test_non_empty_or() {
        assert_eq!(non_empty_or(Some("  Cocody ".into()), ADDRESS_FALLBACK), "Cocody");
        assert_eq!(non_empty_or(Some("   ".into()), ADDRESS_FALLBACK), ADDRESS_FALLBACK);
        assert_eq!(non_empty_or(None, ADDRESS_FALLBACK), ADDRESS_FALLBACK);
    }
}
