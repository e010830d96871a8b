/// Client reviews of completed bookings
///
/// One review per task. Inserting a review and refreshing the tasker's
/// cached rating happen in one transaction, see [`Review::create_and_refresh`].

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::task::{Task, TaskStatus};
use super::user::TaskerProfile;

/// Days after completion during which a review may be left
pub const REVIEW_WINDOW_DAYS: i64 = 7;

const REVIEW_COLUMNS: &str =
    "id, task_id, tasker_id, client_id, client_name, rating, comment, verified_booking, created_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub task_id: Uuid,
    pub tasker_id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    pub rating: i32,
    pub comment: String,
    pub verified_booking: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateReview {
    pub task_id: Uuid,
    pub tasker_id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    pub rating: i32,
    pub comment: String,
}

/// Why a client may or may not review a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewEligibility {
    Eligible,
    NotYourTask,
    NotCompletedAndPaid,
    AlreadyReviewed,
    WindowExpired,
}

impl ReviewEligibility {
    /// Evaluates the rules against a loaded task
    pub fn check(task: &Task, client_id: Uuid, already_reviewed: bool, now: DateTime<Utc>) -> Self {
        if task.client_id != client_id {
            return ReviewEligibility::NotYourTask;
        }
        if task.status != TaskStatus::Completed || !task.is_paid {
            return ReviewEligibility::NotCompletedAndPaid;
        }
        if already_reviewed {
            return ReviewEligibility::AlreadyReviewed;
        }
        match task.completed_at {
            Some(completed_at) if now - completed_at > Duration::days(REVIEW_WINDOW_DAYS) => {
                ReviewEligibility::WindowExpired
            }
            _ => ReviewEligibility::Eligible,
        }
    }

    pub fn is_eligible(&self) -> bool {
        *self == ReviewEligibility::Eligible
    }

    pub fn reason(&self) -> &'static str {
        match self {
            ReviewEligibility::Eligible => "You can review this task",
            ReviewEligibility::NotYourTask => "Not your task",
            ReviewEligibility::NotCompletedAndPaid => "Task must be completed and paid",
            ReviewEligibility::AlreadyReviewed => "Already reviewed",
            ReviewEligibility::WindowExpired => "Review window expired",
        }
    }
}

/// Star-count histogram plus the average
#[derive(Debug, Clone, Serialize)]
pub struct RatingBreakdown {
    pub average_rating: f64,
    pub total_reviews: i64,
    pub rating_distribution: BTreeMap<String, i64>,
}

impl Review {
    /// Inserts the review and recomputes the tasker's rating cache atomically
    pub async fn create_and_refresh(pool: &PgPool, data: CreateReview) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            r#"
            INSERT INTO reviews (task_id, tasker_id, client_id, client_name, rating, comment, verified_booking)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            RETURNING {REVIEW_COLUMNS}
            "#
        );

        let review = sqlx::query_as::<_, Review>(&query)
            .bind(data.task_id)
            .bind(data.tasker_id)
            .bind(data.client_id)
            .bind(data.client_name)
            .bind(data.rating)
            .bind(data.comment)
            .fetch_one(&mut *tx)
            .await?;

        TaskerProfile::refresh_rating(&mut *tx, review.tasker_id).await?;

        tx.commit().await?;
        Ok(review)
    }

    pub async fn exists_for_task(pool: &PgPool, task_id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM reviews WHERE task_id = $1)")
            .bind(task_id)
            .fetch_one(pool)
            .await
    }

    pub async fn list_for_tasker(pool: &PgPool, tasker_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE tasker_id = $1 ORDER BY created_at DESC LIMIT 100"
        );

        sqlx::query_as::<_, Review>(&query)
            .bind(tasker_id)
            .fetch_all(pool)
            .await
    }

    pub async fn rating_breakdown(pool: &PgPool, tasker_id: Uuid) -> Result<RatingBreakdown, sqlx::Error> {
        let rows: Vec<(i32, i64)> = sqlx::query_as(
            "SELECT rating, COUNT(*) FROM reviews WHERE tasker_id = $1 GROUP BY rating",
        )
        .bind(tasker_id)
        .fetch_all(pool)
        .await?;

        Ok(RatingBreakdown::from_counts(&rows))
    }
}

impl RatingBreakdown {
    /// Builds the histogram from `(stars, count)` pairs
    pub fn from_counts(rows: &[(i32, i64)]) -> Self {
        let mut rating_distribution: BTreeMap<String, i64> =
            (1..=5).map(|stars: i32| (stars.to_string(), 0)).collect();

        let mut total = 0i64;
        let mut sum = 0i64;
        for &(stars, count) in rows {
            if let Some(slot) = rating_distribution.get_mut(&stars.to_string()) {
                *slot += count;
                total += count;
                sum += stars as i64 * count;
            }
        }

        let average_rating = if total > 0 {
            crate::pricing::round1(sum as f64 / total as f64)
        } else {
            0.0
        };

        Self {
            average_rating,
            total_reviews: total,
            rating_distribution,
        }
    }
}
