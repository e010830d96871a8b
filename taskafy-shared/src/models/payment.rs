/// Cash ledger payments
///
/// A payment is created `pending` by the client and completed by either
/// participant; completing it flags the task as paid. Gateway payments live
/// in [`super::paydunya`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    OrangeMoney,
    Wave,
    Paypal,
    Paydunya,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::OrangeMoney => "orange_money",
            PaymentMethod::Wave => "wave",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::Paydunya => "paydunya",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

const PAYMENT_COLUMNS: &str = "id, task_id, client_id, tasker_id, amount, payment_method, status, \
     transaction_id, created_at, completed_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub client_id: Uuid,
    pub tasker_id: Uuid,
    pub amount: f64,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
    /// `TXN-<uuid>`
    pub transaction_id: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub task_id: Uuid,
    pub client_id: Uuid,
    pub tasker_id: Uuid,
    pub amount: f64,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
}

/// Generates a ledger transaction reference
pub fn new_transaction_id() -> String {
    format!("TXN-{}", Uuid::new_v4())
}

impl Payment {
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        data: CreatePayment,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO payments (task_id, client_id, tasker_id, amount, payment_method, status, transaction_id, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, CASE WHEN $6 = 'completed'::payment_status THEN NOW() END)
            RETURNING {PAYMENT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Payment>(&query)
            .bind(data.task_id)
            .bind(data.client_id)
            .bind(data.tasker_id)
            .bind(data.amount)
            .bind(data.payment_method)
            .bind(data.status)
            .bind(new_transaction_id())
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1");

        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// `pending → completed`; `None` if the payment was not pending
    pub async fn complete<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE payments SET status = 'completed', completed_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {PAYMENT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn list_for_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE task_id = $1 ORDER BY created_at DESC LIMIT 100"
        );

        sqlx::query_as::<_, Payment>(&query)
            .bind(task_id)
            .fetch_all(pool)
            .await
    }
}
