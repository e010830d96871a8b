/// Paydunya invoices and the raw IPN log
///
/// An invoice row is created `pending` when checkout starts. It moves to
/// `completed` (or `failed`) when the gateway confirms it, either through the
/// client-driven verify call or the IPN webhook. Completion and the task's
/// paid flag are written together by [`PaydunyaPayment::complete_with_task`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::payment::{PaymentMethod, PaymentStatus};
use super::task::Task;

const PAYDUNYA_COLUMNS: &str = "id, task_id, user_id, invoice_token, amount, currency, status, \
     checkout_url, receipt_url, customer, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaydunyaPayment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub invoice_token: String,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    pub checkout_url: Option<String>,
    pub receipt_url: Option<String>,
    pub customer: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreatePaydunyaPayment {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub invoice_token: String,
    pub amount: f64,
    pub checkout_url: Option<String>,
}

impl PaydunyaPayment {
    /// Whether a gateway-reported total covers this invoice
    ///
    /// Invoices are opened for the rounded amount in whole francs. A missing
    /// total is accepted.
    pub fn amount_matches(&self, reported: Option<i64>) -> bool {
        reported.map_or(true, |total| total == self.amount.round() as i64)
    }

    pub async fn create(pool: &PgPool, data: CreatePaydunyaPayment) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO paydunya_payments (task_id, user_id, invoice_token, amount, checkout_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PAYDUNYA_COLUMNS}
            "#
        );

        sqlx::query_as::<_, PaydunyaPayment>(&query)
            .bind(data.task_id)
            .bind(data.user_id)
            .bind(data.invoice_token)
            .bind(data.amount)
            .bind(data.checkout_url)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_token(pool: &PgPool, token: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {PAYDUNYA_COLUMNS} FROM paydunya_payments WHERE invoice_token = $1");

        sqlx::query_as::<_, PaydunyaPayment>(&query)
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {PAYDUNYA_COLUMNS} FROM paydunya_payments WHERE user_id = $1 ORDER BY created_at DESC LIMIT 50"
        );

        sqlx::query_as::<_, PaydunyaPayment>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Marks a still-pending invoice failed
    pub async fn mark_failed(pool: &PgPool, token: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE paydunya_payments SET status = 'failed', updated_at = NOW()
            WHERE invoice_token = $1 AND status = 'pending'
            RETURNING {PAYDUNYA_COLUMNS}
            "#
        );

        sqlx::query_as::<_, PaydunyaPayment>(&query)
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    /// Completes the invoice and flags its task paid in one transaction
    ///
    /// Idempotent: an invoice that is already completed is returned unchanged
    /// and the task is not touched again.
    pub async fn complete_with_task(
        pool: &PgPool,
        token: &str,
        receipt_url: Option<String>,
        customer: Option<serde_json::Value>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            r#"
            UPDATE paydunya_payments
            SET status = 'completed',
                receipt_url = COALESCE($2, receipt_url),
                customer = COALESCE($3, customer),
                updated_at = NOW()
            WHERE invoice_token = $1 AND status <> 'completed'
            RETURNING {PAYDUNYA_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, PaydunyaPayment>(&query)
            .bind(token)
            .bind(receipt_url)
            .bind(customer)
            .fetch_optional(&mut *tx)
            .await?;

        let payment = match updated {
            Some(payment) => {
                Task::mark_paid(&mut *tx, payment.task_id, PaymentMethod::Paydunya).await?;
                payment
            }
            None => {
                let query = format!(
                    "SELECT {PAYDUNYA_COLUMNS} FROM paydunya_payments WHERE invoice_token = $1"
                );
                match sqlx::query_as::<_, PaydunyaPayment>(&query)
                    .bind(token)
                    .fetch_optional(&mut *tx)
                    .await?
                {
                    Some(existing) => existing,
                    None => return Ok(None),
                }
            }
        };

        tx.commit().await?;
        Ok(Some(payment))
    }
}

/// Raw gateway callback, kept for audit
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentWebhook {
    pub id: Uuid,
    pub provider: String,
    pub token: Option<String>,
    pub payload: serde_json::Value,
    pub signature_valid: bool,
    pub received_at: DateTime<Utc>,
}

impl PaymentWebhook {
    pub async fn record(
        pool: &PgPool,
        provider: &str,
        token: Option<&str>,
        payload: serde_json::Value,
        signature_valid: bool,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, PaymentWebhook>(
            r#"
            INSERT INTO payment_webhooks (provider, token, payload, signature_valid)
            VALUES ($1, $2, $3, $4)
            RETURNING id, provider, token, payload, signature_valid, received_at
            "#,
        )
        .bind(provider)
        .bind(token)
        .bind(payload)
        .bind(signature_valid)
        .fetch_one(pool)
        .await
    }
}
