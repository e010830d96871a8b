/// Coin rewards ledger
///
/// `users.coin_balance` is a cache of the signed sum of a user's
/// `coin_transactions`. [`CoinTransaction::record`] locks the user row,
/// writes the ledger row and adjusts the balance on the same connection, so
/// callers run it inside a transaction together with whatever triggered it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Coins granted on registration
pub const WELCOME_BONUS: i64 = 50;

/// Coins granted to the client when a task completes
pub const TASK_REWARD: i64 = 10;

/// CFA discount per coin spent
pub const COIN_VALUE_CFA: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "coin_transaction_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CoinTransactionType {
    WelcomeBonus,
    TaskReward,
    BookingDiscount,
    Referral,
    AdminAward,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CoinTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub transaction_type: CoinTransactionType,
    pub description: String,
    pub task_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Result of a ledger write
#[derive(Debug, Clone)]
pub enum CoinOutcome {
    Recorded {
        transaction: CoinTransaction,
        new_balance: i64,
    },
    /// A one-off credit (welcome bonus, per-task reward) already exists
    Duplicate,
    /// The debit would take the balance below zero; roll the transaction back
    InsufficientBalance { balance: i64 },
    /// The user row doesn't exist
    UnknownUser,
}

/// Ledger entry to write
#[derive(Debug, Clone)]
pub struct CoinEntry<'a> {
    pub user_id: Uuid,
    pub amount: i64,
    pub transaction_type: CoinTransactionType,
    pub description: &'a str,
    pub task_id: Option<Uuid>,
}

impl CoinTransaction {
    /// Locks the user's row, inserts the ledger row, then moves the balance
    ///
    /// The insert is skipped for duplicate one-off credits. A debit that would
    /// take the balance below zero writes nothing.
    pub async fn record(conn: &mut PgConnection, entry: CoinEntry<'_>) -> Result<CoinOutcome, sqlx::Error> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT coin_balance FROM users WHERE id = $1 FOR UPDATE")
                .bind(entry.user_id)
                .fetch_optional(&mut *conn)
                .await?;

        let Some(balance) = balance else {
            return Ok(CoinOutcome::UnknownUser);
        };

        if balance + entry.amount < 0 {
            return Ok(CoinOutcome::InsufficientBalance { balance });
        }

        let transaction = sqlx::query_as::<_, CoinTransaction>(
            r#"
            INSERT INTO coin_transactions (user_id, amount, transaction_type, description, task_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            RETURNING id, user_id, amount, transaction_type, description, task_id, created_at
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.amount)
        .bind(entry.transaction_type)
        .bind(entry.description)
        .bind(entry.task_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(transaction) = transaction else {
            return Ok(CoinOutcome::Duplicate);
        };

        let new_balance: i64 = sqlx::query_scalar(
            r#"
            UPDATE users SET coin_balance = coin_balance + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING coin_balance
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.amount)
        .fetch_one(&mut *conn)
        .await?;

        Ok(CoinOutcome::Recorded {
            transaction,
            new_balance,
        })
    }

    /// Records a standalone entry in its own transaction
    ///
    /// Anything other than `Recorded` rolls back.
    pub async fn record_atomic(pool: &PgPool, entry: CoinEntry<'_>) -> Result<CoinOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let outcome = Self::record(&mut *tx, entry).await?;

        if matches!(outcome, CoinOutcome::Recorded { .. }) {
            tx.commit().await?;
        } else {
            tx.rollback().await?;
        }

        Ok(outcome)
    }

    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CoinTransaction>(
            r#"
            SELECT id, user_id, amount, transaction_type, description, task_id, created_at
            FROM coin_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 50
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}

/// CFA discount for spending `coins`
pub fn discount_for(coins: i64) -> i64 {
    coins * COIN_VALUE_CFA
}
