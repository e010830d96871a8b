/// Coin balance and ledger
///
/// Every balance change goes through `CoinTransaction::record`, which writes
/// the ledger row and moves the balance in one transaction.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::load_task,
};
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use taskafy_shared::{
    auth::{authorization::require_admin, middleware::AuthContext},
    models::{
        coin::{discount_for, CoinEntry, CoinOutcome, CoinTransaction, CoinTransactionType},
        user::User,
    },
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct Balance {
    pub balance: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AwardRequest {
    pub user_id: Uuid,

    #[validate(range(min = 1, message = "Amount must be greater than 0"))]
    pub amount: i64,

    #[serde(default = "default_award_type")]
    pub transaction_type: CoinTransactionType,

    #[validate(length(min = 1, max = 200, message = "Description must be 1 to 200 characters"))]
    pub description: String,
}

fn default_award_type() -> CoinTransactionType {
    CoinTransactionType::AdminAward
}

#[derive(Debug, Deserialize, Validate)]
pub struct SpendRequest {
    #[validate(range(min = 1, message = "Amount must be greater than 0"))]
    pub amount: i64,

    pub task_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct AwardResponse {
    pub transaction: CoinTransaction,
    pub new_balance: i64,
}

#[derive(Debug, Serialize)]
pub struct SpendResponse {
    pub new_balance: i64,
    /// CFA francs
    pub discount_amount: i64,
}

pub async fn balance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Balance>> {
    let balance = User::coin_balance(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(Balance { balance }))
}

pub async fn transactions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<CoinTransaction>>> {
    Ok(Json(CoinTransaction::list_for_user(&state.db, auth.user_id).await?))
}

pub async fn award(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AwardRequest>,
) -> ApiResult<Json<AwardResponse>> {
    require_admin(&auth)?;
    req.validate()?;

    let outcome = CoinTransaction::record_atomic(
        &state.db,
        CoinEntry {
            user_id: req.user_id,
            amount: req.amount,
            transaction_type: req.transaction_type,
            description: &req.description,
            task_id: None,
        },
    )
    .await?;

    match outcome {
        CoinOutcome::Recorded {
            transaction,
            new_balance,
        } => {
            tracing::info!(
                user_id = %req.user_id,
                admin_id = %auth.user_id,
                amount = req.amount,
                new_balance,
                "Coins awarded"
            );
            Ok(Json(AwardResponse {
                transaction,
                new_balance,
            }))
        }
        CoinOutcome::UnknownUser => Err(ApiError::NotFound("User not found".to_string())),
        CoinOutcome::Duplicate => Err(ApiError::BadRequest(
            "This one-off credit was already granted".to_string(),
        )),
        CoinOutcome::InsufficientBalance { balance } => Err(ApiError::BadRequest(format!(
            "Insufficient balance: {}",
            balance
        ))),
    }
}

/// Spends coins as a discount on one of the caller's bookings
pub async fn spend(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<SpendRequest>,
) -> ApiResult<Json<SpendResponse>> {
    req.validate()?;

    let task = load_task(&state.db, req.task_id).await?;
    if task.client_id != auth.user_id {
        return Err(ApiError::Forbidden("Not your task".to_string()));
    }

    let description = format!("Discount on \"{}\"", task.title);
    let outcome = CoinTransaction::record_atomic(
        &state.db,
        CoinEntry {
            user_id: auth.user_id,
            amount: -req.amount,
            transaction_type: CoinTransactionType::BookingDiscount,
            description: &description,
            task_id: Some(task.id),
        },
    )
    .await?;

    match outcome {
        CoinOutcome::Recorded { new_balance, .. } => {
            tracing::info!(user_id = %auth.user_id, task_id = %task.id, spent = req.amount, new_balance, "Coins spent");
            Ok(Json(SpendResponse {
                new_balance,
                discount_amount: discount_for(req.amount),
            }))
        }
        CoinOutcome::InsufficientBalance { balance } => Err(ApiError::BadRequest(format!(
            "Insufficient coin balance: you have {} coins",
            balance
        ))),
        CoinOutcome::UnknownUser => Err(ApiError::NotFound("User not found".to_string())),
        CoinOutcome::Duplicate => Err(ApiError::Conflict("Discount already applied".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_award_defaults_to_admin_award() {
        let req: AwardRequest = serde_json::from_value(serde_json::json!({
            "user_id": Uuid::new_v4(),
            "amount": 25,
            "description": "Community helper"
        }))
        .unwrap();
        assert_eq!(req.transaction_type, CoinTransactionType::AdminAward);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_spend_rejects_non_positive_amount() {
        let req = SpendRequest {
            amount: 0,
            task_id: Uuid::new_v4(),
        };
        assert!(req.validate().is_err());
    }
}
