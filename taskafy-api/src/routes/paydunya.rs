/// Paydunya checkout
///
/// # Flow
///
/// 1. `POST /api/payments/create-invoice` opens a checkout invoice for a
///    completed, unpaid task and stores it `pending`
/// 2. The client pays on the gateway's hosted page
/// 3. Either the client calls `GET /api/payments/verify/:token`, or the
///    gateway posts its IPN to `/api/payments/webhook/paydunya-ipn`
/// 4. Completion flags the task paid; repeated confirmations are no-ops
///
/// IPN payloads are logged before anything else and the endpoint always
/// acknowledges, so the gateway does not retry on our errors.

use std::collections::HashMap;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{load_task, notify},
};
use axum::{
    extract::{Path, State},
    Extension, Form, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use taskafy_shared::{
    auth::{authorization::require_role, middleware::AuthContext},
    models::{
        notification::NotificationKind,
        paydunya::{CreatePaydunyaPayment, PaydunyaPayment, PaymentWebhook},
        task::TaskStatus,
        user::{User, UserRole},
    },
    paydunya::{verify_ipn_hash, Customer, InvoiceRequest, InvoiceState, DEFAULT_CHANNELS},
};
use uuid::Uuid;

const PROVIDER: &str = "paydunya";

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    pub task_id: Uuid,
    pub channels: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct CreateInvoiceResponse {
    pub token: String,
    pub checkout_url: String,
    pub payment_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub status: InvoiceState,
    pub payment: PaydunyaPayment,
}

pub async fn create_invoice(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateInvoiceRequest>,
) -> ApiResult<Json<CreateInvoiceResponse>> {
    require_role(&auth, &[UserRole::Client])?;

    let task = load_task(&state.db, req.task_id).await?;
    if task.client_id != auth.user_id {
        return Err(ApiError::Forbidden("Not your task".to_string()));
    }
    if task.status != TaskStatus::Completed {
        return Err(ApiError::BadRequest(
            "Task must be completed before payment".to_string(),
        ));
    }
    if task.is_paid {
        return Err(ApiError::BadRequest("Task is already paid".to_string()));
    }
    if task.total_cost <= 0.0 {
        return Err(ApiError::BadRequest("Task has nothing to pay".to_string()));
    }

    let client = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let channels = req
        .channels
        .filter(|channels| !channels.is_empty())
        .unwrap_or_else(|| DEFAULT_CHANNELS.iter().map(|c| c.to_string()).collect());

    let invoice = state
        .gateway
        .create_invoice(InvoiceRequest {
            task_id: task.id,
            amount: task.total_cost.round() as i64,
            description: format!("TaskAfy: {}", task.title),
            customer: Customer {
                name: Some(client.full_name),
                email: Some(client.email),
                phone: client.phone,
            },
            channels,
            return_url: state.config.payment_return_url(task.id),
            cancel_url: state.config.payment_cancel_url(task.id),
            callback_url: state.config.ipn_callback_url(),
        })
        .await?;

    let payment = PaydunyaPayment::create(
        &state.db,
        CreatePaydunyaPayment {
            task_id: task.id,
            user_id: auth.user_id,
            invoice_token: invoice.token.clone(),
            amount: task.total_cost,
            checkout_url: Some(invoice.checkout_url.clone()),
        },
    )
    .await?;

    tracing::info!(
        task_id = %task.id,
        payment_id = %payment.id,
        amount = task.total_cost,
        "Paydunya invoice created"
    );

    Ok(Json(CreateInvoiceResponse {
        token: invoice.token,
        checkout_url: invoice.checkout_url,
        payment_id: payment.id,
    }))
}

/// Applies a confirmed gateway state to the stored invoice
///
/// A completion whose reported total differs from the invoice amount marks
/// the invoice failed instead. Returns the payment row after the update.
async fn apply_invoice_state(
    state: &AppState,
    token: &str,
    status: InvoiceState,
    receipt_url: Option<String>,
    customer: Option<Customer>,
    total_amount: Option<i64>,
) -> ApiResult<Option<PaydunyaPayment>> {
    match status {
        InvoiceState::Completed => {
            if let Some(stored) = PaydunyaPayment::find_by_token(&state.db, token).await? {
                if !stored.amount_matches(total_amount) {
                    tracing::warn!(
                        token,
                        task_id = %stored.task_id,
                        expected = stored.amount,
                        reported = ?total_amount,
                        "Paydunya total does not match invoice, marking it failed"
                    );
                    PaydunyaPayment::mark_failed(&state.db, token).await?;
                    return Ok(PaydunyaPayment::find_by_token(&state.db, token).await?);
                }
            }

            let customer = customer.map(|c| json!(c));
            let payment =
                PaydunyaPayment::complete_with_task(&state.db, token, receipt_url, customer).await?;

            if let Some(payment) = &payment {
                tracing::info!(task_id = %payment.task_id, token, "Paydunya payment completed");

                if let Ok(task) = load_task(&state.db, payment.task_id).await {
                    if let Some(tasker_id) = task.assigned_tasker_id {
                        notify(
                            &state.db,
                            tasker_id,
                            NotificationKind::PaymentReceived,
                            "Payment received",
                            &format!("Payment received for \"{}\"", task.title),
                            Some(task.id),
                        )
                        .await;
                    }
                }
            }

            Ok(payment)
        }
        InvoiceState::Cancelled => {
            PaydunyaPayment::mark_failed(&state.db, token).await?;
            tracing::info!(token, "Paydunya invoice cancelled");
            Ok(PaydunyaPayment::find_by_token(&state.db, token).await?)
        }
        InvoiceState::Pending => Ok(PaydunyaPayment::find_by_token(&state.db, token).await?),
    }
}

pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(token): Path<String>,
) -> ApiResult<Json<VerifyResponse>> {
    let payment = PaydunyaPayment::find_by_token(&state.db, &token)
        .await?
        .ok_or_else(|| ApiError::NotFound("Payment not found".to_string()))?;

    if payment.user_id != auth.user_id {
        return Err(ApiError::Forbidden("Not your payment".to_string()));
    }

    let confirmed = state.gateway.confirm_invoice(&token).await?;

    let payment = apply_invoice_state(
        &state,
        &token,
        confirmed.status,
        confirmed.receipt_url,
        confirmed.customer,
        confirmed.total_amount,
    )
    .await?
    .unwrap_or(payment);

    Ok(Json(VerifyResponse {
        status: confirmed.status,
        payment,
    }))
}

/// Extracts the invoice token from the field spellings the gateway uses
fn ipn_token(form: &HashMap<String, String>) -> Option<&str> {
    ["data[invoice][token]", "invoice_token", "token"]
        .iter()
        .find_map(|key| form.get(*key))
        .map(String::as_str)
        .filter(|token| !token.is_empty())
}

/// Invoice total reported by the gateway, in whole francs
fn ipn_total_amount(form: &HashMap<String, String>) -> Option<i64> {
    form.get("data[invoice][total_amount]")
        .and_then(|amount| amount.trim().parse::<f64>().ok())
        .map(|amount| amount.round() as i64)
}

fn ipn_status(form: &HashMap<String, String>) -> InvoiceState {
    form.get("data[status]")
        .or_else(|| form.get("status"))
        .map(|status| InvoiceState::parse(status))
        .unwrap_or(InvoiceState::Pending)
}

/// Gateway callback; public and always acknowledged
pub async fn ipn_webhook(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let token = ipn_token(&form).map(str::to_string);
    let signature_valid = form
        .get("data[hash]")
        .map(|hash| verify_ipn_hash(&state.config.paydunya.master_key, hash))
        .unwrap_or(false);
    let status = ipn_status(&form);

    if let Err(e) = PaymentWebhook::record(
        &state.db,
        PROVIDER,
        token.as_deref(),
        json!(form),
        signature_valid,
    )
    .await
    {
        tracing::error!(error = %e, "Failed to log payment webhook");
    }

    tracing::info!(token = ?token, signature_valid, status = ?status, "Paydunya IPN received");

    match (&token, signature_valid) {
        (Some(token), true) if status != InvoiceState::Pending => {
            let receipt_url = form.get("data[receipt_url]").cloned();
            let customer = Customer {
                name: form.get("data[customer][name]").cloned(),
                email: form.get("data[customer][email]").cloned(),
                phone: form.get("data[customer][phone]").cloned(),
            };
            let customer = (customer != Customer::default()).then_some(customer);

            let total_amount = ipn_total_amount(&form);
            if let Err(e) =
                apply_invoice_state(&state, token, status, receipt_url, customer, total_amount).await
            {
                tracing::error!(error = %e, token = %token, "Failed to apply IPN");
            }
        }
        (Some(_), false) => {
            tracing::warn!(token = ?token, "Ignoring IPN with invalid signature");
        }
        _ => {}
    }

    Json(json!({ "status": "received" }))
}

pub async fn history(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<PaydunyaPayment>>> {
    Ok(Json(PaydunyaPayment::list_for_user(&state.db, auth.user_id).await?))
}
