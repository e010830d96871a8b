/// Cash ledger, Paydunya invoices and the IPN webhook

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{id_of, TestContext, TEST_MASTER_KEY};
use serde_json::{json, Value};
use sha2::{Digest, Sha512};
use taskafy_shared::paydunya::InvoiceState;
use tower::Service as _;

async fn post_ipn(ctx: &TestContext, fields: &[(&str, &str)]) -> (StatusCode, Value) {
    let body = fields
        .iter()
        .map(|(k, v)| format!("{}={}", k.replace('[', "%5B").replace(']', "%5D"), v))
        .collect::<Vec<_>>()
        .join("&");

    let request = Request::builder()
        .method("POST")
        .uri("/api/payments/webhook/paydunya-ipn")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap();

    let response = ctx.app.clone().call(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn open_invoice(ctx: &TestContext, task_id: &str) -> Value {
    let (status, invoice) = ctx
        .request(
            "POST",
            "/api/payments/create-invoice",
            Some(&ctx.client),
            Some(json!({ "task_id": task_id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", invoice);
    invoice
}

#[tokio::test]
async fn test_cash_payment_marks_task_paid() {
    let ctx = TestContext::new().await.unwrap();
    let task = ctx.book_task().await;
    let id = id_of(&task);

    // Not completed yet
    let (status, _) = ctx
        .request("POST", &format!("/api/tasks/{}/mark-paid-cash", id), Some(&ctx.tasker), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let task = ctx.completed_task().await;
    let id = id_of(&task);

    // The tasker confirms receiving cash
    let (status, _) = ctx
        .request("POST", &format!("/api/tasks/{}/mark-paid-cash", id), Some(&ctx.client), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, paid) = ctx
        .request("POST", &format!("/api/tasks/{}/mark-paid-cash", id), Some(&ctx.tasker), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", paid);
    assert_eq!(paid["is_paid"], true);
    assert_eq!(paid["payment_method"], "cash");

    let (status, payments) = ctx
        .request("GET", &format!("/api/payments/task/{}", id), Some(&ctx.tasker), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let payments = payments.as_array().unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0]["status"], "completed");
    assert!(payments[0]["transaction_id"].as_str().unwrap().starts_with("TXN-"));
}

#[tokio::test]
async fn test_manual_payment_completion() {
    let ctx = TestContext::new().await.unwrap();
    let task = ctx.completed_task().await;
    let id = id_of(&task);

    let (status, payment) = ctx
        .request(
            "POST",
            "/api/payments",
            Some(&ctx.client),
            Some(json!({ "task_id": id, "amount": 10000.0, "payment_method": "wave" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", payment);
    assert_eq!(payment["status"], "pending");

    let payment_id = id_of(&payment);
    let (status, completed) = ctx
        .request("POST", &format!("/api/payments/{}/complete", payment_id), Some(&ctx.client), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "completed");

    let (status, _) = ctx
        .request("POST", &format!("/api/payments/{}/complete", payment_id), Some(&ctx.client), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, task) = ctx.request("GET", &format!("/api/tasks/{}", id), Some(&ctx.client), None).await;
    assert_eq!(task["is_paid"], true);
    assert_eq!(task["payment_method"], "wave");
}

#[tokio::test]
async fn test_invoice_verify_completes_payment() {
    let ctx = TestContext::new().await.unwrap();
    let task = ctx.completed_task().await;
    let id = id_of(&task);

    let invoice = open_invoice(&ctx, &id).await;
    let token = invoice["token"].as_str().unwrap().to_string();
    assert!(invoice["checkout_url"].as_str().unwrap().contains(&token));

    {
        let sent = ctx.gateway.invoices.lock().unwrap();
        let request = sent.last().unwrap();
        assert_eq!(request.amount, 10000);
        assert!(request.callback_url.ends_with("/api/payments/webhook/paydunya-ipn"));
        assert!(!request.channels.is_empty());
    }

    let (status, pending) = ctx
        .request("GET", &format!("/api/payments/verify/{}", token), Some(&ctx.client), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending["status"], "pending");
    assert_eq!(pending["payment"]["status"], "pending");

    // Only the payer can verify
    let (status, _) = ctx
        .request("GET", &format!("/api/payments/verify/{}", token), Some(&ctx.tasker), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.gateway.set_confirm_state(InvoiceState::Completed);
    let (status, verified) = ctx
        .request("GET", &format!("/api/payments/verify/{}", token), Some(&ctx.client), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", verified);
    assert_eq!(verified["payment"]["status"], "completed");

    let (_, task) = ctx.request("GET", &format!("/api/tasks/{}", id), Some(&ctx.client), None).await;
    assert_eq!(task["is_paid"], true);
    assert_eq!(task["payment_method"], "paydunya");

    // Paid tasks can't be invoiced again
    let (status, _) = ctx
        .request(
            "POST",
            "/api/payments/create-invoice",
            Some(&ctx.client),
            Some(json!({ "task_id": id })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, history) = ctx.request("GET", "/api/payments/history", Some(&ctx.client), None).await;
    assert!(history
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p["invoice_token"] == token.as_str()));
}

#[tokio::test]
async fn test_invoice_requires_completed_task() {
    let ctx = TestContext::new().await.unwrap();
    let task = ctx.book_task().await;

    let (status, _) = ctx
        .request(
            "POST",
            "/api/payments/create-invoice",
            Some(&ctx.client),
            Some(json!({ "task_id": id_of(&task) })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ipn_applies_only_signed_notifications() {
    let ctx = TestContext::new().await.unwrap();
    let task = ctx.completed_task().await;
    let id = id_of(&task);

    let invoice = open_invoice(&ctx, &id).await;
    let token = invoice["token"].as_str().unwrap().to_string();

    // Bad signature: acknowledged, ignored
    let (status, ack) = post_ipn(
        &ctx,
        &[
            ("data[hash]", "deadbeef"),
            ("data[invoice][token]", &token),
            ("data[status]", "completed"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], "received");

    let (_, task) = ctx.request("GET", &format!("/api/tasks/{}", id), Some(&ctx.client), None).await;
    assert_eq!(task["is_paid"], false);

    let hash = hex::encode(Sha512::digest(TEST_MASTER_KEY.as_bytes()));
    let (status, _) = post_ipn(
        &ctx,
        &[
            ("data[hash]", &hash),
            ("data[invoice][token]", &token),
            ("data[status]", "completed"),
            ("data[customer][name]", "Awa"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, task) = ctx.request("GET", &format!("/api/tasks/{}", id), Some(&ctx.client), None).await;
    assert_eq!(task["is_paid"], true);

    let logged: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM payment_webhooks WHERE token = $1",
    )
    .bind(&token)
    .fetch_one(&ctx.db)
    .await
    .unwrap();
    assert_eq!(logged, 2);
}

#[tokio::test]
async fn test_completion_with_wrong_total_fails_invoice() {
    let ctx = TestContext::new().await.unwrap();

    // Verify path: the gateway reports less than the invoice amount
    let task = ctx.completed_task().await;
    let id = id_of(&task);
    let token = open_invoice(&ctx, &id).await["token"].as_str().unwrap().to_string();

    ctx.gateway.set_confirm_state(InvoiceState::Completed);
    ctx.gateway.set_confirm_amount(5000);
    let (status, verified) = ctx
        .request("GET", &format!("/api/payments/verify/{}", token), Some(&ctx.client), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", verified);
    assert_eq!(verified["payment"]["status"], "failed");

    let (_, task) = ctx.request("GET", &format!("/api/tasks/{}", id), Some(&ctx.client), None).await;
    assert_eq!(task["is_paid"], false);

    // IPN path: signed, completed, but for another amount
    let task = ctx.completed_task().await;
    let id = id_of(&task);
    let token = open_invoice(&ctx, &id).await["token"].as_str().unwrap().to_string();

    let hash = hex::encode(Sha512::digest(TEST_MASTER_KEY.as_bytes()));
    let (status, _) = post_ipn(
        &ctx,
        &[
            ("data[hash]", &hash),
            ("data[invoice][token]", &token),
            ("data[invoice][total_amount]", "100"),
            ("data[status]", "completed"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, task) = ctx.request("GET", &format!("/api/tasks/{}", id), Some(&ctx.client), None).await;
    assert_eq!(task["is_paid"], false);

    let stored: String = sqlx::query_scalar(
        "SELECT status::TEXT FROM paydunya_payments WHERE invoice_token = $1",
    )
    .bind(&token)
    .fetch_one(&ctx.db)
    .await
    .unwrap();
    assert_eq!(stored, "failed");
}

#[tokio::test]
async fn test_tasker_earnings_split_paid_and_pending() {
    let ctx = TestContext::new().await.unwrap();

    let paid = ctx.completed_task().await;
    ctx.completed_task().await;

    let (status, _) = ctx
        .request("POST", &format!("/api/tasks/{}/mark-paid-cash", id_of(&paid)), Some(&ctx.tasker), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx.request("GET", "/api/taskers/earnings", Some(&ctx.client), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, earnings) = ctx.request("GET", "/api/taskers/earnings", Some(&ctx.tasker), None).await;
    assert_eq!(status, StatusCode::OK, "{}", earnings);
    assert_eq!(earnings["total_earnings"], 10000.0);
    assert_eq!(earnings["total_tasks"], 1);
    assert_eq!(earnings["pending_earnings"], 10000.0);
    assert_eq!(earnings["pending_count"], 1);
    assert_eq!(earnings["week_earnings"], 10000.0);
    assert_eq!(earnings["month_earnings"], 10000.0);
    assert_eq!(earnings["history"].as_array().unwrap().len(), 2);

    let (status, weekly) = ctx
        .request("GET", "/api/taskers/earnings?period=week", Some(&ctx.tasker), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(weekly["total_earnings"], 10000.0);
}
