/// Booking, status machine, cancellation penalties, applications, timer and tracking

mod common;

use axum::http::StatusCode;
use common::{create_user, id_of, TestContext};
use serde_json::json;
use taskafy_shared::models::user::UserRole;

#[tokio::test]
async fn test_booking_computes_cost_and_notifies_tasker() {
    let ctx = TestContext::new().await.unwrap();

    let task = ctx.book_task().await;

    assert_eq!(task["status"], "assigned");
    assert_eq!(task["total_cost"], 10000.0);
    assert_eq!(task["assigned_tasker_id"], ctx.tasker.id().to_string());
    assert_eq!(task["is_paid"], false);

    let (status, body) = ctx.request("GET", "/api/notifications", Some(&ctx.tasker), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["unread_count"].as_i64().unwrap() >= 1);
    assert!(body["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["related_id"] == task["id"]));
}

#[tokio::test]
async fn test_only_clients_book() {
    let ctx = TestContext::new().await.unwrap();

    let (status, _) = ctx
        .request(
            "POST",
            "/api/tasks",
            Some(&ctx.tasker),
            Some(json!({
                "title": "Fix sink",
                "description": "Leaking",
                "category_id": ctx.category.id,
                "tasker_id": ctx.tasker.id(),
                "duration_hours": 1.0,
                "task_date": chrono::Utc::now() + chrono::Duration::days(2),
                "address": "Rue 1",
                "city": "Dakar",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_accept_then_complete_rewards_client() {
    let ctx = TestContext::new().await.unwrap();
    let task = ctx.book_task().await;
    let id = id_of(&task);

    // Only the assigned tasker can accept
    let (status, _) = ctx
        .request("POST", &format!("/api/tasks/{}/accept", id), Some(&ctx.client), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Completing straight from assigned is not a valid transition
    let (status, _) = ctx
        .request(
            "PUT",
            &format!("/api/tasks/{}/status?new_status=completed", id),
            Some(&ctx.tasker),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, accepted) = ctx
        .request("POST", &format!("/api/tasks/{}/accept", id), Some(&ctx.tasker), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "in_progress");

    let (status, completed) = ctx
        .request(
            "PUT",
            &format!("/api/tasks/{}/status?new_status=completed", id),
            Some(&ctx.tasker),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "completed");
    assert!(completed["completed_at"].is_string());

    let (_, balance) = ctx.request("GET", "/api/coins/balance", Some(&ctx.client), None).await;
    assert_eq!(balance["balance"], 10);

    // Terminal tasks stay terminal
    let (status, _) = ctx
        .request("POST", &format!("/api/tasks/{}/cancel", id), Some(&ctx.client), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_outsiders_cannot_see_task() {
    let ctx = TestContext::new().await.unwrap();
    let task = ctx.book_task().await;
    let outsider = create_user(&ctx.db, UserRole::Client).await.unwrap();

    let (status, _) = ctx
        .request("GET", &format!("/api/tasks/{}", id_of(&task)), Some(&outsider), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .request("GET", &format!("/api/tasks/{}", id_of(&task)), Some(&ctx.admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_cancellation_penalties() {
    let ctx = TestContext::new().await.unwrap();

    // More than 24 hours ahead: free
    let early = ctx.book_task().await;
    let (status, body) = ctx
        .request(
            "POST",
            &format!("/api/tasks/{}/cancel", id_of(&early)),
            Some(&ctx.client),
            Some(json!({ "reason": "Plans changed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["penalty_amount"], 0.0);
    assert_eq!(body["task"]["status"], "cancelled");
    assert_eq!(body["task"]["cancellation_reason"], "Plans changed");

    // Within 24 hours: 10% of the total
    let late = ctx
        .book_task_at(chrono::Utc::now() + chrono::Duration::hours(5))
        .await;
    let (status, body) = ctx
        .request("POST", &format!("/api/tasks/{}/cancel", id_of(&late)), Some(&ctx.client), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["penalty_amount"], 1000.0);

    // Tasker cancellations are never charged
    let by_tasker = ctx
        .book_task_at(chrono::Utc::now() + chrono::Duration::hours(5))
        .await;
    let (status, body) = ctx
        .request(
            "PUT",
            &format!("/api/tasks/{}/status?new_status=cancelled", id_of(&by_tasker)),
            Some(&ctx.tasker),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["penalty_amount"], 0.0);
    assert_eq!(body["cancelled_by"], ctx.tasker.id().to_string());
}

#[tokio::test]
async fn test_reject_reopens_and_application_assigns() {
    let ctx = TestContext::new().await.unwrap();
    let task = ctx.book_task().await;
    let id = id_of(&task);

    let (status, rejected) = ctx
        .request("POST", &format!("/api/tasks/{}/reject", id), Some(&ctx.tasker), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["status"], "posted");
    assert!(rejected["assigned_tasker_id"].is_null());

    let applicant = create_user(&ctx.db, UserRole::Tasker).await.unwrap();
    let other = create_user(&ctx.db, UserRole::Tasker).await.unwrap();

    let apply = json!({ "proposed_rate": 4500.0, "estimated_hours": 2.0, "message": "Available tomorrow" });
    for tasker in [&applicant, &other] {
        let (status, body) = ctx
            .request("POST", &format!("/api/tasks/{}/apply", id), Some(tasker), Some(apply.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        assert_eq!(body["status"], "pending");
    }

    let (status, _) = ctx
        .request("POST", &format!("/api/tasks/{}/apply", id), Some(&applicant), Some(apply))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, applications) = ctx
        .request("GET", &format!("/api/tasks/{}/applications", id), Some(&ctx.client), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(applications.as_array().unwrap().len(), 2);

    let (status, assigned) = ctx
        .request(
            "POST",
            &format!("/api/tasks/{}/assign/{}", id, applicant.id()),
            Some(&ctx.client),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", assigned);
    assert_eq!(assigned["status"], "assigned");
    assert_eq!(assigned["assigned_tasker_id"], applicant.id().to_string());
    assert_eq!(assigned["hourly_rate"], 4500.0);

    let (_, mine) = ctx.request("GET", "/api/taskers/applications", Some(&other), None).await;
    let statuses: Vec<_> = mine
        .as_array()
        .unwrap()
        .iter()
        .filter(|a| a["task_id"] == assigned["id"])
        .map(|a| a["status"].clone())
        .collect();
    assert_eq!(statuses, vec![json!("rejected")]);
}

#[tokio::test]
async fn test_timer_accumulates_hours() {
    let ctx = TestContext::new().await.unwrap();
    let task = ctx.book_task().await;
    let id = id_of(&task);

    // Timer needs an accepted task
    let (status, _) = ctx
        .request("POST", &format!("/api/tasks/{}/start-timer", id), Some(&ctx.tasker), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    ctx.request("POST", &format!("/api/tasks/{}/accept", id), Some(&ctx.tasker), None)
        .await;

    let (status, started) = ctx
        .request("POST", &format!("/api/tasks/{}/start-timer", id), Some(&ctx.tasker), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["is_timer_running"], true);

    let (status, _) = ctx
        .request("POST", &format!("/api/tasks/{}/start-timer", id), Some(&ctx.tasker), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, stopped) = ctx
        .request("POST", &format!("/api/tasks/{}/stop-timer", id), Some(&ctx.tasker), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stopped["is_timer_running"], false);
    assert!(stopped["actual_hours_worked"].as_f64().unwrap() >= 0.0);

    let (status, _) = ctx
        .request("POST", &format!("/api/tasks/{}/stop-timer", id), Some(&ctx.tasker), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, timer) = ctx
        .request("GET", &format!("/api/tasks/{}/timer-status", id), Some(&ctx.client), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(timer["current_session_hours"], 0.0);
}

#[tokio::test]
async fn test_tracking_reports_eta() {
    let ctx = TestContext::new().await.unwrap();
    let task = ctx.book_task().await;
    let id = id_of(&task);

    let location = json!({ "latitude": 5.3600, "longitude": -4.0083 });

    let (status, _) = ctx
        .request("POST", &format!("/api/tasks/{}/update-location", id), Some(&ctx.tasker), Some(location.clone()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, tracking) = ctx
        .request("POST", &format!("/api/tasks/{}/start-tracking", id), Some(&ctx.tasker), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", tracking);

    let (status, update) = ctx
        .request("POST", &format!("/api/tasks/{}/update-location", id), Some(&ctx.tasker), Some(location))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(update["message"], "Location updated");

    let (status, _) = ctx
        .request("POST", &format!("/api/tasks/{}/stop-tracking", id), Some(&ctx.tasker), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

/// Two racing requests: exactly one succeeds and the other gets 409
fn assert_one_winner(first: StatusCode, second: StatusCode) {
    let mut statuses = [first, second];
    statuses.sort_by_key(|s| s.as_u16());
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_accepts_have_one_winner() {
    let ctx = TestContext::new().await.unwrap();
    let task = ctx.book_task().await;
    let uri = format!("/api/tasks/{}/accept", id_of(&task));

    let ((first, _), (second, _)) = tokio::join!(
        ctx.request("POST", &uri, Some(&ctx.tasker), None),
        ctx.request("POST", &uri, Some(&ctx.tasker), None),
    );
    assert_one_winner(first, second);

    // Once accepted, a late accept or reject is still a conflict
    let (status, _) = ctx.request("POST", &uri, Some(&ctx.tasker), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = ctx
        .request("POST", &format!("/api/tasks/{}/reject", id_of(&task)), Some(&ctx.tasker), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_timer_starts_have_one_winner() {
    let ctx = TestContext::new().await.unwrap();
    let task = ctx.book_task().await;
    let id = id_of(&task);

    let (status, _) = ctx
        .request("POST", &format!("/api/tasks/{}/accept", id), Some(&ctx.tasker), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/api/tasks/{}/start-timer", id);
    let ((first, _), (second, _)) = tokio::join!(
        ctx.request("POST", &uri, Some(&ctx.tasker), None),
        ctx.request("POST", &uri, Some(&ctx.tasker), None),
    );
    assert_one_winner(first, second);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_assignments_have_one_winner() {
    let ctx = TestContext::new().await.unwrap();
    let task = ctx.book_task().await;
    let id = id_of(&task);

    let (status, _) = ctx
        .request("POST", &format!("/api/tasks/{}/reject", id), Some(&ctx.tasker), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let first_applicant = create_user(&ctx.db, UserRole::Tasker).await.unwrap();
    let second_applicant = create_user(&ctx.db, UserRole::Tasker).await.unwrap();

    let apply = json!({ "proposed_rate": 4000.0, "estimated_hours": 2.0 });
    for tasker in [&first_applicant, &second_applicant] {
        let (status, body) = ctx
            .request("POST", &format!("/api/tasks/{}/apply", id), Some(tasker), Some(apply.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
    }

    let first_uri = format!("/api/tasks/{}/assign/{}", id, first_applicant.id());
    let second_uri = format!("/api/tasks/{}/assign/{}", id, second_applicant.id());
    let ((first, _), (second, _)) = tokio::join!(
        ctx.request("POST", &first_uri, Some(&ctx.client), None),
        ctx.request("POST", &second_uri, Some(&ctx.client), None),
    );
    assert_one_winner(first, second);

    let (_, current) = ctx
        .request("GET", &format!("/api/tasks/{}", id), Some(&ctx.client), None)
        .await;
    assert_eq!(current["status"], "assigned");
}

#[tokio::test]
async fn test_status_route_release_stops_tracking_and_notifies_tasker() {
    let ctx = TestContext::new().await.unwrap();
    let task = ctx.book_task().await;
    let id = id_of(&task);

    let (status, _) = ctx
        .request("POST", &format!("/api/tasks/{}/start-tracking", id), Some(&ctx.tasker), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, released) = ctx
        .request(
            "PUT",
            &format!("/api/tasks/{}/status?new_status=posted", id),
            Some(&ctx.client),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", released);
    assert_eq!(released["status"], "posted");
    assert!(released["assigned_tasker_id"].is_null());
    assert_eq!(released["is_tracking"], false);

    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND related_id = $2 AND notification_type = 'task_rejected'",
    )
    .bind(ctx.tasker.id())
    .bind(uuid::Uuid::parse_str(&id).unwrap())
    .fetch_one(&ctx.db)
    .await
    .unwrap();
    assert_eq!(count, 1);
}
