/// Scheduler tests against a real database
///
/// Require `DATABASE_URL`.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use taskafy_shared::models::category::ServiceCategory;
use taskafy_shared::models::recurring::{CreateRecurringTask, RecurrenceFrequency, RecurringTask};
use taskafy_shared::models::task::TaskStatus;
use taskafy_shared::models::user::{Country, CreateUser, Language, TaskerProfile, User, UserRole};
use taskafy_worker::scheduler::{RecurringScheduler, SchedulerConfig};
use uuid::Uuid;

async fn setup() -> anyhow::Result<PgPool> {
    dotenvy::dotenv().ok();
    let db = PgPool::connect(&std::env::var("DATABASE_URL")?).await?;
    sqlx::migrate!("../migrations").run(&db).await?;
    Ok(db)
}

async fn user(db: &PgPool, role: UserRole, address: Option<&str>) -> anyhow::Result<User> {
    let user = User::create(
        db,
        CreateUser {
            email: format!("{}-{}@example.com", role.as_str(), Uuid::new_v4()),
            password_hash: "not-used".to_string(),
            full_name: "Scheduler Test".to_string(),
            phone: None,
            role,
            language: Language::En,
            country: Country::Senegal,
            address: address.map(str::to_string),
            city: address.map(|_| "Dakar".to_string()),
        },
    )
    .await?;

    if role == UserRole::Tasker {
        TaskerProfile::create_default(db, user.id).await?;
    }

    Ok(user)
}

/// Daily schedule whose next occurrence is an hour ago
async fn due_schedule(db: &PgPool, client: &User, tasker: &User) -> anyhow::Result<RecurringTask> {
    let category = ServiceCategory::list(db)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no categories"))?;

    let schedule = RecurringTask::create(
        db,
        CreateRecurringTask {
            client_id: client.id,
            assigned_tasker_id: tasker.id,
            title: "Daily cleaning".to_string(),
            description: "Kitchen and living room".to_string(),
            category_id: category.id,
            frequency: RecurrenceFrequency::Daily,
            scheduled_time: "07:00".to_string(),
            day_of_week: None,
            day_of_month: None,
            hourly_rate: 2500.0,
            estimated_hours: 2.0,
            next_occurrence: Utc::now() - Duration::hours(1),
        },
    )
    .await?;

    Ok(schedule)
}

/// Scans until the given schedule has been materialized; other tests may
/// have due schedules in the same database
async fn scan_until_generated(scheduler: &RecurringScheduler, db: &PgPool, schedule_id: Uuid) -> i64 {
    for _ in 0..50 {
        scheduler.run_once(Utc::now()).await.unwrap();
        let count = generated_count(db, schedule_id).await;
        if count > 0 {
            return count;
        }
    }
    generated_count(db, schedule_id).await
}

async fn generated_count(db: &PgPool, schedule_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE recurring_task_id = $1")
        .bind(schedule_id)
        .fetch_one(db)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_due_schedule_becomes_booking() {
    let db = setup().await.unwrap();
    let client = user(&db, UserRole::Client, Some("Rue 10, Plateau")).await.unwrap();
    let tasker = user(&db, UserRole::Tasker, None).await.unwrap();
    let schedule = due_schedule(&db, &client, &tasker).await.unwrap();

    let scheduler = RecurringScheduler::new(db.clone(), SchedulerConfig::default());
    assert_eq!(scan_until_generated(&scheduler, &db, schedule.id).await, 1);

    let (status, total_cost, address, assigned): (TaskStatus, f64, String, Option<Uuid>) = sqlx::query_as(
        "SELECT status, total_cost, address, assigned_tasker_id FROM tasks WHERE recurring_task_id = $1",
    )
    .bind(schedule.id)
    .fetch_one(&db)
    .await
    .unwrap();
    assert_eq!(status, TaskStatus::Assigned);
    assert_eq!(total_cost, 5000.0);
    assert_eq!(address, "Rue 10, Plateau");
    assert_eq!(assigned, Some(tasker.id));

    let advanced = RecurringTask::find_by_id(&db, schedule.id).await.unwrap().unwrap();
    assert!(advanced.next_occurrence > Utc::now());
    assert!(advanced.last_generated_at.is_some());

    let notified: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND notification_type = 'recurring_task_generated'",
    )
    .bind(tasker.id)
    .fetch_one(&db)
    .await
    .unwrap();
    assert_eq!(notified, 1);

    // Not due again until the next occurrence
    scheduler.run_once(Utc::now()).await.unwrap();
    assert_eq!(generated_count(&db, schedule.id).await, 1);
}

#[tokio::test]
async fn test_paused_schedule_is_skipped() {
    let db = setup().await.unwrap();
    let client = user(&db, UserRole::Client, None).await.unwrap();
    let tasker = user(&db, UserRole::Tasker, None).await.unwrap();
    let schedule = due_schedule(&db, &client, &tasker).await.unwrap();

    RecurringTask::set_active(&db, schedule.id, false, None).await.unwrap();

    let scheduler = RecurringScheduler::new(db.clone(), SchedulerConfig::default());
    scheduler.run_once(Utc::now()).await.unwrap();

    assert_eq!(generated_count(&db, schedule.id).await, 0);
}

#[tokio::test]
async fn test_missing_client_address_uses_fallback() {
    let db = setup().await.unwrap();
    let client = user(&db, UserRole::Client, None).await.unwrap();
    let tasker = user(&db, UserRole::Tasker, None).await.unwrap();
    let schedule = due_schedule(&db, &client, &tasker).await.unwrap();

    let scheduler = RecurringScheduler::new(db.clone(), SchedulerConfig::default());
    assert_eq!(scan_until_generated(&scheduler, &db, schedule.id).await, 1);

    let address: String = sqlx::query_scalar("SELECT address FROM tasks WHERE recurring_task_id = $1")
        .bind(schedule.id)
        .fetch_one(&db)
        .await
        .unwrap();
    assert_eq!(address, taskafy_worker::scheduler::ADDRESS_FALLBACK);
}

#[tokio::test]
async fn test_cancelled_scheduler_stops() {
    let db = setup().await.unwrap();
    let scheduler = RecurringScheduler::new(
        db,
        SchedulerConfig {
            poll_interval: std::time::Duration::from_secs(3600),
            batch_size: 1,
        },
    );

    let token = scheduler.shutdown_token();
    token.cancel();

    tokio::time::timeout(std::time::Duration::from_secs(5), scheduler.run())
        .await
        .expect("scheduler should stop once cancelled");
}
