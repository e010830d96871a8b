/// Common test utilities for integration tests
///
/// Integration tests need a PostgreSQL database in `DATABASE_URL`. Each
/// context creates its own client, tasker and admin accounts, so tests can
/// run in parallel against the same database.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use taskafy_api::app::{build_router, AppState};
use taskafy_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig, PaydunyaSettings};
use taskafy_shared::auth::jwt::{create_token, Claims, TokenType};
use taskafy_shared::models::category::ServiceCategory;
use taskafy_shared::models::user::{Country, CreateUser, Language, TaskerProfile, User, UserRole};
use taskafy_shared::paydunya::{
    InvoiceRequest, InvoiceResponse, InvoiceState, InvoiceStatus, PaymentGateway, PaymentGatewayError,
};
use tower::Service as _;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const TEST_MASTER_KEY: &str = "integration-test-master-key";

/// Gateway double that records invoices and answers confirmations with a
/// configurable state and reported total
#[derive(Default)]
pub struct MockGateway {
    pub invoices: Mutex<Vec<InvoiceRequest>>,
    pub confirm_state: Mutex<Option<InvoiceState>>,
    pub confirm_amount: Mutex<Option<i64>>,
}

impl MockGateway {
    pub fn set_confirm_state(&self, state: InvoiceState) {
        *self.confirm_state.lock().unwrap() = Some(state);
    }

    pub fn set_confirm_amount(&self, amount: i64) {
        *self.confirm_amount.lock().unwrap() = Some(amount);
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_invoice(&self, request: InvoiceRequest) -> Result<InvoiceResponse, PaymentGatewayError> {
        let token = format!("test_{}", Uuid::new_v4().simple());
        self.invoices.lock().unwrap().push(request);
        Ok(InvoiceResponse {
            checkout_url: format!("https://sandbox.example/checkout/{}", token),
            token,
        })
    }

    async fn confirm_invoice(&self, _token: &str) -> Result<InvoiceStatus, PaymentGatewayError> {
        let status = self.confirm_state.lock().unwrap().unwrap_or(InvoiceState::Pending);
        Ok(InvoiceStatus {
            status,
            receipt_url: Some("https://sandbox.example/receipt".to_string()),
            customer: None,
            total_amount: *self.confirm_amount.lock().unwrap(),
        })
    }
}

/// A user created for the test, with an access token
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub gateway: Arc<MockGateway>,
    pub client: TestUser,
    pub tasker: TestUser,
    pub admin: TestUser,
    pub category: ServiceCategory,
}

pub fn test_config(database_url: String) -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
            frontend_url: "http://localhost:3000".to_string(),
            public_url: "http://localhost:8000".to_string(),
        },
        database: DatabaseConfig {
            url: database_url,
            max_connections: 5,
        },
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
        },
        redis_url: None,
        paydunya: PaydunyaSettings {
            master_key: TEST_MASTER_KEY.to_string(),
            private_key: "test-private".to_string(),
            token: "test-token".to_string(),
            mode: "test".to_string(),
            store_name: "TaskAfy".to_string(),
        },
    }
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let database_url = std::env::var("DATABASE_URL")?;

        let db = PgPool::connect(&database_url).await?;

        // Path relative to Cargo.toml, not this file
        sqlx::migrate!("../migrations").run(&db).await?;

        let client = create_user(&db, UserRole::Client).await?;
        let tasker = create_user(&db, UserRole::Tasker).await?;
        let admin = create_user(&db, UserRole::Admin).await?;

        sqlx::query("UPDATE tasker_profiles SET hourly_rate = 5000 WHERE user_id = $1")
            .bind(tasker.id())
            .execute(&db)
            .await?;

        let category = ServiceCategory::list(&db)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("service categories are not seeded"))?;

        let gateway = Arc::new(MockGateway::default());
        let state = AppState::new(db.clone(), test_config(database_url), gateway.clone());
        let app = build_router(state);

        Ok(TestContext {
            db,
            app,
            gateway,
            client,
            tasker,
            admin,
            category,
        })
    }

    /// Sends a request and returns the status with the parsed JSON body
    /// (`Value::Null` when the body is empty)
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        user: Option<&TestUser>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("authorization", user.auth_header());
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("non-JSON response ({}): {}", status, String::from_utf8_lossy(&bytes))
            })
        };

        (status, json)
    }

    /// Books the context tasker three days out
    pub async fn book_task(&self) -> Value {
        self.book_task_at(chrono::Utc::now() + chrono::Duration::days(3)).await
    }

    /// Books the context tasker for the context client through the API
    pub async fn book_task_at(&self, task_date: chrono::DateTime<chrono::Utc>) -> Value {
        let (status, body) = self
            .request(
                "POST",
                "/api/tasks",
                Some(&self.client),
                Some(serde_json::json!({
                    "title": "Assemble a wardrobe",
                    "description": "Two-door wardrobe, all parts included",
                    "category_id": self.category.id,
                    "tasker_id": self.tasker.id(),
                    "duration_hours": 2.0,
                    "hourly_rate": 5000.0,
                    "task_date": task_date,
                    "address": "Rue des Jardins 12",
                    "city": "Abidjan",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "booking failed: {}", body);
        body
    }

    /// Books a task and drives it to `completed`
    pub async fn completed_task(&self) -> Value {
        let task = self.book_task().await;
        let id = task["id"].as_str().unwrap().to_string();

        let (status, _) = self
            .request("POST", &format!("/api/tasks/{}/accept", id), Some(&self.tasker), None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = self
            .request(
                "PUT",
                &format!("/api/tasks/{}/status?new_status=completed", id),
                Some(&self.tasker),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "completion failed: {}", body);
        body
    }
}

/// Creates an account directly in the database with an access token
pub async fn create_user(db: &PgPool, role: UserRole) -> anyhow::Result<TestUser> {
    let user = User::create(
        db,
        CreateUser {
            email: format!("{}-{}@example.com", role.as_str(), Uuid::new_v4()),
            password_hash: "not-used".to_string(),
            full_name: format!("Test {}", role.as_str()),
            phone: None,
            role,
            language: Language::Fr,
            country: Country::IvoryCoast,
            address: Some("Boulevard Latrille".to_string()),
            city: Some("Abidjan".to_string()),
        },
    )
    .await?;

    if role == UserRole::Tasker {
        TaskerProfile::create_default(db, user.id).await?;
    }

    let token = create_token(&Claims::new(user.id, role, TokenType::Access), TEST_SECRET)?;

    Ok(TestUser { user, token })
}

/// The `id` field of a JSON response
pub fn id_of(value: &Value) -> String {
    value["id"]
        .as_str()
        .unwrap_or_else(|| panic!("response has no id: {}", value))
        .to_string()
}
