/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskafy_api::{app::{build_router, AppState}, config::Config};
/// use taskafy_shared::paydunya::{PaydunyaClient, PaydunyaConfig, PaydunyaMode};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let gateway = PaydunyaClient::new(PaydunyaConfig {
///     master_key: config.paydunya.master_key.clone(),
///     private_key: config.paydunya.private_key.clone(),
///     token: config.paydunya.token.clone(),
///     mode: PaydunyaMode::parse(&config.paydunya.mode),
///     store_name: config.paydunya.store_name.clone(),
///     timeout: std::time::Duration::from_secs(30),
/// })?;
/// let app = build_router(AppState::new(pool, config, Arc::new(gateway)));
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, ws::ChatHub};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskafy_shared::{
    auth::middleware::{authenticate, bearer_token, AuthError},
    paydunya::PaymentGateway,
    redis::{RateLimiter, RedisClient},
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub chat: ChatHub,

    /// Present when `REDIS_URL` is configured
    pub redis: Option<RedisClient>,
    pub rate_limiter: Option<RateLimiter>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            gateway,
            chat: ChatHub::new(),
            redis: None,
            rate_limiter: None,
        }
    }

    /// Enables Redis-backed rate limiting
    pub fn with_redis(mut self, redis: RedisClient) -> Self {
        self.rate_limiter = Some(RateLimiter::new(redis.clone()));
        self.redis = Some(redis);
        self
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router
///
/// ```text
/// /health                                   public
/// /ws/chat/:task_id/:user_id                token in query or header
/// /api/auth          register login refresh public, me
/// /api/users         profile location, :id public
/// /api/taskers       profile earnings applications, search public
/// /api/categories    public
/// /api/tasks         booking, lifecycle, timer, tracking, applications
/// /api/location      tasker position and ETA
/// /api/messages      send, list, unread
/// /api/payments      cash ledger, Paydunya invoices, IPN webhook (public)
/// /api/reviews       create, can-review; listings and stats public
/// /api/badges        tasker badges public, verify/unverify (admin)
/// /api/favorites /api/disputes /api/coins /api/recurring-tasks /api/notifications
/// ```
///
/// Authenticated groups run the bearer middleware, then the rate limiter.
pub fn build_router(state: AppState) -> Router {
    use crate::routes::{
        auth, badges, categories, coins, disputes, favorites, health, location, messages,
        notifications, paydunya, payments, recurring, reviews, tasks, taskers, users,
    };

    let protected = |router: Router<AppState>| {
        router
            .layer(from_fn_with_state(
                state.clone(),
                crate::middleware::rate_limit::rate_limit_layer,
            ))
            .layer(from_fn_with_state(state.clone(), jwt_auth_layer))
    };

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .merge(protected(Router::new().route("/me", get(auth::me))));

    let user_routes = Router::new()
        .route("/:id", get(users::get_user))
        .merge(protected(
            Router::new()
                .route("/profile", put(users::update_profile))
                .route("/location", put(users::update_location)),
        ));

    let tasker_routes = Router::new()
        .route("/search", get(taskers::search))
        .merge(protected(
            Router::new()
                .route("/profile", put(taskers::update_profile))
                .route("/earnings", get(taskers::earnings))
                .route("/applications", get(taskers::my_applications)),
        ));

    let category_routes = Router::new()
        .route("/", get(categories::list_categories))
        .route("/:id", get(categories::get_category));

    let task_routes = protected(
        Router::new()
            .route("/", post(tasks::create_task).get(tasks::list_tasks))
            .route("/:id", get(tasks::get_task))
            .route("/:id/status", put(tasks::update_status))
            .route("/:id/accept", post(tasks::accept_task))
            .route("/:id/reject", post(tasks::reject_task))
            .route("/:id/cancel", post(tasks::cancel_task))
            .route("/:id/mark-paid-cash", post(tasks::mark_paid_cash))
            .route("/:id/apply", post(tasks::apply))
            .route("/:id/applications", get(tasks::list_applications))
            .route("/:id/assign/:tasker_id", post(tasks::assign))
            .route("/:id/start-timer", post(tasks::start_timer))
            .route("/:id/stop-timer", post(tasks::stop_timer))
            .route("/:id/timer-status", get(tasks::timer_status))
            .route("/:id/start-tracking", post(tasks::start_tracking))
            .route("/:id/stop-tracking", post(tasks::stop_tracking))
            .route("/:id/update-location", post(tasks::update_location)),
    );

    let location_routes = protected(
        Router::new()
            .route("/update", post(location::update_location))
            .route("/tasker/:tasker_id/task/:task_id", get(location::get_location)),
    );

    let message_routes = protected(
        Router::new()
            .route("/", post(messages::send_message))
            .route("/task/:id", get(messages::list_messages))
            .route("/unread", get(messages::unread_count)),
    );

    let payment_routes = Router::new()
        .route("/webhook/paydunya-ipn", post(paydunya::ipn_webhook))
        .merge(protected(
            Router::new()
                .route("/", post(payments::create_payment))
                .route("/:id/complete", post(payments::complete_payment))
                .route("/task/:task_id", get(payments::list_for_task))
                .route("/create-invoice", post(paydunya::create_invoice))
                .route("/verify/:token", get(paydunya::verify_payment))
                .route("/history", get(paydunya::history)),
        ));

    let review_routes = Router::new()
        .route("/tasker/:id", get(reviews::list_for_tasker))
        .route("/tasker/:id/rating", get(reviews::tasker_rating))
        .route("/client/:id/stats", get(reviews::client_stats))
        .merge(protected(
            Router::new()
                .route("/", post(reviews::create_review))
                .route("/task/:id/can-review", get(reviews::can_review)),
        ));

    let badge_routes = Router::new()
        .route("/tasker/:id", get(badges::tasker_badges))
        .merge(protected(
            Router::new()
                .route("/verify/:tasker_id", post(badges::verify_tasker))
                .route("/unverify/:tasker_id", post(badges::unverify_tasker)),
        ));

    let favorite_routes = protected(
        Router::new()
            .route("/", post(favorites::add_favorite).get(favorites::list_favorites))
            .route("/:tasker_id", delete(favorites::remove_favorite))
            .route("/check/:tasker_id", get(favorites::check_favorite)),
    );

    let dispute_routes = protected(
        Router::new()
            .route("/", post(disputes::create_dispute).get(disputes::list_disputes))
            .route("/:id", get(disputes::get_dispute))
            .route("/:id/status", put(disputes::update_status)),
    );

    let coin_routes = protected(
        Router::new()
            .route("/balance", get(coins::balance))
            .route("/transactions", get(coins::transactions))
            .route("/award", post(coins::award))
            .route("/spend", post(coins::spend)),
    );

    let recurring_routes = protected(
        Router::new()
            .route("/", post(recurring::create_schedule).get(recurring::list_schedules))
            .route("/:id", delete(recurring::delete_schedule))
            .route("/:id/toggle", put(recurring::toggle_schedule)),
    );

    let notification_routes = protected(
        Router::new()
            .route("/", get(notifications::list_notifications))
            .route("/mark-all-read", put(notifications::mark_all_read))
            .route("/:id/read", put(notifications::mark_read))
            .route("/:id", delete(notifications::delete_notification)),
    );

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/taskers", tasker_routes)
        .nest("/categories", category_routes)
        .nest("/tasks", task_routes)
        .nest("/location", location_routes)
        .nest("/messages", message_routes)
        .nest("/payments", payment_routes)
        .nest("/reviews", review_routes)
        .nest("/badges", badge_routes)
        .nest("/favorites", favorite_routes)
        .nest("/disputes", dispute_routes)
        .nest("/coins", coin_routes)
        .nest("/recurring-tasks", recurring_routes)
        .nest("/notifications", notification_routes);

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ws/chat/:task_id/:user_id", get(crate::ws::chat::chat_socket))
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Bearer authentication
///
/// Validates the access token, loads the user, and injects an
/// `AuthContext` carrying the user's current role.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let token = bearer_token(req.headers())?.ok_or(AuthError::MissingCredentials)?;

    let auth_context = authenticate(&state.db, state.jwt_secret(), token).await?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
