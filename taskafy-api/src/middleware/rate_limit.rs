/// Per-user rate limiting
///
/// Runs after bearer authentication. Each user has a Redis token bucket
/// sized by role: 120 requests/min for clients, 300 for taskers and admins.
/// Without Redis the layer passes requests through. A Redis outage fails
/// open so the API stays usable.
///
/// Responses carry `X-RateLimit-Limit`, `X-RateLimit-Remaining`, and
/// `X-RateLimit-Reset`; rejections are 429 with `Retry-After`.

use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Extension, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use taskafy_shared::{auth::middleware::AuthContext, redis::RateLimit};

pub async fn rate_limit_layer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(limiter) = state.rate_limiter.as_ref() else {
        return Ok(next.run(request).await);
    };

    let limit = RateLimit::for_role(auth.role);

    let result = match limiter.check(auth.user_id, limit).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(error = %e, user_id = %auth.user_id, "Rate limit check failed, allowing request");
            return Ok(next.run(request).await);
        }
    };

    if !result.allowed {
        tracing::info!(user_id = %auth.user_id, role = auth.role.as_str(), "Rate limit exceeded");
        return Err(ApiError::RateLimitExceeded {
            retry_after: result.reset_after.max(1),
            message: format!(
                "Rate limit exceeded. Try again in {} seconds",
                result.reset_after.max(1)
            ),
        });
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(limit.requests_per_minute));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(result.remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(result.reset_after));

    Ok(response)
}
