/// Per-user token bucket
///
/// Bucket state lives in a Redis hash at `ratelimit:user:{user_id}` and is
/// refilled and consumed by one Lua script so concurrent API replicas see a
/// consistent count. Idle buckets expire after two minutes.

use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use super::client::{RedisClient, RedisClientError};
use crate::models::user::UserRole;

const TOKEN_BUCKET_SCRIPT: &str = r#"
local key = KEYS[1]
local capacity = tonumber(ARGV[1])
local refill_rate = tonumber(ARGV[2])
local now = tonumber(ARGV[3])

local bucket = redis.call('HMGET', key, 'tokens', 'last_refill')
local tokens = tonumber(bucket[1])
local last_refill = tonumber(bucket[2])

if not tokens then
    tokens = capacity
    last_refill = now
end

local elapsed = math.max(0, now - last_refill)
tokens = math.min(capacity, tokens + (elapsed * refill_rate))

if tokens >= 1 then
    tokens = tokens - 1
    redis.call('HSET', key, 'tokens', tokens, 'last_refill', now)
    redis.call('EXPIRE', key, 120)
    return {1, math.floor(tokens), math.ceil((capacity - tokens) / refill_rate)}
else
    redis.call('HSET', key, 'tokens', tokens, 'last_refill', now)
    redis.call('EXPIRE', key, 120)
    return {0, 0, math.ceil((1 - tokens) / refill_rate)}
end
"#;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimit {
    pub requests_per_minute: u32,

    /// Tokens per second
    pub refill_rate: f64,

    pub bucket_capacity: u32,
}

impl RateLimit {
    pub fn per_minute(requests: u32) -> Self {
        RateLimit {
            requests_per_minute: requests,
            refill_rate: requests as f64 / 60.0,
            bucket_capacity: requests,
        }
    }

    /// Clients get 120 requests/min, taskers and admins 300
    pub fn for_role(role: UserRole) -> Self {
        match role {
            UserRole::Client => Self::per_minute(120),
            UserRole::Tasker | UserRole::Admin => Self::per_minute(300),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,

    /// Seconds until the next token (denied) or a full bucket (allowed)
    pub reset_after: u64,
}

#[derive(Clone)]
pub struct RateLimiter {
    client: RedisClient,
    script: std::sync::Arc<redis::Script>,
}

impl RateLimiter {
    pub fn new(client: RedisClient) -> Self {
        Self {
            client,
            script: std::sync::Arc::new(redis::Script::new(TOKEN_BUCKET_SCRIPT)),
        }
    }

    pub fn bucket_key(user_id: Uuid) -> String {
        format!("ratelimit:user:{}", user_id)
    }

    /// Takes one token from the user's bucket
    pub async fn check(
        &self,
        user_id: Uuid,
        limit: RateLimit,
    ) -> Result<RateLimitResult, RedisClientError> {
        let mut conn = self.client.get_connection();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let mut invocation = self.script.key(Self::bucket_key(user_id));
        invocation
            .arg(limit.bucket_capacity)
            .arg(limit.refill_rate)
            .arg(now);

        let result: Vec<i64> = tokio::time::timeout(
            self.client.command_timeout(),
            invocation.invoke_async(&mut conn),
        )
        .await
        .map_err(|_| RedisClientError::Timeout)??;

        match result.as_slice() {
            [allowed, remaining, reset_after] => Ok(RateLimitResult {
                allowed: *allowed == 1,
                remaining: (*remaining).max(0) as u32,
                reset_after: (*reset_after).max(0) as u64,
            }),
            other => Err(RedisClientError::CommandError(format!(
                "unexpected token bucket reply: {:?}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_by_role() {
        let client = RateLimit::for_role(UserRole::Client);
        assert_eq!(client.requests_per_minute, 120);
        assert_eq!(client.bucket_capacity, 120);
        assert!((client.refill_rate - 2.0).abs() < f64::EPSILON);

        assert_eq!(RateLimit::for_role(UserRole::Tasker).requests_per_minute, 300);
        assert_eq!(RateLimit::for_role(UserRole::Admin).requests_per_minute, 300);
        assert!((RateLimit::for_role(UserRole::Admin).refill_rate - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bucket_key() {
        let id = Uuid::nil();
        assert_eq!(
            RateLimiter::bucket_key(id),
            "ratelimit:user:00000000-0000-0000-0000-000000000000"
        );
    }
}
