/// Redis integration
///
/// Redis is optional. When `REDIS_URL` is set the API uses it to keep
/// per-user token buckets so request limits hold across API replicas.
///
/// - `client`: connection manager wrapper with health checks
/// - `rate_limit`: atomic token bucket as a Lua script
///
/// # Example
///
/// ```no_run
/// use taskafy_shared::redis::client::{RedisClient, RedisConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = RedisClient::new(RedisConfig::from_url("redis://localhost:6379")).await?;
/// assert!(client.ping().await?);
/// # Ok(())
/// # }
/// ```

pub mod client;
pub mod rate_limit;

pub use client::{RedisClient, RedisClientError, RedisConfig};
pub use rate_limit::{RateLimit, RateLimitResult, RateLimiter};
