/// HTTP middleware
///
/// - `security`: security response headers
/// - `rate_limit`: per-user token bucket backed by Redis

pub mod rate_limit;
pub mod security;
