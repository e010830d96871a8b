/// Worker configuration
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default 5)
/// - `SCHEDULER_POLL_INTERVAL_SECS`: seconds between scans (default 60)
/// - `SCHEDULER_BATCH_SIZE`: schedules materialized per scan (default 20)

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    pub database_url: String,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_poll_interval")]
    pub scheduler_poll_interval_secs: u64,

    #[serde(default = "default_batch_size")]
    pub scheduler_batch_size: usize,
}

fn default_max_connections() -> u32 {
    5
}

fn default_poll_interval() -> u64 {
    60
}

fn default_batch_size() -> usize {
    20
}

impl WorkerConfig {
    /// Loads `.env` when present, then the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_source(config::Environment::default().try_parsing(true))
    }

    fn from_source(source: config::Environment) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize::<WorkerConfig>()
            .map_err(|e| anyhow::anyhow!("Invalid worker configuration: {}", e))?;

        if config.scheduler_poll_interval_secs == 0 {
            anyhow::bail!("SCHEDULER_POLL_INTERVAL_SECS must be at least 1");
        }
        if config.scheduler_batch_size == 0 {
            anyhow::bail!("SCHEDULER_BATCH_SIZE must be at least 1");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::default().try_parsing(true).source(Some(map))
    }

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::from_source(env(&[("DATABASE_URL", "postgresql://localhost/taskafy")])).unwrap();
        assert_eq!(config.scheduler_poll_interval_secs, 60);
        assert_eq!(config.scheduler_batch_size, 20);
        assert_eq!(config.database_max_connections, 5);
    }

    #[test]
    fn test_overrides_and_validation() {
        let config = WorkerConfig::from_source(env(&[
            ("DATABASE_URL", "postgresql://localhost/taskafy"),
            ("SCHEDULER_POLL_INTERVAL_SECS", "5"),
            ("SCHEDULER_BATCH_SIZE", "3"),
        ]))
        .unwrap();
        assert_eq!(config.scheduler_poll_interval_secs, 5);
        assert_eq!(config.scheduler_batch_size, 3);

        assert!(WorkerConfig::from_source(env(&[])).is_err());
        assert!(WorkerConfig::from_source(env(&[
            ("DATABASE_URL", "postgresql://localhost/taskafy"),
            ("SCHEDULER_BATCH_SIZE", "0"),
        ]))
        .is_err());
    }
}
