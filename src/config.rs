use config::{Config, ConfigError, Environment, File};
use courtside_cache::CacheTtls;
use courtside_ml::TrainerConfig;
use courtside_services::{DriftConfig, PredictionConfig, RetrainingConfig, StatsApiConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Longest accepted gap between scheduled retraining cycles, one year.
pub const MAX_RETRAIN_INTERVAL_HOURS: u64 = 24 * 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub server: ServerConfig,
    pub stats_api: StatsApiSettings,
    pub cache: CacheConfig,
    pub ml: MlConfig,
    pub retraining: RetrainingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsApiSettings {
    pub base_url: String,
    pub api_host: String,
    pub api_key: String,
    pub league: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub team_stats_ttl_secs: u64,
    pub player_stats_ttl_secs: u64,
    pub games_ttl_secs: u64,
    pub h2h_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlConfig {
    pub model_dir: String,
    pub active_version: Option<String>,
    pub history_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainingSettings {
    pub enabled: bool,
    pub interval_hours: u64,
    pub collection_window_days: i64,
    pub drift_window_days: i64,
    pub min_sample_size: usize,
    pub drift_threshold: f64,
    pub calendar_floor_days: i64,
    pub min_training_samples: usize,
    pub test_fraction: f64,
    pub validation_fraction: f64,
    pub min_roc_auc: f64,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default values
            .set_default("database.url", "postgresql://localhost:5432/courtside_dev")?
            .set_default("database.max_connections", 20)?
            .set_default("redis.url", "redis://localhost:6379")?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.cors_origins", Vec::<String>::new())?
            .set_default("stats_api.base_url", "https://v1.basketball.api-sports.io")?
            .set_default("stats_api.api_host", "v1.basketball.api-sports.io")?
            .set_default("stats_api.api_key", "")?
            .set_default("stats_api.league", "12")?
            .set_default("stats_api.timeout_ms", 5000)?
            .set_default("cache.team_stats_ttl_secs", 3600)?
            .set_default("cache.player_stats_ttl_secs", 3600)?
            .set_default("cache.games_ttl_secs", 1800)?
            .set_default("cache.h2h_ttl_secs", 7200)?
            .set_default("ml.model_dir", "models")?
            .set_default("ml.history_limit", 50)?
            .set_default("retraining.enabled", true)?
            .set_default("retraining.interval_hours", 24)?
            .set_default("retraining.collection_window_days", 7)?
            .set_default("retraining.drift_window_days", 7)?
            .set_default("retraining.min_sample_size", 50)?
            .set_default("retraining.drift_threshold", 0.05)?
            .set_default("retraining.calendar_floor_days", 30)?
            .set_default("retraining.min_training_samples", 100)?
            .set_default("retraining.test_fraction", 0.2)?
            .set_default("retraining.validation_fraction", 0.2)?
            .set_default("retraining.min_roc_auc", 0.5)?
            // Add in settings from configuration file
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add in settings from environment variables, e.g. COURTSIDE_STATS_API__API_KEY
            .add_source(
                Environment::with_prefix("COURTSIDE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let hours = self.retraining.interval_hours;
        if !(1..=MAX_RETRAIN_INTERVAL_HOURS).contains(&hours) {
            return Err(ConfigError::Message(format!(
                "retraining.interval_hours must be between 1 and {MAX_RETRAIN_INTERVAL_HOURS}, got {hours}"
            )));
        }
        Ok(())
    }

    pub fn retrain_interval(&self) -> Duration {
        Duration::from_secs(self.retraining.interval_hours.saturating_mul(3600))
    }

    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    pub fn redis_url(&self) -> &str {
        &self.redis.url
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn stats_api_config(&self) -> StatsApiConfig {
        StatsApiConfig {
            base_url: self.stats_api.base_url.clone(),
            api_host: self.stats_api.api_host.clone(),
            api_key: self.stats_api.api_key.clone(),
            league: self.stats_api.league.clone(),
            timeout_ms: self.stats_api.timeout_ms,
        }
    }

    pub fn cache_ttls(&self) -> CacheTtls {
        CacheTtls {
            team_stats_secs: self.cache.team_stats_ttl_secs,
            player_stats_secs: self.cache.player_stats_ttl_secs,
            games_secs: self.cache.games_ttl_secs,
            head_to_head_secs: self.cache.h2h_ttl_secs,
        }
    }

    pub fn prediction_config(&self) -> PredictionConfig {
        PredictionConfig {
            stats_timeout_ms: self.stats_api.timeout_ms,
            default_history_limit: self.ml.history_limit,
            ..PredictionConfig::default()
        }
    }

    pub fn retraining_config(&self) -> RetrainingConfig {
        let r = &self.retraining;
        RetrainingConfig {
            collection_window_days: r.collection_window_days,
            calendar_floor_days: r.calendar_floor_days,
            min_roc_auc: r.min_roc_auc,
            drift: DriftConfig {
                window_days: r.drift_window_days,
                min_sample_size: r.min_sample_size,
                threshold: r.drift_threshold,
            },
            trainer: TrainerConfig {
                test_fraction: r.test_fraction,
                validation_fraction: r.validation_fraction,
                min_training_samples: r.min_training_samples,
                ..TrainerConfig::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::new().unwrap();
        assert_eq!(config.retrain_interval(), Duration::from_secs(24 * 3600));
    }

    #[test]
    fn test_retrain_interval_bounds() {
        let mut config = AppConfig::new().unwrap();

        config.retraining.interval_hours = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Message(_))));

        config.retraining.interval_hours = u64::MAX;
        assert!(config.validate().is_err());

        config.retraining.interval_hours = MAX_RETRAIN_INTERVAL_HOURS;
        assert!(config.validate().is_ok());
        assert_eq!(
            config.retrain_interval(),
            Duration::from_secs(MAX_RETRAIN_INTERVAL_HOURS * 3600)
        );
    }
}
