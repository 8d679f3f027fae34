// Redis-backed cache

use std::time::Duration;

use async_trait::async_trait;
use courtside_models::{CourtsideError, Result};
use redis::aio::MultiplexedConnection;
use redis::Client;
use serde_json::Value;
use tracing::{debug, info};

use crate::StatsCache;

pub struct RedisCache {
    connection: MultiplexedConnection,
}

fn cache_error(e: redis::RedisError) -> CourtsideError {
    CourtsideError::Cache(e.to_string())
}

impl RedisCache {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).map_err(cache_error)?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(cache_error)?;
        info!("Connected to Redis cache");
        Ok(Self { connection })
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(())
    }
}

#[async_trait]
impl StatsCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<()> {
        let mut conn = self.connection.clone();
        let payload = serde_json::to_string(value)?;
        redis::cmd("SET")
            .arg(key)
            .arg(payload)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(cache_error)?;
        debug!(key, ttl_secs = ttl.as_secs(), "Cached value");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(())
    }
}
