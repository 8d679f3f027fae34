pub mod keys;
pub mod memory;
pub mod redis_cache;

pub use keys::*;
pub use memory::*;
pub use redis_cache::*;

use std::time::Duration;

use async_trait::async_trait;
use courtside_models::Result;
use serde_json::Value;

/// Time-bounded key-value store for provider payloads.
#[async_trait]
pub trait StatsCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}
