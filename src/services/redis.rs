//! Redis service holding the shared visit-count cache

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

use super::visit_counts::CountCache;

#[derive(Clone)]
pub struct RedisService {
    client: Client,
}

impl RedisService {
    /// Create a new Redis service
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Cache(format!("Failed to create Redis client: {}", e)))?;

        // Test connection
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Cache(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Cache(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client })
    }

    /// Get a Redis connection
    pub async fn get_connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Cache(format!("Failed to get Redis connection: {}", e)))
    }

    fn count_key(property_id: Uuid) -> String {
        format!("visits:count:{}", property_id)
    }

    fn generation_key(property_id: Uuid) -> String {
        format!("visits:gen:{}", property_id)
    }
}

/// SETEX the count only while the generation still matches
const PUT_IF_CURRENT: &str = r#"
local current = redis.call('GET', KEYS[2]) or '0'
if current ~= ARGV[1] then
    return 0
end
redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
return 1
"#;

#[async_trait]
impl CountCache for RedisService {
    async fn get(&self, property_id: Uuid) -> AppResult<Option<i64>> {
        let mut conn = self.get_connection().await?;
        let count: Option<i64> = conn.get(Self::count_key(property_id)).await?;
        Ok(count)
    }

    async fn generation(&self, property_id: Uuid) -> AppResult<u64> {
        let mut conn = self.get_connection().await?;
        let generation: Option<u64> = conn.get(Self::generation_key(property_id)).await?;
        Ok(generation.unwrap_or(0))
    }

    async fn put(
        &self,
        property_id: Uuid,
        count: i64,
        ttl: Duration,
        generation: u64,
    ) -> AppResult<bool> {
        let mut conn = self.get_connection().await?;
        // SET EX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        let stored: i64 = redis::Script::new(PUT_IF_CURRENT)
            .key(Self::count_key(property_id))
            .key(Self::generation_key(property_id))
            .arg(generation)
            .arg(count)
            .arg(seconds)
            .invoke_async(&mut conn)
            .await?;
        Ok(stored == 1)
    }

    async fn invalidate(&self, property_id: Uuid) -> AppResult<()> {
        let mut conn = self.get_connection().await?;
        redis::pipe()
            .atomic()
            .incr(Self::generation_key(property_id), 1)
            .ignore()
            .del(Self::count_key(property_id))
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}
