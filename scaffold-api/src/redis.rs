use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::cache::CacheStore;

/// Thin Redis wrapper for the response cache: prefixed keys, get,
/// set-with-TTL, delete. Cloning shares the underlying multiplexed
/// connection; it closes once the last clone is dropped.
#[derive(Clone)]
pub struct RedisCache {
    connection: MultiplexedConnection,
    prefix: String,
}

impl RedisCache {
    pub async fn connect(url: &str, prefix: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            connection,
            prefix: prefix.to_string(),
        })
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, redis::RedisError> {
        let mut connection = self.connection.clone();
        connection.get(self.prefixed(key)).await
    }

    /// SET with PX expiry; sub-millisecond TTLs round down to the 1ms floor.
    pub async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), redis::RedisError> {
        let millis = (ttl.as_millis() as u64).max(1);
        let mut connection = self.connection.clone();
        connection
            .pset_ex::<_, _, ()>(self.prefixed(key), value, millis)
            .await
    }

    pub async fn del(&self, key: &str) -> Result<(), redis::RedisError> {
        let mut connection = self.connection.clone();
        connection.del::<_, ()>(self.prefixed(key)).await
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(RedisCache::get(self, key).await?)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()> {
        Ok(RedisCache::set_with_ttl(self, key, value, ttl).await?)
    }
}
