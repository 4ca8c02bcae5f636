use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Script};

use super::{EntitlementError, EntitlementStore};

/// Check-and-increment in one round trip, so concurrent requests cannot push
/// the counter past the ceiling. Returns -1 when blocked.
const INCREMENT_WITH_CEILING: &str = r#"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
if current >= tonumber(ARGV[1]) then
    return -1
end
return redis.call('INCR', KEYS[1])
"#;

/// Decrement that stops at 0.
const DECREMENT_TO_ZERO: &str = r#"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
if current <= 0 then
    return 0
end
return redis.call('DECR', KEYS[1])
"#;

/// Entitlement counters stored as plain integers under
/// `entitlement:{user_id}:free_usage`.
#[derive(Clone)]
pub struct RedisEntitlementStore {
    conn: MultiplexedConnection,
    increment: Script,
    decrement: Script,
}

impl RedisEntitlementStore {
    pub async fn connect(client: &redis::Client) -> redis::RedisResult<Self> {
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            conn,
            increment: Script::new(INCREMENT_WITH_CEILING),
            decrement: Script::new(DECREMENT_TO_ZERO),
        })
    }
}

fn free_usage_key(user_id: &str) -> String {
    format!("entitlement:{user_id}:free_usage")
}

#[async_trait]
impl EntitlementStore for RedisEntitlementStore {
    async fn free_usage(&self, user_id: &str) -> Result<Option<u32>, EntitlementError> {
        let mut conn = self.conn.clone();
        let usage: Option<u32> = conn.get(free_usage_key(user_id)).await?;
        Ok(usage)
    }

    async fn initialize_free_usage(&self, user_id: &str) -> Result<(), EntitlementError> {
        let mut conn = self.conn.clone();
        let _created: bool = conn.set_nx(free_usage_key(user_id), 0u32).await?;
        Ok(())
    }

    async fn reserve_free_usage(
        &self,
        user_id: &str,
        ceiling: u32,
    ) -> Result<Option<u32>, EntitlementError> {
        let mut conn = self.conn.clone();
        let result: i64 = self
            .increment
            .key(free_usage_key(user_id))
            .arg(ceiling)
            .invoke_async(&mut conn)
            .await?;

        if result < 0 {
            return Ok(None);
        }
        u32::try_from(result)
            .map(Some)
            .map_err(|_| EntitlementError::InvalidCounter(result))
    }

    async fn release_free_usage(&self, user_id: &str) -> Result<(), EntitlementError> {
        let mut conn = self.conn.clone();
        let _remaining: i64 = self
            .decrement
            .key(free_usage_key(user_id))
            .invoke_async(&mut conn)
            .await?;
        Ok(())
    }
}
