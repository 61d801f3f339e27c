//! Key/value cache abstraction used by the coordinator.

use std::time::Duration;

use async_trait::async_trait;

use crate::Error;

/// A shared, TTL-aware byte store.
///
/// Implementations own their own timeouts; callers never wait on them
/// beyond a single operation. Every error is a cache error and is fatal to
/// the caller's operation.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Read a live value. Expired values read as `None`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;

    /// Read several keys in one pass, in key order.
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, Error> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get(key).await?);
        }
        Ok(values)
    }

    /// Write `value` under `key`, replacing any previous value and TTL.
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), Error>;

    /// Remove keys. Returns the number of rows removed.
    async fn delete(&self, keys: &[String]) -> Result<u64, Error>;

    async fn ping(&self) -> Result<(), Error>;
}
