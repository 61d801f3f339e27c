//! Key/value entry operations.
//!
//! Provides TTL-bounded reads and writes over the `entries` table and the
//! [`KeyValueCache`] implementation for [`CacheDb`].

use std::time::Duration;

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::{expires_at, now_millis};
use crate::Error;
use crate::store::KeyValueCache;

impl CacheDb {
    /// Get a live entry by key.
    ///
    /// Returns None if the key doesn't exist or has expired.
    pub async fn get_entry(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let mut values = self.get_entries(&[key.to_string()]).await?;
        Ok(values.pop().flatten())
    }

    /// Get several live entries with one statement, preserving key order.
    pub async fn get_entries(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, Error> {
        let keys = keys.to_vec();
        let now = now_millis();
        self.conn
            .call(move |conn| -> Result<Vec<Option<Vec<u8>>>, Error> {
                let mut stmt = conn.prepare("SELECT value FROM entries WHERE key = ?1 AND expires_at > ?2")?;

                let mut values = Vec::with_capacity(keys.len());
                for key in &keys {
                    match stmt.query_row(params![key, now], |row| row.get::<_, Vec<u8>>(0)) {
                        Ok(value) => values.push(Some(value)),
                        Err(rusqlite::Error::QueryReturnedNoRows) => values.push(None),
                        Err(e) => return Err(e.into()),
                    }
                }
                Ok(values)
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace an entry with a fresh TTL.
    pub async fn put_entry(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), Error> {
        let key = key.to_string();
        let value = value.to_vec();
        let written_at = now_millis();
        let expires_at = expires_at(ttl);

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (key, value, written_at, expires_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        written_at = excluded.written_at,
                        expires_at = excluded.expires_at",
                    params![key, value, written_at, expires_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries by key in one transaction.
    ///
    /// Returns the number of deleted entries.
    pub async fn delete_entries(&self, keys: &[String]) -> Result<u64, Error> {
        if keys.is_empty() {
            return Ok(0);
        }

        let keys = keys.to_vec();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let mut deleted = 0;
                {
                    let mut stmt = tx.prepare("DELETE FROM entries WHERE key = ?1")?;
                    for key in &keys {
                        deleted += stmt.execute(params![key])? as u64;
                    }
                }
                tx.commit()?;
                Ok(deleted)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete expired entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired_entries(&self) -> Result<u64, Error> {
        let now = now_millis();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM entries WHERE expires_at <= ?1", params![now])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl KeyValueCache for CacheDb {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        self.get_entry(key).await
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, Error> {
        self.get_entries(keys).await
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), Error> {
        self.put_entry(key, value, ttl).await
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, Error> {
        self.delete_entries(keys).await
    }

    async fn ping(&self) -> Result<(), Error> {
        CacheDb::ping(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("embedly:https://example.com/", b"payload", Duration::from_secs(60))
            .await
            .unwrap();

        let value = db.get_entry("embedly:https://example.com/").await.unwrap();
        assert_eq!(value.as_deref(), Some(&b"payload"[..]));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.get_entry("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("k", b"first", Duration::from_secs(60)).await.unwrap();
        db.put_entry("k", b"second", Duration::from_secs(60)).await.unwrap();

        assert_eq!(db.get_entry("k").await.unwrap().as_deref(), Some(&b"second"[..]));
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_absent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("k", b"short", Duration::from_millis(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(db.get_entry("k").await.unwrap().is_none());
        assert_eq!(db.purge_expired_entries().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_entries_preserves_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("a", b"1", Duration::from_secs(60)).await.unwrap();
        db.put_entry("c", b"3", Duration::from_secs(60)).await.unwrap();

        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let values = db.get_entries(&keys).await.unwrap();
        assert_eq!(values, vec![Some(b"1".to_vec()), None, Some(b"3".to_vec())]);
    }

    #[tokio::test]
    async fn test_delete_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("a", b"1", Duration::from_secs(60)).await.unwrap();
        db.put_entry("b", b"2", Duration::from_secs(60)).await.unwrap();

        let deleted = db
            .delete_entries(&["a".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get_entry("a").await.unwrap().is_none());
        assert!(db.get_entry("b").await.unwrap().is_some());
    }
}
