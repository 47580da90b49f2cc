//! Key/value credential storage with TTL semantics.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Serialize, de::DeserializeOwned};

/// Low-level store operations. JSON helpers live on [`Credentials`] so this
/// trait stays object safe and mockable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Store a value with a TTL in seconds.
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;

    /// Overwrite a value in place, keeping the key's current TTL.
    async fn update(&self, key: &str, value: &str) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Delete keys. Deleting an absent key is not an error.
    async fn del(&self, keys: &[String]) -> Result<()>;

    /// True only if every given key exists.
    async fn has_all(&self, keys: &[String]) -> Result<bool>;

    /// Remaining TTL in seconds. None when the key is absent or has no expiry.
    async fn time_left(&self, key: &str) -> Result<Option<i64>>;
}

/// Typed JSON view over a [`CredentialStore`], shared across handlers.
#[derive(Clone)]
pub struct Credentials {
    store: Arc<dyn CredentialStore>,
}

impl Credentials {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.store.set(key, value, ttl_secs).await
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        self.store.get(key).await
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) -> Result<()> {
        self.store
            .set(key, &serde_json::to_string(value)?, ttl_secs)
            .await
    }

    /// Replace a JSON payload without touching the entry's TTL.
    pub async fn update_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.store.update(key, &serde_json::to_string(value)?).await
    }

    /// A value that no longer parses is treated as absent: stale payload
    /// shapes age out instead of wedging every request that reads them.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                tracing::warn!(key, "discarding unparseable cache entry: {err}");
                Ok(None)
            }
        }
    }

    pub async fn del(&self, keys: &[String]) -> Result<()> {
        self.store.del(keys).await
    }

    pub async fn has_all(&self, keys: &[String]) -> Result<bool> {
        self.store.has_all(keys).await
    }

    pub async fn time_left(&self, key: &str) -> Result<Option<i64>> {
        self.store.time_left(key).await
    }
}

/// Redis implementation of [`CredentialStore`].
#[derive(Clone)]
pub struct RedisCredentialStore {
    client: redis::Client,
}

impl RedisCredentialStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialStore for RedisCredentialStore {
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn update(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("KEEPTTL")
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn del(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(keys).await?;
        Ok(())
    }

    async fn has_all(&self, keys: &[String]) -> Result<bool> {
        if keys.is_empty() {
            return Ok(true);
        }

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let found: i64 = conn.exists(keys).await?;
        Ok(found == keys.len() as i64)
    }

    async fn time_left(&self, key: &str) -> Result<Option<i64>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        // TTL returns -2 for a missing key and -1 for a key without expiry
        let ttl: i64 = conn.ttl(key).await?;
        Ok((ttl >= 0).then_some(ttl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        name: String,
    }

    fn credentials(mock: MockCredentialStore) -> Credentials {
        Credentials::new(Arc::new(mock))
    }

    #[tokio::test]
    async fn set_json_serializes_the_value() {
        let mut store = MockCredentialStore::new();
        store
            .expect_set()
            .with(eq("k"), eq(r#"{"name":"a"}"#), eq(60u64))
            .returning(|_, _, _| Ok(()));

        credentials(store)
            .set_json("k", &Payload { name: "a".into() }, 60)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn get_json_returns_none_for_absent_keys() {
        let mut store = MockCredentialStore::new();
        store.expect_get().returning(|_| Ok(None));

        let value: Option<Payload> = credentials(store).get_json("k").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn get_json_treats_corrupt_payloads_as_absent() {
        let mut store = MockCredentialStore::new();
        store
            .expect_get()
            .returning(|_| Ok(Some("{not-json".to_string())));

        let value: Option<Payload> = credentials(store).get_json("k").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn get_json_parses_stored_payloads() {
        let mut store = MockCredentialStore::new();
        store
            .expect_get()
            .returning(|_| Ok(Some(r#"{"name":"a"}"#.to_string())));

        let value: Option<Payload> = credentials(store).get_json("k").await.unwrap();
        assert_eq!(value, Some(Payload { name: "a".into() }));
    }
}
