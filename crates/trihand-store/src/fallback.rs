//! Redis-with-memory-fallback composition.

use std::time::Duration;

use crate::{MemoryStore, RedisStore, Store, StoreError};

/// A [`Store`] that prefers redis and degrades to the in-process map.
///
/// Built without a redis URL it runs purely in-process. With one, every
/// operation tries redis first; on failure it logs a warning and serves
/// the memory store instead, so a redis outage costs durability, not
/// gameplay. Writes always land in the memory store too — that's what
/// makes the degraded reads coherent.
pub struct FallbackStore {
    remote: Option<RedisStore>,
    local: MemoryStore,
}

impl FallbackStore {
    /// In-process only. Used when `REDIS_URL` is unset.
    pub fn in_process() -> Self {
        Self {
            remote: None,
            local: MemoryStore::new(),
        }
    }

    /// Redis-backed with in-process fallback.
    pub fn with_redis(remote: RedisStore) -> Self {
        Self {
            remote: Some(remote),
            local: MemoryStore::new(),
        }
    }

    /// Builds from an optional DSN; an unparseable URL degrades to
    /// in-process with a warning rather than refusing to start.
    pub fn from_url(url: Option<&str>) -> Self {
        match url {
            Some(url) => match RedisStore::open(url) {
                Ok(remote) => Self::with_redis(remote),
                Err(e) => {
                    tracing::warn!(error = %e, "invalid REDIS_URL, using in-process store");
                    Self::in_process()
                }
            },
            None => Self::in_process(),
        }
    }

    /// Whether a remote backend is configured (not necessarily reachable).
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }
}

impl Store for FallbackStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if let Some(remote) = &self.remote {
            match remote.get(key).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(key, error = %e, "redis get failed, serving in-process store");
                }
            }
        }
        self.local.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        // Local first so the fallback is never behind the remote.
        self.local.set(key, value, ttl).await?;
        if let Some(remote) = &self.remote {
            if let Err(e) = remote.set(key, value, ttl).await {
                tracing::warn!(key, error = %e, "redis set failed, value held in-process");
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.local.delete(key).await?;
        if let Some(remote) = &self.remote {
            if let Err(e) = remote.delete(key).await {
                tracing::warn!(key, error = %e, "redis delete failed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_process_round_trip() {
        let store = FallbackStore::in_process();
        assert!(!store.has_remote());
        store
            .set("game:ABC234", "{}", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            store.get("game:ABC234").await.unwrap().as_deref(),
            Some("{}")
        );
        store.delete("game:ABC234").await.unwrap();
        assert!(store.get("game:ABC234").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_remote_degrades_to_local() {
        // Nothing listens on this port; every redis op fails and the
        // in-process store carries the data.
        let remote = RedisStore::open("redis://127.0.0.1:1").unwrap();
        let store = FallbackStore::with_redis(remote);
        assert!(store.has_remote());

        store
            .set("reconnect:tok", "{\"playerId\":\"x\"}", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            store.get("reconnect:tok").await.unwrap().as_deref(),
            Some("{\"playerId\":\"x\"}")
        );
    }

    #[tokio::test]
    async fn test_invalid_url_degrades_at_construction() {
        let store = FallbackStore::from_url(Some("not a url"));
        assert!(!store.has_remote());
    }
}
