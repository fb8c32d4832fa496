//! Session cache keyed by credential tuple
//!
//! One entry per distinct credential tuple. Entries are never evicted or
//! refreshed: the server offers no expiry signal on this surface, so a
//! server-side session invalidation is not detected here and shows up as a
//! fault on the next call instead.

use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Cache key formed from the database plus the credentials that obtained the
/// session. The two variants can never collide, even for the same database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    ApiKey {
        db: String,
        key: String,
    },
    Password {
        db: String,
        username: String,
        password: String,
    },
}

/// Lock-guarded mapping from credential tuple to session id.
#[derive(Debug, Default)]
pub struct SessionCache {
    entries: RwLock<HashMap<CredentialKey, i64>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &CredentialKey) -> Option<i64> {
        let uid = self.entries.read().await.get(key).copied();
        match uid {
            Some(uid) => debug!(uid, "session cache hit"),
            None => debug!("session cache miss"),
        }
        uid
    }

    pub async fn insert(&self, key: CredentialKey, uid: i64) {
        self.entries.write().await.insert(key, uid);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_key(db: &str, key: &str) -> CredentialKey {
        CredentialKey::ApiKey {
            db: db.to_string(),
            key: key.to_string(),
        }
    }

    fn password(db: &str, username: &str, password: &str) -> CredentialKey {
        CredentialKey::Password {
            db: db.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn stores_one_entry_per_tuple() {
        let cache = SessionCache::new();
        cache.insert(api_key("shop", "k1"), 7).await;
        cache.insert(api_key("shop", "k1"), 9).await;
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&api_key("shop", "k1")).await, Some(9));
    }

    #[tokio::test]
    async fn api_key_and_password_tuples_never_collide() {
        let cache = SessionCache::new();
        // Same database, same secret string, different auth path.
        cache.insert(api_key("shop", "secret"), 1).await;
        cache
            .insert(password("shop", "admin", "secret"), 2)
            .await;
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get(&api_key("shop", "secret")).await, Some(1));
        assert_eq!(cache.get(&password("shop", "admin", "secret")).await, Some(2));
    }

    #[tokio::test]
    async fn miss_for_different_database() {
        let cache = SessionCache::new();
        cache.insert(api_key("shop", "k1"), 7).await;
        assert_eq!(cache.get(&api_key("warehouse", "k1")).await, None);
    }
}
