use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use sqlx::MySqlPool;

use crate::model::user::Actor;
use crate::store::StoreError;

/// Where established identities live between requests, keyed by session id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load_actor(&self, sid: &str) -> Option<Actor>;
    async fn persist_actor(&self, sid: &str, actor: Actor) -> Result<(), StoreError>;
    async fn clear_actor(&self, sid: &str) -> Result<(), StoreError>;
}

fn build_cache<V: Clone + Send + Sync + 'static>(ttl: Duration) -> Cache<String, V> {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(ttl)
        .build()
}

/// Session ids that were cleared. Ids are never reissued, so a write that
/// raced a clear can be detected and undone.
struct Revoked(Cache<String, ()>);

impl Revoked {
    fn new(ttl: Duration) -> Self {
        Self(build_cache(ttl))
    }

    async fn revoke(&self, sid: &str) {
        self.0.insert(sid.to_string(), ()).await;
    }

    fn contains(&self, sid: &str) -> bool {
        self.0.contains_key(sid)
    }
}

/// In-process sessions; a restart signs everybody out.
pub struct MemorySessionStore {
    cache: Cache<String, Actor>,
    revoked: Revoked,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: build_cache(ttl),
            revoked: Revoked::new(ttl),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load_actor(&self, sid: &str) -> Option<Actor> {
        self.cache.get(sid).await
    }

    async fn persist_actor(&self, sid: &str, actor: Actor) -> Result<(), StoreError> {
        if self.revoked.contains(sid) {
            return Err(StoreError::SessionEnded(sid.to_string()));
        }
        self.cache.insert(sid.to_string(), actor).await;
        // a clear that landed between the check and the insert wins
        if self.revoked.contains(sid) {
            self.cache.invalidate(sid).await;
            return Err(StoreError::SessionEnded(sid.to_string()));
        }
        Ok(())
    }

    async fn clear_actor(&self, sid: &str) -> Result<(), StoreError> {
        self.revoked.revoke(sid).await;
        self.cache.invalidate(sid).await;
        Ok(())
    }
}

/// Sessions in the `sessions` table, read through a moka cache so that most
/// requests never reach the database.
pub struct MySqlSessionStore {
    pool: MySqlPool,
    cache: Cache<String, Actor>,
    revoked: Revoked,
    ttl: Duration,
}

impl MySqlSessionStore {
    pub fn new(pool: MySqlPool, ttl: Duration) -> Self {
        Self {
            pool,
            cache: build_cache(ttl),
            revoked: Revoked::new(ttl),
            ttl,
        }
    }

    fn expires_at(&self) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::zero());
        Utc::now() + ttl
    }

    async fn delete_row(&self, sid: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE sid = ?")
            .bind(sid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MySqlSessionStore {
    async fn load_actor(&self, sid: &str) -> Option<Actor> {
        if let Some(actor) = self.cache.get(sid).await {
            return Some(actor);
        }
        if self.revoked.contains(sid) {
            return None;
        }

        let row = sqlx::query_as::<_, (u64, String, bool)>(
            "SELECT user_id, role, active FROM sessions WHERE sid = ? AND expires_at > ?",
        )
        .bind(sid)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await;

        match row {
            Ok(Some((id, role, active))) => {
                let role = match role.parse() {
                    Ok(role) => role,
                    Err(_) => {
                        tracing::error!(sid, role = %role, "Session has an unknown role");
                        return None;
                    }
                };
                let actor = Actor { id, role, active };
                self.cache.insert(sid.to_string(), actor).await;
                // the row may have been read just before a clear deleted it
                if self.revoked.contains(sid) {
                    self.cache.invalidate(sid).await;
                    return None;
                }
                Some(actor)
            }
            Ok(None) => None,
            Err(e) => {
                // Fail closed: an unreadable session is no session.
                tracing::error!(error = %e, sid, "Failed to load session");
                None
            }
        }
    }

    async fn persist_actor(&self, sid: &str, actor: Actor) -> Result<(), StoreError> {
        if self.revoked.contains(sid) {
            return Err(StoreError::SessionEnded(sid.to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO sessions (sid, user_id, role, active, expires_at)
            VALUES (?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                role = VALUES(role),
                active = VALUES(active),
                expires_at = VALUES(expires_at)
            "#,
        )
        .bind(sid)
        .bind(actor.id)
        .bind(actor.role.as_ref())
        .bind(actor.active)
        .bind(self.expires_at())
        .execute(&self.pool)
        .await?;

        self.cache.insert(sid.to_string(), actor).await;
        if self.revoked.contains(sid) {
            self.cache.invalidate(sid).await;
            self.delete_row(sid).await?;
            return Err(StoreError::SessionEnded(sid.to_string()));
        }
        Ok(())
    }

    /// The row goes first; the cache is only dropped once nothing can reload it.
    async fn clear_actor(&self, sid: &str) -> Result<(), StoreError> {
        self.delete_row(sid).await?;
        self.revoked.revoke(sid).await;
        self.cache.invalidate(sid).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;

    #[actix_web::test]
    async fn memory_sessions_round_trip_and_clear() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let actor = Actor::new(9, Role::Manager);

        assert_eq!(store.load_actor("abc").await, None);
        store.persist_actor("abc", actor).await.unwrap();
        assert_eq!(store.load_actor("abc").await, Some(actor));

        store.clear_actor("abc").await.unwrap();
        assert_eq!(store.load_actor("abc").await, None);
    }

    #[actix_web::test]
    async fn cleared_sessions_cannot_be_revived() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let actor = Actor::new(3, Role::Employee);
        store.persist_actor("xyz", actor).await.unwrap();
        store.clear_actor("xyz").await.unwrap();

        // a refresh that restored the actor before the clear
        let late = store.persist_actor("xyz", actor).await;
        assert!(matches!(late, Err(StoreError::SessionEnded(_))));
        assert_eq!(store.load_actor("xyz").await, None);

        store.persist_actor("fresh", actor).await.unwrap();
        assert_eq!(store.load_actor("fresh").await, Some(actor));
    }
}
