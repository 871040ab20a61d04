use std::sync::{PoisonError, RwLock};

use crate::auth::session::SessionStore;
use crate::model::role::Role;
use crate::model::user::Actor;

/// Holds the authenticated actor of one session, or nothing.
///
/// `establish` and `clear` replace the whole value under a write lock, so a
/// concurrent `current` sees either the old or the new actor.
#[derive(Debug, Default)]
pub struct IdentityContext {
    current: RwLock<Option<Actor>>,
}

impl IdentityContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actor(actor: Actor) -> Self {
        Self {
            current: RwLock::new(Some(actor)),
        }
    }

    /// Rebuild the context of session `sid` from the session store.
    pub async fn restore(store: &dyn SessionStore, sid: &str) -> Self {
        match store.load_actor(sid).await {
            Some(actor) => Self::with_actor(actor),
            None => Self::new(),
        }
    }

    pub fn current(&self) -> Option<Actor> {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn establish(&self, actor: Actor) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(actor);
    }

    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.current().is_some_and(|a| a.role == role)
    }

    pub fn is_manager(&self) -> bool {
        self.has_role(Role::Manager)
    }

    pub fn is_employee(&self) -> bool {
        self.has_role(Role::Employee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::MemorySessionStore;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn starts_empty() {
        let ctx = IdentityContext::new();
        assert_eq!(ctx.current(), None);
        assert!(!ctx.is_authenticated());
        assert!(!ctx.is_manager());
        assert!(!ctx.is_employee());
    }

    #[test]
    fn establish_then_clear() {
        let ctx = IdentityContext::new();
        let manager = Actor::new(2, Role::Manager);

        ctx.establish(manager);
        assert_eq!(ctx.current(), Some(manager));
        assert!(ctx.is_manager());
        assert!(!ctx.has_role(Role::Employee));

        ctx.clear();
        assert_eq!(ctx.current(), None);
        assert!(!ctx.is_manager());
    }

    #[test]
    fn readers_never_see_a_mixed_actor() {
        let ctx = Arc::new(IdentityContext::new());
        let a = Actor::new(1, Role::Employee);
        let b = Actor::new(2, Role::Manager);

        let writer = {
            let ctx = ctx.clone();
            std::thread::spawn(move || {
                for i in 0..1000 {
                    match i % 3 {
                        0 => ctx.establish(a),
                        1 => ctx.establish(b),
                        _ => ctx.clear(),
                    }
                }
            })
        };

        for _ in 0..1000 {
            let seen = ctx.current();
            assert!(seen.is_none() || seen == Some(a) || seen == Some(b));
        }
        writer.join().unwrap();
    }

    #[actix_web::test]
    async fn restores_from_session_store() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let actor = Actor::new(5, Role::Employee);
        store.persist_actor("sid-1", actor).await.unwrap();

        let ctx = IdentityContext::restore(&store, "sid-1").await;
        assert_eq!(ctx.current(), Some(actor));

        let missing = IdentityContext::restore(&store, "sid-2").await;
        assert_eq!(missing.current(), None);
    }
}
