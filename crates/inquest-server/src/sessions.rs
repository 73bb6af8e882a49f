//! In-memory session registry keyed by UUID.
//!
//! Each entry sits behind its own mutex, so requests for different sessions
//! never contend. Expired entries are swept when a new session is created;
//! there is no background task to manage.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{Level, event};
use uuid::Uuid;

use inquest_bot::Quizmaster;
use inquest_core::game::GameSession;
use inquest_core::model::Catalog;

use crate::config::SessionLimits;

/// One live game: the catalog snapshot it opened with, the quizmaster
/// driving it, and the session state itself.
pub struct SessionEntry {
    pub catalog: Arc<Catalog>,
    pub master: Quizmaster,
    pub session: GameSession,
    touched: Instant,
}

impl SessionEntry {
    pub fn new(catalog: Arc<Catalog>, master: Quizmaster, session: GameSession) -> Self {
        Self {
            catalog,
            master,
            session,
            touched: Instant::now(),
        }
    }

    /// Marks the entry active; idle age feeds the TTL sweep.
    pub fn touch(&mut self) {
        self.touched = Instant::now();
    }

    fn idle(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.touched)
    }
}

pub struct SessionStore {
    entries: RwLock<HashMap<Uuid, Arc<Mutex<SessionEntry>>>>,
    limits: SessionLimits,
}

impl SessionStore {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            limits,
        }
    }

    /// Registers a session under a fresh id, sweeping expired entries first
    /// and evicting the oldest idle entry when the store is full.
    pub fn insert(&self, entry: SessionEntry) -> Uuid {
        let mut entries = self.entries.write();
        let now = Instant::now();
        let ttl = self.limits.idle_timeout();

        entries.retain(|id, cell| match cell.try_lock() {
            Some(held) if held.idle(now) > ttl => {
                event!(
                    target: "inquest_server::sessions",
                    Level::DEBUG,
                    session = %id,
                    "expired session swept",
                );
                false
            }
            _ => true,
        });

        if entries.len() >= self.limits.max_sessions {
            let oldest = entries
                .iter()
                .filter_map(|(id, cell)| cell.try_lock().map(|held| (*id, held.touched)))
                .min_by_key(|(_, touched)| *touched)
                .map(|(id, _)| id);
            match oldest {
                Some(id) => {
                    entries.remove(&id);
                    event!(
                        target: "inquest_server::sessions",
                        Level::INFO,
                        session = %id,
                        "idle session evicted at capacity",
                    );
                }
                None => {
                    // Every entry is mid-request; let the store overshoot
                    // rather than turn the new game away.
                    event!(
                        target: "inquest_server::sessions",
                        Level::WARN,
                        live = entries.len(),
                        "store at capacity with every session busy",
                    );
                }
            }
        }

        let id = Uuid::new_v4();
        entries.insert(id, Arc::new(Mutex::new(entry)));
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<Mutex<SessionEntry>>> {
        self.entries.read().get(id).cloned()
    }

    /// Drops a session, normally on a terminal outcome.
    pub fn remove(&self, id: &Uuid) -> bool {
        self.entries.write().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionEntry, SessionStore};
    use crate::config::SessionLimits;
    use inquest_bot::Quizmaster;
    use inquest_core::config::EngineConfig;
    use inquest_core::model::{Catalog, Character, Question};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn entry() -> SessionEntry {
        let catalog = Arc::new(
            Catalog::new(
                vec![
                    Character::new("char_owl", "Owl").with_trait("flies", 9.0, 1.0),
                    Character::new("char_mole", "Mole").with_trait("flies", 1.0, 9.0),
                ],
                vec![Question::new("q_flies", "Does your character fly?", "flies")],
            )
            .unwrap(),
        );
        let mut master = Quizmaster::new(EngineConfig::default());
        let (session, _) = master.begin(&catalog);
        SessionEntry::new(catalog, master, session)
    }

    fn backdate(store: &SessionStore, id: &uuid::Uuid, secs: u64) {
        let cell = store.get(id).unwrap();
        cell.lock().touched = Instant::now()
            .checked_sub(Duration::from_secs(secs))
            .expect("clock older than backdate");
    }

    #[test]
    fn insert_get_remove_round_trip() {
        let store = SessionStore::new(SessionLimits::default());
        let id = store.insert(entry());

        assert_eq!(store.len(), 1);
        assert!(store.get(&id).is_some());
        assert!(store.remove(&id));
        assert!(store.is_empty());
        assert!(store.get(&id).is_none());
        assert!(!store.remove(&id));
    }

    #[test]
    fn expired_sessions_are_swept_on_insert() {
        let store = SessionStore::new(SessionLimits {
            max_sessions: 16,
            idle_timeout_secs: 60,
        });
        let stale = store.insert(entry());
        backdate(&store, &stale, 120);

        let fresh = store.insert(entry());
        assert!(store.get(&stale).is_none());
        assert!(store.get(&fresh).is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn capacity_evicts_the_oldest_idle_entry() {
        let store = SessionStore::new(SessionLimits {
            max_sessions: 2,
            idle_timeout_secs: 3600,
        });
        let a = store.insert(entry());
        let b = store.insert(entry());
        backdate(&store, &a, 300);
        backdate(&store, &b, 30);

        let c = store.insert(entry());
        assert_eq!(store.len(), 2);
        assert!(store.get(&a).is_none());
        assert!(store.get(&b).is_some());
        assert!(store.get(&c).is_some());
    }

    #[test]
    fn busy_sessions_are_never_evicted() {
        let store = SessionStore::new(SessionLimits {
            max_sessions: 1,
            idle_timeout_secs: 3600,
        });
        let a = store.insert(entry());
        let cell = store.get(&a).unwrap();
        let guard = cell.lock();

        // The only candidate is mid-request, so the store overshoots.
        let b = store.insert(entry());
        assert_eq!(store.len(), 2);
        assert!(store.get(&b).is_some());
        drop(guard);
    }

    #[test]
    fn touch_resets_idle_age() {
        let store = SessionStore::new(SessionLimits {
            max_sessions: 16,
            idle_timeout_secs: 60,
        });
        let id = store.insert(entry());
        backdate(&store, &id, 120);
        store.get(&id).unwrap().lock().touch();

        store.insert(entry());
        assert!(store.get(&id).is_some(), "touched session must survive the sweep");
    }
}
