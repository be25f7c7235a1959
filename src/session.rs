// 🔐 Session Store - one independent ledger per interactive session
//
// Ledgers are created empty when a session starts and dropped when it
// ends, either explicitly or after sitting idle past the timeout. Nothing
// is shared between sessions and nothing outlives them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

use crate::ledger::ExpenseLedger;

/// Sessions untouched for this long are discarded
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(Uuid),
}

struct Session {
    ledger: ExpenseLedger,
    last_access: Instant,
}

impl Session {
    fn touch(&mut self) -> &mut ExpenseLedger {
        self.last_access = Instant::now();
        &mut self.ledger
    }
}

/// Cloneable handle over the live sessions
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, Session>>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        SessionStore {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            idle_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a session with an empty ledger.
    ///
    /// Idle sessions are evicted first, so abandoned sessions cannot pile up
    /// even without the periodic sweep.
    pub fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let mut sessions = self.lock();
        evict(&mut sessions, Instant::now(), self.idle_timeout);
        sessions.insert(
            id,
            Session {
                ledger: ExpenseLedger::new(),
                last_access: Instant::now(),
            },
        );
        tracing::info!(session = %id, live = sessions.len(), "session started");
        id
    }

    /// End a session and discard its ledger
    pub fn end(&self, id: Uuid) -> Result<(), SessionError> {
        match self.lock().remove(&id) {
            Some(session) => {
                tracing::info!(session = %id, entries = session.ledger.len(), "session ended");
                Ok(())
            }
            None => Err(SessionError::NotFound(id)),
        }
    }

    /// Discard every session idle for at least the timeout; returns how many
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    /// Same as [`evict_idle`](Self::evict_idle) with an explicit clock reading
    pub fn evict_idle_at(&self, now: Instant) -> usize {
        evict(&mut self.lock(), now, self.idle_timeout)
    }

    pub fn with_ledger<T>(&self, id: Uuid, f: impl FnOnce(&ExpenseLedger) -> T) -> Result<T, SessionError> {
        let mut sessions = self.lock();
        sessions
            .get_mut(&id)
            .map(|session| f(&*session.touch()))
            .ok_or(SessionError::NotFound(id))
    }

    pub fn with_ledger_mut<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut ExpenseLedger) -> T,
    ) -> Result<T, SessionError> {
        let mut sessions = self.lock();
        sessions
            .get_mut(&id)
            .map(|session| f(session.touch()))
            .ok_or(SessionError::NotFound(id))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn evict(sessions: &mut HashMap<Uuid, Session>, now: Instant, idle_timeout: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|id, session| {
        let keep = now.saturating_duration_since(session.last_access) < idle_timeout;
        if !keep {
            tracing::info!(session = %id, entries = session.ledger.len(), "idle session evicted");
        }
        keep
    });
    before - sessions.len()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_new_session_is_empty() {
        let store = SessionStore::new();
        let id = store.create();

        assert_eq!(store.len(), 1);
        assert_eq!(store.with_ledger(id, |l| l.is_empty()), Ok(true));
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        let a = store.create();
        let b = store.create();

        store
            .with_ledger_mut(a, |l| {
                l.append(day(1), "飲食", 1000.0);
            })
            .unwrap();

        assert_eq!(store.with_ledger(a, |l| l.len()), Ok(1));
        assert_eq!(store.with_ledger(b, |l| l.len()), Ok(0));
        assert_eq!(store.with_ledger(b, |l| l.grand_total()), Ok(0.0));
    }

    #[test]
    fn test_end_discards_ledger() {
        let store = SessionStore::new();
        let id = store.create();
        store
            .with_ledger_mut(id, |l| {
                l.append(day(2), "交通", 100.0);
            })
            .unwrap();

        assert_eq!(store.end(id), Ok(()));
        assert!(store.is_empty());
        assert_eq!(store.with_ledger(id, |l| l.len()), Err(SessionError::NotFound(id)));
        assert_eq!(store.end(id), Err(SessionError::NotFound(id)));
    }

    #[test]
    fn test_clones_share_sessions() {
        let store = SessionStore::new();
        let handle = store.clone();
        let id = store.create();

        assert_eq!(handle.with_ledger(id, |l| l.len()), Ok(0));
    }

    #[test]
    fn test_idle_session_is_evicted() {
        let store = SessionStore::with_idle_timeout(Duration::from_secs(60));
        let id = store.create();
        store
            .with_ledger_mut(id, |l| {
                l.append(day(3), "購物", 10.0);
            })
            .unwrap();

        // Not idle long enough yet
        assert_eq!(store.evict_idle_at(Instant::now()), 0);
        assert_eq!(store.with_ledger(id, |l| l.len()), Ok(1));

        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(store.evict_idle_at(later), 1);
        assert!(store.is_empty());
        assert_eq!(store.with_ledger(id, |l| l.len()), Err(SessionError::NotFound(id)));
    }

    #[test]
    fn test_create_evicts_idle_sessions() {
        let store = SessionStore::with_idle_timeout(Duration::ZERO);
        let abandoned = store.create();
        let fresh = store.create();

        assert_eq!(store.len(), 1);
        assert_eq!(store.end(abandoned), Err(SessionError::NotFound(abandoned)));
        assert_eq!(store.end(fresh), Ok(()));
    }

    #[test]
    fn test_default_idle_timeout() {
        assert_eq!(SessionStore::new().idle_timeout(), DEFAULT_IDLE_TIMEOUT);
    }

    #[test]
    fn test_unknown_session() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();

        assert_eq!(
            store.with_ledger_mut(id, |l| l.len()),
            Err(SessionError::NotFound(id))
        );
    }
}
