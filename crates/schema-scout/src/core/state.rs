use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::Mutex;

use crate::core::session::{SessionConfig, SessionHandle};

/// Owner of the single live database session.
///
/// At most one open session exists at any instant. Mutation is serialized
/// under `swap`, so a second `set_connection` arriving while another is
/// mid-connect waits instead of racing. The session slot itself sits behind
/// a `RwLock` with short critical sections, so `get_connection` never waits
/// on connect I/O and always observes a fully-formed session or none.
///
/// This is an injectable service object, not a hidden global; construct one
/// and pass it to every consumer that needs the session.
#[derive(Clone)]
pub struct ConnectionState {
    slot: Arc<RwLock<Option<SessionHandle>>>,
    swap: Arc<Mutex<()>>,
    config: SessionConfig,
}

impl ConnectionState {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            slot: Arc::new(RwLock::new(None)),
            swap: Arc::new(Mutex::new(())),
            config,
        }
    }

    /// Opens a new session against `url`, closing any existing one first.
    ///
    /// Returns false on any connect failure (malformed url, unreachable
    /// server, auth) and leaves no session active; the failure is logged,
    /// never propagated.
    pub async fn set_connection(&self, url: &str) -> bool {
        let _swap = self.swap.lock().await;

        let previous = self.write_slot().take();
        if let Some(session) = previous {
            session.close().await;
        }

        match SessionHandle::open(url, &self.config).await {
            Ok(session) => {
                *self.write_slot() = Some(session);
                tracing::info!("database session established");
                true
            }
            Err(e) => {
                tracing::error!(code = e.code(), error = %e, "set_connection failed");
                false
            }
        }
    }

    /// The current session, or `None`. Never blocks on I/O.
    pub fn get_connection(&self) -> Option<SessionHandle> {
        self.read_slot().clone()
    }

    /// Closes the current session. Idempotent; a no-op when nothing is open.
    pub async fn close_connection(&self) {
        let _swap = self.swap.lock().await;

        let previous = self.write_slot().take();
        if let Some(session) = previous {
            session.close().await;
            tracing::info!("database session closed");
        }
    }

    fn read_slot(&self) -> RwLockReadGuard<'_, Option<SessionHandle>> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, Option<SessionHandle>> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::DbTask;
    use tokio::sync::mpsc;

    /// A stand-in session whose worker counts close requests.
    fn fake_session(url: &str) -> (SessionHandle, tokio::task::JoinHandle<u32>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(async move {
            let mut closes = 0u32;
            while let Some(task) = rx.recv().await {
                if let DbTask::Close { respond_to } = task {
                    closes += 1;
                    let _ = respond_to.send(());
                    break;
                }
            }
            closes
        });
        (SessionHandle::from_parts(tx, url), worker)
    }

    fn state_with_fake_session() -> (ConnectionState, tokio::task::JoinHandle<u32>) {
        let state = ConnectionState::default();
        let (session, worker) = fake_session("postgres://stub/db");
        *state.write_slot() = Some(session);
        (state, worker)
    }

    #[tokio::test]
    async fn close_connection_is_idempotent() {
        let (state, worker) = state_with_fake_session();
        assert!(state.get_connection().is_some());

        state.close_connection().await;
        assert!(state.get_connection().is_none());

        // Second close is a no-op.
        state.close_connection().await;
        assert!(state.get_connection().is_none());
        assert_eq!(worker.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn set_connection_with_invalid_url_leaves_no_session() {
        let state = ConnectionState::default();
        assert!(!state.set_connection("not-a-database-url").await);
        assert!(state.get_connection().is_none());
    }

    #[tokio::test]
    async fn failed_set_connection_still_closes_previous_session() {
        let (state, worker) = state_with_fake_session();

        assert!(!state.set_connection("not-a-database-url").await);
        assert!(state.get_connection().is_none());
        assert_eq!(worker.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_set_connection_calls_leave_no_dangling_session() {
        let state = ConnectionState::default();
        let attempts = (0..8).map(|i| {
            let state = state.clone();
            tokio::spawn(async move { state.set_connection(&format!("bad-url-{i}")).await })
        });
        for attempt in attempts {
            assert!(!attempt.await.unwrap());
        }
        assert!(state.get_connection().is_none());
    }

    #[tokio::test]
    async fn get_connection_returns_installed_session() {
        let (state, _worker) = state_with_fake_session();
        let session = state.get_connection().expect("session should be present");
        assert_eq!(session.url(), "postgres://stub/db");
        state.close_connection().await;
    }
}
