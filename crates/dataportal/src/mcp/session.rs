//! Session store.
//!
//! Sessions are created on first contact and carry the client identity
//! reported by `initialize` plus a cancellation token per in-flight request.
//! Spans:
//! - `mcp.session.create` - session creation (new or resumed)
//! - `mcp.session.terminate` - explicit termination, cancels in-flight work

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::jsonrpc::RequestId;
use super::types::Implementation;

#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub created_at: Instant,
    pub last_seen: Instant,
    /// Set by `initialize`.
    pub client_info: Option<Implementation>,
    pub initialized: bool,
    /// Parent of every request token; cancelled when the session ends.
    cancel: CancellationToken,
    in_flight: HashMap<RequestId, CancellationToken>,
}

impl Session {
    fn new(id: String) -> Self {
        let now = Instant::now();
        Self {
            id,
            created_at: now,
            last_seen: now,
            client_info: None,
            initialized: false,
            cancel: CancellationToken::new(),
            in_flight: HashMap::new(),
        }
    }

    pub fn idle_duration(&self) -> Duration {
        self.last_seen.elapsed()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub total: usize,
    pub in_flight: usize,
}

/// In-memory session store.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `id_hint` if given (creating it when unknown), else a fresh UUID.
    pub fn get_or_create(&self, id_hint: Option<&str>) -> String {
        let id = id_hint
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let is_new = !self.sessions.contains_key(&id);

        let _span = tracing::info_span!(
            "mcp.session.create",
            mcp.session_id = %id,
            mcp.session.is_new = is_new,
        )
        .entered();

        self.sessions
            .entry(id.clone())
            .or_insert_with(|| Session::new(id.clone()));

        if is_new {
            tracing::info!("Created new session");
        } else {
            tracing::debug!("Resumed existing session");
        }
        id
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn touch(&self, id: &str) {
        if let Some(mut session) = self.sessions.get_mut(id) {
            session.last_seen = Instant::now();
        }
    }

    pub fn set_initialized(&self, id: &str, client_info: Implementation) {
        if let Some(mut session) = self.sessions.get_mut(id) {
            tracing::info!(
                session_id = %id,
                client_name = %client_info.name,
                client_version = %client_info.version,
                "Session initialized"
            );
            session.client_info = Some(client_info);
            session.initialized = true;
            session.last_seen = Instant::now();
        }
    }

    pub fn client_info(&self, id: &str) -> Option<Implementation> {
        self.sessions.get(id).and_then(|s| s.client_info.clone())
    }

    /// Register an in-flight request. The returned guard unregisters it on drop.
    pub fn begin_request(self: &Arc<Self>, id: &str, request_id: &RequestId) -> InFlight {
        let token = match self.sessions.get_mut(id) {
            Some(mut session) => {
                let token = session.cancel.child_token();
                session.in_flight.insert(request_id.clone(), token.clone());
                token
            }
            // Session already gone: the work is cancelled before it starts.
            None => {
                let token = CancellationToken::new();
                token.cancel();
                token
            }
        };

        InFlight {
            store: Arc::clone(self),
            session_id: id.to_string(),
            request_id: request_id.clone(),
            token,
        }
    }

    /// Cancel one in-flight request. Returns whether it was found.
    pub fn cancel_request(&self, id: &str, request_id: &RequestId) -> bool {
        let token = self
            .sessions
            .get(id)
            .and_then(|s| s.in_flight.get(request_id).cloned());

        match token {
            Some(token) => {
                token.cancel();
                tracing::info!(session_id = %id, request_id = %request_id, "Request cancelled");
                true
            }
            None => {
                tracing::debug!(session_id = %id, request_id = %request_id, "Cancel for unknown request");
                false
            }
        }
    }

    fn finish_request(&self, id: &str, request_id: &RequestId) {
        if let Some(mut session) = self.sessions.get_mut(id) {
            session.in_flight.remove(request_id);
        }
    }

    /// Remove a session and cancel everything it still has running.
    pub fn remove(&self, id: &str) -> bool {
        let _span = tracing::info_span!("mcp.session.terminate", mcp.session_id = %id).entered();
        match self.sessions.remove(id) {
            Some((_, session)) => {
                session.cancel.cancel();
                tracing::info!(in_flight = session.in_flight.len(), "Session terminated");
                true
            }
            None => false,
        }
    }

    /// Drop sessions idle longer than `max_idle` with nothing in flight.
    pub fn cleanup(&self, max_idle: Duration) -> usize {
        let stale: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.in_flight.is_empty() && entry.idle_duration() > max_idle)
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for id in stale {
            if let Some((_, session)) = self.sessions.remove(&id) {
                session.cancel.cancel();
                tracing::info!(session_id = %id, "Removed stale session");
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(removed, remaining = self.sessions.len(), "Session cleanup complete");
        }
        removed
    }

    pub fn stats(&self) -> SessionStats {
        let mut stats = SessionStats::default();
        for entry in self.sessions.iter() {
            stats.total += 1;
            stats.in_flight += entry.in_flight();
        }
        stats
    }
}

/// Registration of one in-flight request.
#[derive(Debug)]
pub struct InFlight {
    store: Arc<SessionStore>,
    session_id: String,
    request_id: RequestId,
    token: CancellationToken,
}

impl InFlight {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.store.finish_request(&self.session_id, &self.request_id);
    }
}

/// Periodically remove idle sessions until `cancel` fires.
pub fn spawn_cleanup_task(
    store: Arc<SessionStore>,
    interval: Duration,
    max_idle: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Session cleanup task stopped");
                    break;
                }
                _ = ticker.tick() => {
                    store.cleanup(max_idle);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_reuses_hint() {
        let store = SessionStore::new();
        let id = store.get_or_create(None);
        assert_eq!(store.get_or_create(Some(&id)), id);
        assert_eq!(store.stats().total, 1);

        assert_eq!(store.get_or_create(Some("chosen")), "chosen");
        assert_eq!(store.stats().total, 2);
    }

    #[test]
    fn test_cancel_request_fires_token() {
        let store = Arc::new(SessionStore::new());
        let id = store.get_or_create(None);
        let request = RequestId::Number(1);

        let in_flight = store.begin_request(&id, &request);
        assert_eq!(store.stats().in_flight, 1);

        assert!(store.cancel_request(&id, &request));
        assert!(in_flight.token().is_cancelled());
        assert!(!store.cancel_request(&id, &RequestId::Number(2)));
    }

    #[test]
    fn test_guard_unregisters_on_drop() {
        let store = Arc::new(SessionStore::new());
        let id = store.get_or_create(None);

        let in_flight = store.begin_request(&id, &RequestId::from("a"));
        drop(in_flight);

        assert_eq!(store.stats().in_flight, 0);
        assert!(!store.cancel_request(&id, &RequestId::from("a")));
    }

    #[test]
    fn test_remove_cancels_in_flight() {
        let store = Arc::new(SessionStore::new());
        let id = store.get_or_create(None);
        let in_flight = store.begin_request(&id, &RequestId::Number(9));

        assert!(store.remove(&id));
        assert!(in_flight.token().is_cancelled());
        assert!(!store.remove(&id));
    }

    #[test]
    fn test_request_on_missing_session_starts_cancelled() {
        let store = Arc::new(SessionStore::new());
        let in_flight = store.begin_request("gone", &RequestId::Number(1));
        assert!(in_flight.token().is_cancelled());
    }

    #[test]
    fn test_cleanup_spares_busy_sessions() {
        let store = Arc::new(SessionStore::new());
        let idle = store.get_or_create(Some("idle"));
        let busy = store.get_or_create(Some("busy"));
        let _in_flight = store.begin_request(&busy, &RequestId::Number(1));

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.cleanup(Duration::from_millis(1)), 1);
        assert!(!store.contains(&idle));
        assert!(store.contains(&busy));
    }
}
