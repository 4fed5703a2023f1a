use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use trend_scout::session::SessionView;
use trend_scout::Dashboard;
use uuid::Uuid;

/// One browser session: the detail panel it last saw.
#[derive(Clone, Debug)]
pub struct SessionEntry {
    pub view: SessionView,
    pub last_seen: DateTime<Utc>,
}

impl Default for SessionEntry {
    fn default() -> Self {
        SessionEntry {
            view: SessionView::default(),
            last_seen: Utc::now(),
        }
    }
}

/// Shared across requests. The dashboard (and its list cache) is process-wide;
/// detail state is per session.
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Dashboard>,
    pub sessions: Arc<DashMap<Uuid, SessionEntry>>,
}

impl AppState {
    pub fn new(dashboard: Dashboard) -> Self {
        AppState {
            dashboard: Arc::new(dashboard),
            sessions: Arc::new(DashMap::new()),
        }
    }

    pub fn session(&self, id: Uuid) -> SessionView {
        self.sessions
            .get(&id)
            .map(|entry| entry.view.clone())
            .unwrap_or_default()
    }

    /// Applies `update` to the session's view, creating it on first use.
    pub fn update_session<F>(&self, id: Uuid, update: F) -> SessionView
    where
        F: FnOnce(&mut SessionView),
    {
        let mut entry = self.sessions.entry(id).or_default();
        update(&mut entry.view);
        entry.last_seen = Utc::now();
        entry.view.clone()
    }

    /// Refreshes `last_seen` of a known session. Unknown ids get no entry
    /// until a handler writes to them.
    pub fn touch(&self, id: Uuid) {
        if let Some(mut entry) = self.sessions.get_mut(&id) {
            entry.last_seen = Utc::now();
        }
    }

    /// Drops sessions idle for longer than `max_idle`. Returns how many went.
    pub fn prune_sessions(&self, max_idle: Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.last_seen >= cutoff);
        before - self.sessions.len()
    }
}
