//! Session storage: one [`DashboardSession`] per browser session.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use futures::future::join_all;
use tracing::info;
use uuid::Uuid;

use super::context::DashboardSession;
use crate::mcp::McpAdapter;
use crate::registry::ServerRegistry;
use crate::theme::Theme;

/// What a fresh session starts from.
#[derive(Debug, Clone)]
pub struct SessionDefaults {
    pub registry: ServerRegistry,
    pub theme: Theme,
    pub history_limit: usize,
    /// Sessions untouched for longer than this are torn down.
    pub idle_timeout: Duration,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            registry: ServerRegistry::with_default_server(),
            theme: Theme::default(),
            history_limit: 50,
            idle_timeout: Duration::from_secs(60 * 60),
        }
    }
}

/// Thread-safe store for dashboard sessions.
///
/// Creating a session starts it from [`SessionDefaults`]; removing one hands
/// it back so the caller can tear it down outside the store lock.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug)]
struct SessionStoreInner {
    sessions: RwLock<HashMap<String, DashboardSession>>,
    adapter: McpAdapter,
    defaults: SessionDefaults,
}

impl SessionStore {
    #[must_use]
    pub fn new(adapter: McpAdapter, defaults: SessionDefaults) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
                adapter,
                defaults,
            }),
        }
    }

    /// Create a session under a fresh random id.
    #[must_use]
    pub fn create(&self) -> DashboardSession {
        self.create_with_id(Uuid::new_v4().to_string())
    }

    /// Create (or replace) the session under `id`.
    #[must_use]
    pub fn create_with_id(&self, id: impl Into<String>) -> DashboardSession {
        let id = id.into();
        let defaults = &self.inner.defaults;
        let session = DashboardSession::new(
            id.clone(),
            self.inner.adapter.clone(),
            defaults.registry.clone(),
            defaults.theme,
            defaults.history_limit,
        );
        self.inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), session.clone());
        info!(name: "session.created", session = %id, "Dashboard session created");
        session
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<DashboardSession> {
        self.inner
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Session for `id`; ids that are not UUIDs are never stored, a fresh
    /// session is created instead.
    #[must_use]
    pub fn get_or_create(&self, id: Option<&str>) -> DashboardSession {
        match id.filter(|id| Uuid::parse_str(id).is_ok()) {
            Some(id) => self.get(id).unwrap_or_else(|| self.create_with_id(id)),
            None => self.create(),
        }
    }

    pub fn remove(&self, id: &str) -> Option<DashboardSession> {
        self.inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    /// Remove the session under `id` and close all of its MCP sessions.
    pub async fn end(&self, id: &str) -> bool {
        let Some(session) = self.remove(id) else {
            return false;
        };
        session.disconnect_all().await;
        info!(name: "session.ended", session = %id, "Dashboard session ended");
        true
    }

    /// Remove and tear down sessions idle for longer than the configured
    /// timeout. Returns how many were removed.
    pub async fn reap_idle(&self) -> usize {
        let timeout = self.inner.defaults.idle_timeout;
        let expired: Vec<DashboardSession> = {
            let mut guard = self.inner.sessions.write().unwrap_or_else(PoisonError::into_inner);
            let ids: Vec<String> = guard
                .iter()
                .filter(|(_, s)| s.is_idle_for(timeout))
                .map(|(id, _)| id.clone())
                .collect();
            ids.iter().filter_map(|id| guard.remove(id)).collect()
        };
        join_all(expired.iter().map(DashboardSession::disconnect_all)).await;
        if !expired.is_empty() {
            info!(name: "session.reaped", count = expired.len(), "Idle dashboard sessions ended");
        }
        expired.len()
    }

    /// Tear down every session.
    pub async fn shutdown(&self) {
        let all: Vec<DashboardSession> = self
            .inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, s)| s)
            .collect();
        join_all(all.iter().map(DashboardSession::disconnect_all)).await;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
