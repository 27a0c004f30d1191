use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::pipeline::record::{join_formatted, UrlFailure};
use crate::pipeline::search::search::DEFAULT_RESULT_COUNT;

pub type SessionId = Uuid;

/// Set by a download action, cleared by the next run or summarize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DownloadFlags {
    pub responses: bool,
    pub summary: bool,
}

/// Everything one user has produced since their session started.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Formatted intent records, oldest run first. Never deduplicated.
    pub responses: Vec<String>,
    pub overall_summary: Option<String>,
    pub keyword: String,
    pub k: u32,
    /// URLs the most recent run could not analyze.
    pub failures: Vec<UrlFailure>,
    /// Error from the most recent action, if it failed.
    pub notice: Option<String>,
    pub downloads: DownloadFlags,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            responses: Vec::new(),
            overall_summary: None,
            keyword: String::new(),
            k: DEFAULT_RESULT_COUNT,
            failures: Vec::new(),
            notice: None,
            downloads: DownloadFlags::default(),
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, formatted: Vec<String>) {
        self.responses.extend(formatted);
    }

    pub fn has_responses(&self) -> bool {
        !self.responses.is_empty()
    }

    /// The accumulated report exactly as displayed and downloaded.
    pub fn all_content(&self) -> String {
        join_formatted(&self.responses)
    }

    pub fn fail(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }
}

struct Slot {
    state: Arc<Mutex<SessionState>>,
    last_seen: Instant,
}

/// Per-session state keyed by session id. Each session has its own lock, so one
/// user's long run never blocks another user.
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, Slot>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns the session for `id`, creating a fresh one when the id is unknown
    /// or expired. The flag is true when a new session was created.
    pub async fn open(&self, id: Option<SessionId>) -> (SessionId, Arc<Mutex<SessionState>>, bool) {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        prune_expired(&mut sessions, now, self.ttl);

        if let Some(id) = id {
            if let Some(slot) = sessions.get_mut(&id) {
                slot.last_seen = now;
                return (id, slot.state.clone(), false);
            }
        }

        let id = Uuid::new_v4();
        let state = Arc::new(Mutex::new(SessionState::new()));
        sessions.insert(
            id,
            Slot {
                state: state.clone(),
                last_seen: now,
            },
        );
        (id, state, true)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Drops idle sessions. A session still held by an in-flight request is kept.
fn prune_expired(sessions: &mut HashMap<SessionId, Slot>, now: Instant, ttl: Duration) {
    sessions.retain(|_, slot| {
        now.duration_since(slot.last_seen) < ttl || Arc::strong_count(&slot.state) > 1
    });
}
