use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::classifier::FireClassifier;
use super::inputs::InputState;
use super::location::ReverseGeocoder;
use super::schema::FeatureSchema;
use super::session::{PredictionSession, PredictionSnapshot, SessionPhase};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bounds on how many sessions the registry keeps and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_sessions: usize,
    /// Sessions untouched for longer than this are dropped on the next prune.
    pub idle_timeout: Duration,
}

impl SessionLimits {
    pub const DEFAULT_MAX_SESSIONS: usize = 1024;
    pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: Self::DEFAULT_MAX_SESSIONS,
            idle_timeout: Self::DEFAULT_IDLE_TIMEOUT,
        }
    }
}

/// Returned by [`SessionRegistry::create`] when every slot is held by a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("session limit of {limit} reached; try again later")]
pub struct RegistryFull {
    pub limit: usize,
}

/// Independent prediction sessions sharing one schema, classifier, and geocoder.
///
/// Each session sits behind its own mutex, so actions on one session run one at a
/// time while other sessions proceed. The map lock is never held while a session
/// lock is taken.
pub struct SessionRegistry<C, G> {
    schema: Arc<FeatureSchema>,
    classifier: Arc<C>,
    geocoder: Arc<G>,
    limits: SessionLimits,
    sequence: AtomicU64,
    sessions: Mutex<HashMap<SessionId, SessionHandle<C, G>>>,
}

impl<C, G> SessionRegistry<C, G>
where
    C: FireClassifier,
    G: ReverseGeocoder,
{
    pub fn new(schema: Arc<FeatureSchema>, classifier: Arc<C>, geocoder: Arc<G>) -> Self {
        Self {
            schema,
            classifier,
            geocoder,
            limits: SessionLimits::default(),
            sequence: AtomicU64::new(1),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Registers a fresh idle session, pruning expired ones first.
    pub fn create(&self) -> Result<SessionHandle<C, G>, RegistryFull> {
        let now = Utc::now();
        let mut sessions = self.lock_sessions();
        self.prune_locked(&mut sessions, now);
        if sessions.len() >= self.limits.max_sessions {
            tracing::warn!(limit = self.limits.max_sessions, "session limit reached");
            return Err(RegistryFull {
                limit: self.limits.max_sessions,
            });
        }

        let id = SessionId(format!(
            "session-{:06}",
            self.sequence.fetch_add(1, Ordering::Relaxed)
        ));
        let session = PredictionSession::new(
            Arc::clone(&self.schema),
            Arc::clone(&self.classifier),
            Arc::clone(&self.geocoder),
        );
        let handle = SessionHandle {
            id: id.clone(),
            created_at: now,
            last_active: Arc::new(AtomicI64::new(now.timestamp_millis())),
            session: Arc::new(Mutex::new(session)),
        };

        sessions.insert(id, handle.clone());
        drop(sessions);
        tracing::info!(session = %handle.id, "session created");
        Ok(handle)
    }

    pub fn get(&self, id: &SessionId) -> Option<SessionHandle<C, G>> {
        self.lock_sessions().get(id).cloned()
    }

    pub fn remove(&self, id: &SessionId) -> bool {
        self.lock_sessions().remove(id).is_some()
    }

    /// Drops sessions idle past the timeout as of `now`. Sessions another caller
    /// still holds a handle to are kept. Returns how many were dropped.
    pub fn prune_idle(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.lock_sessions();
        self.prune_locked(&mut sessions, now)
    }

    pub fn len(&self) -> usize {
        self.lock_sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune_locked(
        &self,
        sessions: &mut HashMap<SessionId, SessionHandle<C, G>>,
        now: DateTime<Utc>,
    ) -> usize {
        let idle_millis =
            i64::try_from(self.limits.idle_timeout.as_millis()).unwrap_or(i64::MAX);
        let cutoff = now.timestamp_millis().saturating_sub(idle_millis);
        let before = sessions.len();
        sessions.retain(|_, handle| handle.in_use() || handle.last_active_millis() >= cutoff);
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::info!(pruned, remaining = sessions.len(), "idle sessions expired");
        }
        pruned
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<SessionId, SessionHandle<C, G>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared reference to one registered session.
pub struct SessionHandle<C, G> {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    last_active: Arc<AtomicI64>,
    session: Arc<Mutex<PredictionSession<C, G>>>,
}

impl<C, G> Clone for SessionHandle<C, G> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            created_at: self.created_at,
            last_active: Arc::clone(&self.last_active),
            session: Arc::clone(&self.session),
        }
    }
}

impl<C, G> std::fmt::Debug for SessionHandle<C, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl<C, G> SessionHandle<C, G>
where
    C: FireClassifier,
    G: ReverseGeocoder,
{
    /// Transitions replace state whole, so a poisoned lock still guards a
    /// consistent session. Blocks while another action on this session runs;
    /// async callers should take it from a blocking worker.
    pub fn lock(&self) -> MutexGuard<'_, PredictionSession<C, G>> {
        self.touch();
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn view(&self) -> SessionView {
        let session = self.lock();
        SessionView {
            id: self.id.clone(),
            created_at: self.created_at,
            phase: session.phase(),
            inputs: session.inputs().clone(),
            snapshot: session.read_snapshot().cloned(),
        }
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_active_millis()).unwrap_or(self.created_at)
    }
}

impl<C, G> SessionHandle<C, G> {
    fn touch(&self) {
        self.last_active
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    fn last_active_millis(&self) -> i64 {
        self.last_active.load(Ordering::Relaxed)
    }

    /// The registry's own copy is one reference; any other means a request is
    /// working on the session right now.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.session) > 1
    }
}

/// Serializable picture of a session for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub phase: SessionPhase,
    pub inputs: InputState,
    pub snapshot: Option<PredictionSnapshot>,
}
