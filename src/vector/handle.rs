//! Degraded-mode wrapper around an optional vector backend.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::{Result, VectorHit, VectorIndex, VectorPayload};
use crate::memory_types::MemoryType;

/// Opens a backend and makes it ready.
pub type Connector = Box<dyn Fn() -> Result<Arc<dyn VectorIndex>> + Send + Sync>;

struct HandleState {
    index: Option<Arc<dyn VectorIndex>>,
    last_attempt: Option<Instant>,
}

/// Holds the vector backend while it works and nothing while it doesn't.
///
/// An outage error from the backend drops it and the handle reports
/// unavailable; errors caused by one bad vector are logged and that item is
/// skipped. Operations on an unavailable handle are no-ops: upserts are
/// skipped and searches return no hits. Reconnection is attempted at most
/// once per `retry_interval`, and only through `maybe_reconnect`. The
/// connector runs without the state lock held, so `available` and `search`
/// never wait on a reconnect in progress.
pub struct VectorIndexHandle {
    connector: Option<Connector>,
    retry_interval: Duration,
    state: Mutex<HandleState>,
}

impl VectorIndexHandle {
    /// Connect now; on failure start in degraded mode.
    pub fn connect(connector: Connector, retry_interval: Duration) -> Self {
        let handle = Self {
            connector: Some(connector),
            retry_interval,
            state: Mutex::new(HandleState {
                index: None,
                last_attempt: Some(Instant::now()),
            }),
        };
        handle.attempt();
        handle
    }

    /// Wrap an existing backend that is reconnected by reusing it.
    pub fn from_index(index: Arc<dyn VectorIndex>, retry_interval: Duration) -> Self {
        Self::connect(
            Box::new(move || {
                index.ensure_ready()?;
                Ok(Arc::clone(&index))
            }),
            retry_interval,
        )
    }

    /// A handle that is permanently in degraded mode.
    pub fn disabled() -> Self {
        info!("vector index disabled, semantic search off");
        Self {
            connector: None,
            retry_interval: Duration::MAX,
            state: Mutex::new(HandleState {
                index: None,
                last_attempt: None,
            }),
        }
    }

    pub fn available(&self) -> bool {
        self.state().index.is_some()
    }

    /// Backend name, or `None` when degraded.
    pub fn backend_name(&self) -> Option<&'static str> {
        self.state().index.as_ref().map(|index| index.name())
    }

    /// Retry the connection if degraded and the retry interval has elapsed.
    ///
    /// Concurrent callers inside the same interval return immediately
    /// instead of queueing behind the attempt.
    pub fn maybe_reconnect(&self) -> bool {
        {
            let mut state = self.state();
            if state.index.is_some() {
                return true;
            }
            let due = state
                .last_attempt
                .is_none_or(|at| at.elapsed() >= self.retry_interval);
            if !due || self.connector.is_none() {
                return false;
            }
            state.last_attempt = Some(Instant::now());
        }
        self.attempt()
    }

    /// Store a chunk vector. Returns whether it was written.
    pub fn upsert(&self, payload: &VectorPayload, vector: &[f32]) -> bool {
        let Some(index) = self.current() else {
            return false;
        };
        match index.upsert(payload, vector) {
            Ok(()) => true,
            Err(e) if e.is_unavailable() => {
                self.mark_unavailable(&format!("upsert failed: {e}"));
                false
            }
            Err(e) => {
                warn!(chunk_id = %payload.chunk_id, error = %e, "vector rejected, chunk not indexed");
                false
            }
        }
    }

    /// Search for similar chunks; empty when degraded or on failure.
    pub fn search(&self, vector: &[f32], limit: usize, memory_type: Option<MemoryType>) -> Vec<VectorHit> {
        let Some(index) = self.current() else {
            return Vec::new();
        };
        match index.search(vector, limit, memory_type) {
            Ok(hits) => hits,
            Err(e) if e.is_unavailable() => {
                self.mark_unavailable(&format!("search failed: {e}"));
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "vector search rejected, no semantic hits");
                Vec::new()
            }
        }
    }

    /// Remove chunk vectors. Returns whether the backend confirmed it.
    pub fn delete(&self, chunk_ids: &[String]) -> bool {
        let Some(index) = self.current() else {
            return false;
        };
        match index.delete(chunk_ids) {
            Ok(()) => true,
            Err(e) if e.is_unavailable() => {
                self.mark_unavailable(&format!("delete failed: {e}"));
                false
            }
            Err(e) => {
                warn!(chunks = chunk_ids.len(), error = %e, "vector delete rejected");
                false
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, HandleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clone the backend out so calls don't hold the state lock.
    fn current(&self) -> Option<Arc<dyn VectorIndex>> {
        self.state().index.clone()
    }

    /// Run the connector with the state unlocked and install its result.
    fn attempt(&self) -> bool {
        let Some(connector) = &self.connector else {
            return false;
        };
        match connector() {
            Ok(index) => {
                let mut state = self.state();
                if state.index.is_none() {
                    info!(backend = index.name(), "vector index available");
                    state.index = Some(index);
                }
                true
            }
            Err(e) => {
                warn!(error = %e, "vector index unavailable, semantic search disabled");
                false
            }
        }
    }

    fn mark_unavailable(&self, reason: &str) {
        let mut state = self.state();
        if state.index.take().is_some() {
            state.last_attempt = Some(Instant::now());
            warn!(reason, "vector index became unavailable, switching to degraded mode");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::VectorError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Backend that can be taken down and brought back.
    struct FlakyIndex {
        down: AtomicBool,
        upserts: AtomicUsize,
    }

    impl FlakyIndex {
        fn new(down: bool) -> Arc<Self> {
            Arc::new(Self {
                down: AtomicBool::new(down),
                upserts: AtomicUsize::new(0),
            })
        }

        fn check(&self) -> Result<()> {
            if self.down.load(Ordering::SeqCst) {
                return Err(VectorError::Unreachable("connection refused".to_string()));
            }
            Ok(())
        }
    }

    impl VectorIndex for FlakyIndex {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn ensure_ready(&self) -> Result<()> {
            self.check()
        }

        fn upsert(&self, _payload: &VectorPayload, vector: &[f32]) -> Result<()> {
            self.check()?;
            if vector.len() != 1 {
                return Err(VectorError::MismatchedDimensions {
                    expected: 1,
                    actual: vector.len(),
                });
            }
            self.upserts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn search(&self, vector: &[f32], _limit: usize, _t: Option<MemoryType>) -> Result<Vec<VectorHit>> {
            self.check()?;
            if vector.iter().any(|x| !x.is_finite()) {
                return Err(VectorError::InvalidVector("NaN".to_string()));
            }
            Ok(vec![VectorHit {
                chunk_id: "a_chunk0".to_string(),
                parent_id: "a".to_string(),
                score: 0.9,
            }])
        }

        fn delete(&self, _chunk_ids: &[String]) -> Result<()> {
            self.check()
        }
    }

    fn payload() -> VectorPayload {
        VectorPayload {
            chunk_id: "a_chunk0".to_string(),
            parent_id: "a".to_string(),
            memory_type: MemoryType::Note,
        }
    }

    #[test]
    fn test_available_backend() {
        let backend = FlakyIndex::new(false);
        let handle = VectorIndexHandle::from_index(backend.clone(), Duration::from_secs(60));
        assert!(handle.available());
        assert_eq!(handle.backend_name(), Some("flaky"));
        assert!(handle.upsert(&payload(), &[1.0]));
        assert_eq!(handle.search(&[1.0], 5, None).len(), 1);
        assert_eq!(backend.upserts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unreachable_at_startup_is_degraded() {
        let handle = VectorIndexHandle::from_index(FlakyIndex::new(true), Duration::from_secs(60));
        assert!(!handle.available());
        assert!(!handle.upsert(&payload(), &[1.0]));
        assert!(handle.search(&[1.0], 5, None).is_empty());
        assert!(!handle.delete(&["a_chunk0".to_string()]));
    }

    #[test]
    fn test_failure_switches_to_degraded() {
        let backend = FlakyIndex::new(false);
        let handle = VectorIndexHandle::from_index(backend.clone(), Duration::from_secs(60));
        backend.down.store(true, Ordering::SeqCst);

        assert!(handle.search(&[1.0], 5, None).is_empty());
        assert!(!handle.available());

        // Back up, but the retry interval has not elapsed.
        backend.down.store(false, Ordering::SeqCst);
        assert!(!handle.maybe_reconnect());
        assert!(handle.search(&[1.0], 5, None).is_empty());
    }

    #[test]
    fn test_reconnects_after_interval() {
        let backend = FlakyIndex::new(true);
        let handle = VectorIndexHandle::from_index(backend.clone(), Duration::ZERO);
        assert!(!handle.available());

        backend.down.store(false, Ordering::SeqCst);
        assert!(handle.maybe_reconnect());
        assert!(handle.available());
        assert_eq!(handle.search(&[1.0], 5, None).len(), 1);
    }

    #[test]
    fn test_disabled_never_connects() {
        let handle = VectorIndexHandle::disabled();
        assert!(!handle.available());
        assert!(!handle.maybe_reconnect());
        assert!(handle.backend_name().is_none());
    }

    #[test]
    fn test_bad_vectors_do_not_degrade() {
        let backend = FlakyIndex::new(false);
        let handle = VectorIndexHandle::from_index(backend.clone(), Duration::from_secs(60));

        assert!(!handle.upsert(&payload(), &[1.0, 2.0]));
        assert!(handle.search(&[f32::NAN], 5, None).is_empty());
        assert!(handle.available());

        assert!(handle.upsert(&payload(), &[1.0]));
        assert_eq!(handle.search(&[1.0], 5, None).len(), 1);
        assert_eq!(backend.upserts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reconnect_does_not_block_readers() {
        let backend = FlakyIndex::new(true);
        let slow = Arc::clone(&backend);
        let handle = Arc::new(VectorIndexHandle::connect(
            Box::new(move || {
                std::thread::sleep(Duration::from_millis(500));
                slow.check()?;
                Ok(Arc::clone(&slow) as Arc<dyn VectorIndex>)
            }),
            Duration::ZERO,
        ));
        assert!(!handle.available());
        backend.down.store(false, Ordering::SeqCst);

        let reconnecting = {
            let handle = Arc::clone(&handle);
            std::thread::spawn(move || handle.maybe_reconnect())
        };
        std::thread::sleep(Duration::from_millis(100));

        let started = Instant::now();
        assert!(!handle.available());
        assert!(handle.search(&[1.0], 5, None).is_empty());
        assert!(handle.backend_name().is_none());
        assert!(started.elapsed() < Duration::from_millis(200));

        assert!(reconnecting.join().unwrap());
        assert!(handle.available());
    }

    #[test]
    fn test_reconnect_skipped_while_attempt_recent() {
        let backend = FlakyIndex::new(true);
        let handle = VectorIndexHandle::from_index(backend.clone(), Duration::from_secs(60));
        backend.down.store(false, Ordering::SeqCst);

        // The attempt at construction counts; nothing runs until the interval passes.
        let started = Instant::now();
        assert!(!handle.maybe_reconnect());
        assert!(!handle.available());
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
