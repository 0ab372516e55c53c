use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::collaborators::LessonInfo;
use crate::metrics::Metrics;

/// Shared runtime state for the engine: per-learner write locks serializing
/// read-modify-write commits, a bounded cache of catalog lesson lookups, and
/// the metrics handle. Persistent state lives in the stores, not here.
pub struct EngineState {
    learner_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    lesson_cache: Mutex<LruCache<String, LessonInfo>>,
    pub metrics: Metrics,
}

impl EngineState {
    pub fn new(lesson_cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(lesson_cache_size.max(1)).expect("capacity >= 1");
        EngineState {
            learner_locks: Mutex::new(HashMap::new()),
            lesson_cache: Mutex::new(LruCache::new(capacity)),
            metrics: Metrics::new(),
        }
    }

    /// The write lock for one learner. All persistent mutations for a
    /// learner are performed while holding this lock, which makes each
    /// operation atomic with respect to concurrent callers (multiple
    /// devices submitting near-simultaneously).
    pub fn learner_lock(&self, learner_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.learner_locks.lock();
        locks
            .entry(learner_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    pub fn cached_lesson(&self, lesson_id: &str) -> Option<LessonInfo> {
        self.lesson_cache.lock().get(lesson_id).cloned()
    }

    pub fn cache_lesson(&self, lesson: LessonInfo) {
        self.lesson_cache
            .lock()
            .put(lesson.lesson_id.clone(), lesson);
    }
}
