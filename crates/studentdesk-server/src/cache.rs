//! Cache for the student list that backs the index and dashboard views.
//!
//! One slot, keyed by [`STUDENTS_KEY`], holds the full list. Writers call
//! [`StudentCache::invalidate`]; readers go through
//! [`StudentCache::get_or_load`].
//!
//! A generation counter is bumped on every invalidation. A loader records the
//! generation before reading the store and only keeps its result cached if no
//! invalidation happened in the meantime, so a slow read that started before
//! a write can never resurrect the pre-write list.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use studentdesk_storage::Student;
use tracing::debug;

use crate::config::CacheConfig;

/// Key of the cached student list.
pub const STUDENTS_KEY: &str = "students:all";

pub type StudentList = Arc<Vec<Student>>;

#[derive(Clone)]
pub struct StudentCache {
    entries: Cache<String, StudentList>,
    generation: Arc<AtomicU64>,
}

impl StudentCache {
    pub fn new(time_to_live: Duration, time_to_idle: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(16)
            .time_to_live(time_to_live)
            .time_to_idle(time_to_idle)
            .build();
        Self {
            entries,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.time_to_live, config.time_to_idle)
    }

    /// Returns the cached list, or runs `load` and caches its result.
    ///
    /// Errors from `load` are returned as-is and nothing is cached.
    pub async fn get_or_load<F, Fut, E>(&self, load: F) -> Result<StudentList, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Student>, E>>,
    {
        if let Some(hit) = self.entries.get(STUDENTS_KEY).await {
            debug!(key = STUDENTS_KEY, "cache hit");
            return Ok(hit);
        }

        let generation = self.generation.load(Ordering::Acquire);
        let students = Arc::new(load().await?);

        if self.generation.load(Ordering::Acquire) == generation {
            self.entries
                .insert(STUDENTS_KEY.to_string(), students.clone())
                .await;
            // An invalidation may have landed between the check and the insert.
            if self.generation.load(Ordering::Acquire) != generation {
                self.entries.invalidate(STUDENTS_KEY).await;
            } else {
                debug!(key = STUDENTS_KEY, count = students.len(), "cache populated");
            }
        } else {
            debug!(key = STUDENTS_KEY, "discarding list loaded before invalidation");
        }

        Ok(students)
    }

    /// Drops the cached list.
    pub async fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.invalidate(STUDENTS_KEY).await;
        debug!(key = STUDENTS_KEY, "cache invalidated");
    }

    /// Whether a list is currently cached. Does not touch idle time.
    #[cfg(test)]
    fn is_cached(&self) -> bool {
        self.entries.contains_key(STUDENTS_KEY)
    }
}
