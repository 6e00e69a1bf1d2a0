// src/merge/locks.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::JobId;

/// Per-job serialization for merges running in this process.
///
/// Merges touching an overlapping job id wait for each other. Ids are locked in
/// ascending order so two merges over the same pair can't deadlock.
#[derive(Default)]
pub struct MergeLocks {
    inner: Mutex<HashMap<JobId, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of one merge
pub struct PairGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl MergeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, a: JobId, b: JobId) -> PairGuard {
        let mut ids = vec![a, b];
        ids.sort();
        ids.dedup();

        let mutexes: Vec<Arc<AsyncMutex<()>>> = {
            let mut map = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // drop entries nobody holds or waits on
            map.retain(|_, m| Arc::strong_count(m) > 1);
            ids.iter()
                .map(|id| map.entry(*id).or_default().clone())
                .collect()
        };

        let mut guards = Vec::with_capacity(mutexes.len());
        for m in mutexes {
            guards.push(m.lock_owned().await);
        }
        PairGuard { _guards: guards }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
