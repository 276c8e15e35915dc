//! In-memory registries for launches in flight and test cases currently running.
//!
//! Both are guarded by a `tokio::sync::RwLock`: reads take a shared lock, mutations
//! take an exclusive one. Neither persists across restarts (see Non-goals).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::driver::CancelHandle;
use crate::model::Launch;

/// Index of launches currently in flight, keyed by launch id.
#[derive(Default)]
pub struct LaunchRegistry {
    launches: RwLock<HashMap<String, Launch>>,
}

impl LaunchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `launch` iff no entry exists for its id. Returns `true` if an entry
    /// was already present (and therefore nothing was inserted) — this is the
    /// dedup gate ingress uses to reject a duplicate launch id with a 400.
    pub async fn put_if_absent(&self, launch: Launch) -> bool {
        let mut launches = self.launches.write().await;
        if launches.contains_key(&launch.id) {
            true
        } else {
            launches.insert(launch.id.clone(), launch);
            false
        }
    }

    pub async fn get(&self, id: &str) -> Option<Launch> {
        self.launches.read().await.get(id).cloned()
    }

    pub async fn delete(&self, id: &str) {
        self.launches.write().await.remove(id);
    }

    pub async fn len(&self) -> usize {
        self.launches.read().await.len()
    }
}

/// A currently-running test case: a cancel handle plus the terminate signal used
/// by the terminate API and by shutdown drain.
///
/// `terminated` is a [`tokio_util::sync::CancellationToken`] rather than a raw
/// channel close: cancelling it twice is a documented no-op, which is exactly the
/// "closing terminated is one-shot" guarantee the terminate protocol requires.
pub struct RunningTestCase {
    pub cancel: Arc<dyn CancelHandle>,
    pub terminated: tokio_util::sync::CancellationToken,
}

/// Index of currently-running test cases, keyed by case id.
#[derive(Default)]
pub struct TestCaseRegistry {
    cases: RwLock<HashMap<String, Arc<RunningTestCase>>>,
}

impl TestCaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if a case with this id is already registered — callers must check
    /// this (via [`Self::get`]) before registering a newly-started case, per the
    /// "one running test case per id" invariant.
    pub async fn get(&self, id: &str) -> Option<Arc<RunningTestCase>> {
        self.cases.read().await.get(id).cloned()
    }

    /// Registers `case` under `id`, overwriting any existing entry. Callers are
    /// responsible for having already checked [`Self::get`].
    pub async fn put(&self, id: impl Into<String>, case: Arc<RunningTestCase>) {
        self.cases.write().await.insert(id.into(), case);
    }

    pub async fn delete(&self, id: &str) {
        self.cases.write().await.remove(id);
    }

    /// Takes a read-level snapshot and invokes `f` on every running case. `f` must
    /// not attempt to mutate the registry — the shared lock is held for the whole
    /// traversal.
    pub async fn for_each(&self, mut f: impl FnMut(&str, &Arc<RunningTestCase>)) {
        let cases = self.cases.read().await;
        for (id, case) in cases.iter() {
            f(id, case);
        }
    }

    pub async fn len(&self) -> usize {
        self.cases.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Artifact, TestCase};
    use async_trait::async_trait;

    fn launch(id: &str) -> Launch {
        Launch {
            id: id.to_string(),
            launch_type: "maven".into(),
            test_cases: vec![TestCase {
                id: "T1".into(),
                name: "n".into(),
                artifact: Artifact {
                    group_id: "g".into(),
                    id: "a".into(),
                    version: "1".into(),
                },
                tags: vec![],
            }],
            properties: vec![],
        }
    }

    #[tokio::test]
    async fn put_if_absent_rejects_duplicate_id() {
        let registry = LaunchRegistry::new();
        assert!(!registry.put_if_absent(launch("L1")).await);
        assert!(registry.put_if_absent(launch("L1")).await);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let registry = LaunchRegistry::new();
        registry.put_if_absent(launch("L1")).await;
        registry.delete("L1").await;
        assert!(registry.get("L1").await.is_none());
    }

    struct NoopCancel;
    #[async_trait]
    impl CancelHandle for NoopCancel {
        async fn cancel(&self) {}
    }

    #[tokio::test]
    async fn test_case_registry_put_get_delete() {
        let registry = TestCaseRegistry::new();
        let case = Arc::new(RunningTestCase {
            cancel: Arc::new(NoopCancel),
            terminated: tokio_util::sync::CancellationToken::new(),
        });
        assert!(registry.get("T1").await.is_none());
        registry.put("T1", case).await;
        assert!(registry.get("T1").await.is_some());
        registry.delete("T1").await;
        assert!(registry.get("T1").await.is_none());
    }
}
