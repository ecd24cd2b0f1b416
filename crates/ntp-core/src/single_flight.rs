//! Concurrent dedupe by key.
//!
//! The first caller for a key runs the factory; every other caller arriving
//! before resolution clones the same `Shared` future and gets the identical
//! result, success or failure. The entry is removed as soon as it resolves,
//! so the next call for the same key starts fresh.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use futures::future::{FutureExt, Shared};

use crate::error::{PipelineError, Result};

type SharedResult = Shared<std::pin::Pin<Box<dyn Future<Output = Result<String>> + Send>>>;

#[derive(Default)]
pub struct SingleFlight {
    inflight: Mutex<HashMap<String, SharedResult>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `factory` for `key`, or join an already-running call for the same
    /// key. Only the leader invokes `factory`; it is never retried here.
    pub async fn run<F, Fut>(&self, key: &str, factory: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        let existing = {
            let inflight = self.inflight.lock().unwrap();
            inflight.get(key).cloned()
        };

        if let Some(shared) = existing {
            tracing::debug!(key, "single-flight join");
            return shared.await;
        }

        let boxed: std::pin::Pin<Box<dyn Future<Output = Result<String>> + Send>> =
            Box::pin(factory());
        let shared: SharedResult = boxed.shared();

        {
            let mut inflight = self.inflight.lock().unwrap();
            inflight.insert(key.to_string(), shared.clone());
        }
        tracing::debug!(key, "single-flight leader");

        let result = shared.await;
        self.inflight.lock().unwrap().remove(key);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn collapses_concurrent_identical_calls() {
        let sf = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let sf = sf.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                sf.run("k", move || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok("value".to_string())
                    }
                })
                .await
            }));
        }

        let mut results = Vec::new();
        for h in handles {
            results.push(h.await.unwrap().unwrap());
        }
        assert!(results.iter().all(|r| r == "value"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn starts_fresh_after_resolution() {
        let sf = SingleFlight::new();
        sf.run("k", || async { Ok("first".to_string()) })
            .await
            .unwrap();
        let second = sf.run("k", || async { Ok("second".to_string()) }).await;
        assert_eq!(second.unwrap(), "second");
    }

    #[tokio::test]
    async fn propagates_errors_to_every_waiter() {
        let sf = Arc::new(SingleFlight::new());
        let mut handles = Vec::new();
        for _ in 0..3 {
            let sf = sf.clone();
            handles.push(tokio::spawn(async move {
                sf.run("k", || async {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Err(PipelineError::Upstream("boom".to_string()))
                })
                .await
            }));
        }
        for h in handles {
            let result = h.await.unwrap();
            assert!(matches!(result, Err(PipelineError::Upstream(_))));
        }
    }
}
