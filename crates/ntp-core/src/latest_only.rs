//! Per-user serializer with supersession.
//!
//! For each user, only one `fn` invocation runs at a time. While it runs,
//! further `run` calls overwrite a single stored "latest" context; when the
//! active call finishes, if a newer context was stored, `fn` runs again with
//! it. Every waiter from a given burst resolves with the result of whichever
//! invocation completes next — no waiter is ever orphaned, and intermediate
//! contexts between the running one and the latest are dropped.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::types::CursorContext;

struct UserSlot {
    /// The most recently submitted context not yet picked up by the runner,
    /// every waiter that wants the result of the next completed cycle, and
    /// whether a runner is currently active for this user.
    pending: Mutex<PendingState>,
}

#[derive(Default)]
struct PendingState {
    latest: Option<CursorContext>,
    waiters: Vec<oneshot::Sender<String>>,
    /// Whether some task is currently driving the dispatch loop. Set and
    /// cleared under the same lock newcomers use to register a waiter, so
    /// "is a runner active" and "did I just register a waiter" are decided
    /// atomically — a newcomer can never see `running = true` right before
    /// the runner exits without the runner also seeing its context.
    running: bool,
}

impl UserSlot {
    fn new() -> Self {
        Self {
            pending: Mutex::new(PendingState::default()),
        }
    }
}

/// Per-user registry of [`UserSlot`]s. Slots are created lazily on first
/// request and persist for the process lifetime.
#[derive(Default)]
pub struct LatestOnly {
    slots: Mutex<HashMap<String, Arc<UserSlot>>>,
}

impl LatestOnly {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_for(&self, user: &str) -> Arc<UserSlot> {
        let mut slots = self.slots.lock().unwrap();
        slots
            .entry(user.to_string())
            .or_insert_with(|| Arc::new(UserSlot::new()))
            .clone()
    }

    /// Submit `ctx` for `user`. If another call for this user is currently
    /// running, this waits for whichever cycle completes next instead of
    /// starting its own. If the caller's future is dropped (client
    /// disconnect), the dispatch loop continues undisturbed for the benefit
    /// of remaining waiters.
    pub async fn run<F, Fut>(&self, user: &str, ctx: CursorContext, f: F) -> String
    where
        F: Fn(CursorContext) -> Fut,
        Fut: Future<Output = String>,
    {
        let slot = self.slot_for(user);

        let (tx, rx) = oneshot::channel();
        let became_runner = {
            let mut pending = slot.pending.lock().unwrap();
            pending.latest = Some(ctx);
            pending.waiters.push(tx);
            if pending.running {
                false
            } else {
                pending.running = true;
                true
            }
        };

        if became_runner {
            loop {
                let next = {
                    let mut pending = slot.pending.lock().unwrap();
                    match pending.latest.take() {
                        Some(ctx) => Some(ctx),
                        None => {
                            pending.running = false;
                            None
                        }
                    }
                };
                let Some(next_ctx) = next else { break };

                let result = f(next_ctx).await;

                let waiters = {
                    let mut pending = slot.pending.lock().unwrap();
                    std::mem::take(&mut pending.waiters)
                };
                for waiter in waiters {
                    let _ = waiter.send(result.clone());
                }
            }
            // Our own waiter was registered before we decided to become the
            // runner, so it is resolved by the first drain above regardless
            // of whether our context was the one actually dispatched.
        }

        rx.await.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn single_call_returns_its_own_result() {
        let lo = LatestOnly::new();
        let result = lo
            .run("u", CursorContext::new("abc", ""), |ctx| async move {
                ctx.prefix
            })
            .await;
        assert_eq!(result, "abc");
    }

    #[tokio::test]
    async fn at_most_one_fn_runs_concurrently_per_user() {
        let lo = Arc::new(LatestOnly::new());
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_concurrent = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..5 {
            let lo = lo.clone();
            let concurrent = concurrent.clone();
            let max_concurrent = max_concurrent.clone();
            handles.push(tokio::spawn(async move {
                lo.run("u", CursorContext::new(format!("ctx{i}"), ""), move |ctx| {
                    let concurrent = concurrent.clone();
                    let max_concurrent = max_concurrent.clone();
                    async move {
                        let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                        max_concurrent.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        concurrent.fetch_sub(1, Ordering::SeqCst);
                        ctx.prefix
                    }
                })
                .await
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(max_concurrent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn final_invocation_uses_most_recent_context() {
        let lo = Arc::new(LatestOnly::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for p in ["a", "ab", "abc", "abcd", "abcde"] {
            let lo = lo.clone();
            let seen = seen.clone();
            handles.push(tokio::spawn(async move {
                lo.run("u", CursorContext::new(p, ""), move |ctx| {
                    let seen = seen.clone();
                    async move {
                        seen.lock().unwrap().push(ctx.prefix.clone());
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        ctx.prefix
                    }
                })
                .await
            }));
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let mut results = Vec::new();
        for h in handles {
            results.push(h.await.unwrap());
        }
        // Every waiter resolves with a completed cycle's result, and the
        // final dispatched cycle must carry the newest submitted context.
        assert!(results.iter().all(|r| !r.is_empty()));
        assert_eq!(seen.lock().unwrap().last().unwrap(), "abcde");
        // At most two invocations: the leader's own context, then the
        // latest one superseding everything queued behind it.
        assert!(seen.lock().unwrap().len() <= 2);
    }
}
