//! Completion callbacks for the dual synchronous/asynchronous contract.

use crate::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::trace;

/// Outcome notification for a single exchange.
///
/// `done_sync` is `true` when the exchange completed on the thread that
/// submitted it and `false` when it completed later from another thread.
/// Implementations are shared as `Arc<dyn Completion>`, but for a given
/// exchange `done` is delivered exactly once.
pub trait Completion: Send + Sync {
    fn done(&self, done_sync: bool);
}

/// Completion that ignores the notification.
pub struct NoopCompletion;

impl Completion for NoopCompletion {
    fn done(&self, _done_sync: bool) {}
}

/// Exactly-once guard around another completion.
///
/// The first `done` wins; later calls are dropped. A wrapping pipeline
/// element arms this around the original caller's completion so the caller
/// is notified once even when the synchronous bookkeeping path and the
/// handler's own callback both report completion.
pub struct OnceCompletion {
    inner: Arc<dyn Completion>,
    fired: AtomicBool,
}

impl OnceCompletion {
    pub fn new(inner: Arc<dyn Completion>) -> Self {
        Self {
            inner,
            fired: AtomicBool::new(false),
        }
    }

    /// Whether the wrapped completion has already been invoked.
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Completion for OnceCompletion {
    fn done(&self, done_sync: bool) {
        if self
            .fired
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.inner.done(done_sync);
        } else {
            trace!(done_sync, "duplicate completion suppressed");
        }
    }
}

/// Completion that can be awaited from async code.
///
/// The pipeline side receives the `Arc<dyn Completion>`; the submitting side
/// awaits the paired [`CompletionHandle`] for the `done_sync` flag.
pub struct AwaitableCompletion {
    tx: Mutex<Option<oneshot::Sender<bool>>>,
}

impl AwaitableCompletion {
    pub fn new() -> (Arc<Self>, CompletionHandle) {
        let (tx, rx) = oneshot::channel();
        (
            Arc::new(Self {
                tx: Mutex::new(Some(tx)),
            }),
            CompletionHandle { rx },
        )
    }
}

impl Completion for AwaitableCompletion {
    fn done(&self, done_sync: bool) {
        if let Some(tx) = self.tx.lock().unwrap().take() {
            // The handle may already be gone; nothing to deliver then.
            let _ = tx.send(done_sync);
        }
    }
}

/// Awaits the outcome of an [`AwaitableCompletion`].
pub struct CompletionHandle {
    rx: oneshot::Receiver<bool>,
}

impl CompletionHandle {
    /// Wait for the completion and return its `done_sync` flag.
    pub async fn wait(self) -> crate::Result<bool> {
        self.rx
            .await
            .map_err(|_| Error::internal("completion dropped without being invoked"))
    }
}
