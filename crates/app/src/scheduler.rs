use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use log::{debug, error};
use tokio::{sync::oneshot, task::JoinHandle};

/// Debounced execution of saves. Scheduling replaces a save that has not started yet, so
/// only the latest state is written after a quiet period.
///
/// Must be used within a Tokio runtime.
#[derive(Debug, Default)]
pub struct SaveScheduler {
    pending: Option<Pending>,
}

#[derive(Debug)]
struct Pending {
    handle: JoinHandle<()>,
    started: Arc<AtomicBool>,
    trigger: oneshot::Sender<()>,
}

impl SaveScheduler {
    pub fn schedule<F>(&mut self, delay: Duration, save: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        let started = Arc::new(AtomicBool::new(false));
        let (trigger, triggered) = oneshot::channel::<()>();
        let handle = tokio::spawn({
            let started = started.clone();
            async move {
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    _ = triggered => {}
                }
                started.store(true, Ordering::SeqCst);
                save.await;
            }
        });

        self.pending = Some(Pending {
            handle,
            started,
            trigger,
        });
    }

    /// Drops a save that has not started yet. A save already in progress completes.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            if !pending.started.load(Ordering::SeqCst) {
                pending.handle.abort();
                debug!("cancelled pending save");
            }
        }
    }

    /// Runs a pending save immediately and waits for it to complete.
    pub async fn flush(&mut self) {
        if let Some(pending) = self.pending.take() {
            let _ = pending.trigger.send(());
            if let Err(err) = pending.handle.await {
                if !err.is_cancelled() {
                    error!("pending save failed: {err}");
                }
            }
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| !p.started.load(Ordering::SeqCst))
    }
}

impl Drop for SaveScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
