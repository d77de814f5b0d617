//! Background change detection while a polyline is being edited.
//!
//! One poller task exists per session at most. It wakes on the surface's
//! change notifications when available, otherwise on a fixed interval, and
//! asks the controller to checkpoint if the vertices changed.

use crate::edit_history::{DrawingSurface, EditHistoryController, EditNotice, EditState};
use crate::models::GeoPoint;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

/// Polling cadence when the surface has no change notifications.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub type SharedController<S> = Arc<Mutex<EditHistoryController<S>>>;

struct Poller {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

pub struct EditSession<S> {
    controller: SharedController<S>,
    poll_interval: Duration,
    poller: Option<Poller>,
}

fn lock<S>(controller: &Mutex<EditHistoryController<S>>) -> MutexGuard<'_, EditHistoryController<S>> {
    controller.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<S> EditSession<S>
where
    S: DrawingSurface + Send + 'static,
{
    pub fn new(controller: EditHistoryController<S>) -> Self {
        Self::with_interval(controller, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_interval(controller: EditHistoryController<S>, poll_interval: Duration) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
            poll_interval,
            poller: None,
        }
    }

    pub fn controller(&self) -> SharedController<S> {
        self.controller.clone()
    }

    /// Run `f` with the controller locked. Do not hold across an await.
    ///
    /// Transitions that end editing should go through the session methods
    /// below, which stop the poller first. A poller that finds the controller
    /// out of edit mode exits on its next wake.
    pub fn with_controller<R>(&self, f: impl FnOnce(&mut EditHistoryController<S>) -> R) -> R {
        f(&mut lock(&self.controller))
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(|p| !p.handle.is_finished())
    }

    /// Enter edit mode and start change detection. Any previous poller is
    /// stopped before the new one starts.
    pub async fn start_edit(&mut self) -> Result<(), EditNotice> {
        self.cancel_poller().await;

        let changes = {
            let mut controller = lock(&self.controller);
            controller.start_edit()?;
            controller.surface().change_notifications()
        };

        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(run_poller(self.controller.clone(), rx, self.poll_interval, changes));
        self.poller = Some(Poller {
            shutdown: Some(tx),
            handle,
        });
        tracing::debug!("edit poller started");
        Ok(())
    }

    /// Stop change detection, then take one last checkpoint.
    pub async fn stop_edit(&mut self) -> bool {
        self.cancel_poller().await;
        lock(&self.controller).stop_edit()
    }

    pub async fn draw(&mut self, vertices: Vec<GeoPoint>) -> Result<(), EditNotice> {
        self.transition(|c| c.draw(vertices)).await
    }

    pub async fn clear(&mut self) -> Result<(), EditNotice> {
        self.transition(EditHistoryController::clear).await
    }

    pub async fn undo(&mut self) -> Result<(), EditNotice> {
        self.transition(EditHistoryController::undo).await
    }

    pub async fn redo(&mut self) -> Result<(), EditNotice> {
        self.transition(EditHistoryController::redo).await
    }

    pub async fn smooth(&mut self) -> Result<(), EditNotice> {
        self.transition(EditHistoryController::smooth).await
    }

    async fn transition<R>(&mut self, f: impl FnOnce(&mut EditHistoryController<S>) -> R) -> R {
        self.cancel_poller().await;
        f(&mut lock(&self.controller))
    }

    async fn cancel_poller(&mut self) {
        let Some(mut poller) = self.poller.take() else {
            return;
        };
        if let Some(tx) = poller.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(err) = poller.handle.await {
            tracing::warn!("edit poller ended abnormally: {}", err);
        }
    }
}

impl<S> Drop for EditSession<S> {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.handle.abort();
        }
    }
}

async fn run_poller<S: DrawingSurface>(
    controller: SharedController<S>,
    mut shutdown: oneshot::Receiver<()>,
    poll_interval: Duration,
    changes: Option<watch::Receiver<u64>>,
) {
    match changes {
        Some(mut changes) => loop {
            tokio::select! {
                _ = &mut shutdown => break,
                changed = changes.changed() => {
                    if changed.is_err() {
                        tracing::debug!("drawing surface dropped its change channel");
                        break;
                    }
                    if !poll_while_editing(&controller) {
                        break;
                    }
                }
            }
        },
        None => {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = ticker.tick() => {
                        if !poll_while_editing(&controller) {
                            break;
                        }
                    }
                }
            }
        }
    }
    tracing::debug!("edit poller stopped");
}

/// One poll; `false` once the controller has left edit mode.
fn poll_while_editing<S: DrawingSurface>(controller: &Mutex<EditHistoryController<S>>) -> bool {
    let mut controller = lock(controller);
    if controller.state() != EditState::Editing {
        tracing::debug!("controller left edit mode");
        return false;
    }
    if controller.poll() {
        tracing::trace!("checkpoint pushed");
    }
    true
}
