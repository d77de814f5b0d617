//! Background loops.

pub mod cache_prune_loop;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Signal shutdown and wait for each loop. Returns how many ended abnormally.
pub async fn shutdown_loops(shutdown: &broadcast::Sender<()>, loops: Vec<(&'static str, JoinHandle<()>)>) -> usize {
    if shutdown.send(()).is_err() {
        tracing::debug!("No loop was listening for shutdown");
    }

    let mut failed = 0;
    for (name, handle) in loops {
        match handle.await {
            Ok(()) => tracing::debug!("{} stopped", name),
            Err(err) => {
                failed += 1;
                tracing::error!("{} ended abnormally: {}", name, err);
            }
        }
    }
    failed
}
