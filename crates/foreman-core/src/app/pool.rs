use std::future::Future;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::worker_loop::{WorkerDeps, WorkerLoop, WorkerSettings};

/// Worker pool handle.
/// - 各ワーカーは独立した tokio タスクで、互いに調整しない
/// - `shutdown_and_join()` で全ワーカーの終了を待てる
pub struct WorkerPool {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `n` workers sharing the same collaborators.
    pub fn spawn(n: usize, deps: WorkerDeps, settings: WorkerSettings) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let worker = WorkerLoop::new(worker_id, deps.clone(), settings.clone());
            let rx = shutdown_rx.clone();

            joins.push(spawn_worker(worker_id, async move { worker.run(rx).await }));
        }

        tracing::info!(workers = n, "worker pool started");
        Self { shutdown_tx, joins }
    }

    /// Spawn `n` workers that loop until process termination. Never returns
    /// unless every worker task panics.
    pub async fn run(n: usize, deps: WorkerDeps, settings: WorkerSettings) {
        let joins: Vec<_> = (0..n)
            .map(|worker_id| {
                let worker = WorkerLoop::new(worker_id, deps.clone(), settings.clone());
                spawn_worker(worker_id, async move { worker.run_forever().await })
            })
            .collect();

        tracing::info!(workers = n, "worker pool running");
        for j in joins {
            if let Err(e) = j.await {
                tracing::error!(error = %e, "worker task panicked");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Ask every worker to stop at its next Idle state.
    /// In-flight tasks are not cancelled.
    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        self.join().await;
    }

    /// Wait for all workers without requesting shutdown.
    pub async fn join(self) {
        for j in self.joins {
            if let Err(e) = j.await {
                tracing::error!(error = %e, "worker task panicked");
            }
        }
    }
}

fn spawn_worker<F>(worker_id: usize, fut: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(fut.instrument(tracing::info_span!("worker", worker_id)))
}
