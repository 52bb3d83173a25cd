//! Bounded fan-out / fan-in worker pool
//!
//! `WorkerPool::run` pushes every task onto a bounded queue, lets a fixed number
//! of workers pull from it concurrently, and funnels the values they emit into
//! one collector. The results channel is closed by an explicit join barrier
//! once all workers have returned. If the deadline fires first the workers are
//! aborted and whatever was already collected is handed back.

use std::future::Future;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::Deadline;

/// Outcome of one pool run.
#[derive(Debug)]
pub struct PoolReport<R> {
    /// Values emitted by workers, in no particular order
    pub results: Vec<R>,
    /// False when the deadline cut the run short
    pub finished: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub async fn run<T, R, F, Fut>(
        &self,
        tasks: Vec<T>,
        deadline: Deadline,
        handler: F,
    ) -> PoolReport<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<R>> + Send + 'static,
    {
        if tasks.is_empty() {
            return PoolReport {
                results: Vec::new(),
                finished: true,
            };
        }

        let capacity = tasks.len();
        let queue = fill_queue(tasks);
        let (result_tx, mut result_rx) = mpsc::channel::<R>(capacity);
        let handler = Arc::new(handler);

        let mut workers = JoinSet::new();
        for worker_id in 0..self.size.min(capacity) {
            let queue = queue.clone();
            let tx = result_tx.clone();
            let handler = Arc::clone(&handler);
            workers.spawn(async move {
                let mut handled = 0usize;
                // 队列在 worker 启动前已填满并关闭，try_recv 不会阻塞
                while let Ok(task) = queue.try_recv() {
                    handled += 1;
                    if let Some(result) = (*handler)(task).await
                        && tx.send(result).await.is_err()
                    {
                        break;
                    }
                }
                debug!("Worker {} drained queue after {} tasks", worker_id, handled);
            });
        }
        drop(queue);

        // 等待所有 worker 结束后才关闭结果通道
        let barrier = tokio::spawn(async move {
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined
                    && e.is_panic()
                {
                    warn!("Worker panicked: {}", e);
                }
            }
            drop(result_tx);
        });

        let mut results = Vec::with_capacity(capacity);
        let finished = loop {
            tokio::select! {
                biased;
                received = result_rx.recv() => match received {
                    Some(result) => results.push(result),
                    None => break true,
                },
                _ = tokio::time::sleep_until(deadline.instant()) => break false,
            }
        };

        if !finished {
            // Aborting the barrier drops its JoinSet, which aborts every worker.
            barrier.abort();
            result_rx.close();
            while let Ok(result) = result_rx.try_recv() {
                results.push(result);
            }
            warn!(
                "Worker pool deadline elapsed; keeping {} results collected so far",
                results.len()
            );
        }

        PoolReport { results, finished }
    }
}

fn fill_queue<T>(tasks: Vec<T>) -> Receiver<T> {
    let (tx, rx) = crossbeam_channel::bounded(tasks.len());
    for task in tasks {
        // capacity == task count, never blocks
        let _ = tx.send(task);
    }
    rx
}
