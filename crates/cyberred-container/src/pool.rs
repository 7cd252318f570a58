//! Fixed-size pool of isolated sandboxes, acquired ahead of time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tracing::warn;

use crate::error::ContainerError;
use crate::runtime::ContainerRuntime;

pub struct ContainerPool {
    total: usize,
    in_use: Arc<AtomicUsize>,
    semaphore: Arc<Semaphore>,
    idle_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Box<dyn ContainerRuntime>>>,
    return_tx: mpsc::UnboundedSender<Box<dyn ContainerRuntime>>,
}

pub struct Lease {
    sandbox: Option<Box<dyn ContainerRuntime>>,
    return_tx: mpsc::UnboundedSender<Box<dyn ContainerRuntime>>,
    in_use: Arc<AtomicUsize>,
    permit: Option<tokio::sync::OwnedSemaphorePermit>,
}

impl ContainerPool {
    pub fn new(sandboxes: Vec<Box<dyn ContainerRuntime>>) -> Self {
        let total = sandboxes.len();
        let (return_tx, idle_rx) = mpsc::unbounded_channel();
        for sandbox in sandboxes {
            return_tx
                .send(sandbox)
                .expect("receiver held by the pool itself, cannot be closed here");
        }
        Self {
            total,
            in_use: Arc::new(AtomicUsize::new(0)),
            semaphore: Arc::new(Semaphore::new(total)),
            idle_rx: tokio::sync::Mutex::new(idle_rx),
            return_tx,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn in_use_count(&self) -> usize {
        self.in_use.load(Ordering::SeqCst)
    }

    pub fn available_count(&self) -> usize {
        self.total - self.in_use_count()
    }

    pub fn pressure(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.in_use_count() as f64 / self.total as f64
    }

    /// Acquire a sandbox, waiting up to `timeout` for one to free up.
    pub async fn acquire(&self, timeout: Duration) -> Result<Lease, ContainerError> {
        let permit = tokio::time::timeout(timeout, self.semaphore.clone().acquire_owned())
            .await
            .map_err(|_| ContainerError::PoolExhausted)?
            .expect("semaphore is never closed while the pool is alive");

        let mut idle_rx = self.idle_rx.lock().await;
        let sandbox = idle_rx.try_recv().map_err(|_| ContainerError::PoolExhausted)?;
        drop(idle_rx);

        self.in_use.fetch_add(1, Ordering::SeqCst);
        Ok(Lease {
            sandbox: Some(sandbox),
            return_tx: self.return_tx.clone(),
            in_use: self.in_use.clone(),
            permit: Some(permit),
        })
    }
}

impl Lease {
    pub fn runtime(&self) -> &dyn ContainerRuntime {
        self.sandbox.as_deref().expect("lease always holds a sandbox until dropped")
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some(sandbox) = self.sandbox.take() {
            self.in_use.fetch_sub(1, Ordering::SeqCst);
            if self.return_tx.send(sandbox).is_err() {
                warn!("container pool shut down before lease could return its sandbox");
            }
        }
        // Dropping `permit` releases the semaphore slot.
        self.permit.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;

    #[tokio::test]
    async fn acquire_and_release_tracks_pressure() {
        let pool = ContainerPool::new(vec![Box::new(MockRuntime::new()), Box::new(MockRuntime::new())]);
        assert_eq!(pool.available_count(), 2);

        let lease = pool.acquire(Duration::from_millis(100)).await.unwrap();
        assert_eq!(pool.in_use_count(), 1);
        assert_eq!(pool.pressure(), 0.5);

        drop(lease);
        tokio::task::yield_now().await;
        assert_eq!(pool.in_use_count(), 0);
    }

    #[tokio::test]
    async fn acquire_times_out_when_exhausted() {
        let pool = ContainerPool::new(vec![Box::new(MockRuntime::new())]);
        let _lease = pool.acquire(Duration::from_millis(50)).await.unwrap();
        let second = pool.acquire(Duration::from_millis(50)).await;
        assert!(matches!(second, Err(ContainerError::PoolExhausted)));
    }
}
