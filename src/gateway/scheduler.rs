//! One-shot reminder scheduler.
//!
//! Each identity has at most one pending job: a sleeping task that posts a
//! `ReminderDue` onto the gateway queue when it wakes. Rescheduling aborts
//! the previous task; a generation number guards against a task that already
//! woke up before it could be aborted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Everything needed to render a reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderDue {
    pub identity: i64,
    pub chat_id: i64,
    pub username: String,
    pub goal_text: String,
}

struct PendingJob {
    generation: u64,
    fire_at: Instant,
    handle: JoinHandle<()>,
}

/// Cheap to clone; clones share the same job table.
#[derive(Clone)]
pub struct ReminderScheduler {
    jobs: Arc<Mutex<HashMap<i64, PendingJob>>>,
    next_generation: Arc<AtomicU64>,
    tx: mpsc::Sender<ReminderDue>,
}

impl ReminderScheduler {
    /// Create a scheduler and the queue its reminders are delivered on.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ReminderDue>) {
        let (tx, rx) = mpsc::channel(capacity);
        let scheduler = Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            next_generation: Arc::new(AtomicU64::new(0)),
            tx,
        };
        (scheduler, rx)
    }

    /// Fire `job` after `delay`, replacing any pending job for the same identity.
    pub async fn schedule(&self, job: ReminderDue, delay: Duration) {
        let identity = job.identity;
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let fire_at = Instant::now() + delay;

        // Hold the table lock until the new job is installed, so the task
        // cannot observe the table before its own entry exists.
        let mut jobs = self.jobs.lock().await;

        let table = self.jobs.clone();
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(fire_at).await;

            {
                let mut jobs = table.lock().await;
                match jobs.get(&identity) {
                    Some(current) if current.generation == generation => {
                        jobs.remove(&identity);
                    }
                    _ => {
                        debug!("reminder for {identity} superseded, not firing");
                        return;
                    }
                }
            }

            if tx.send(job).await.is_err() {
                warn!("reminder queue closed, dropping reminder for {identity}");
            }
        });

        let replaced = jobs.insert(
            identity,
            PendingJob {
                generation,
                fire_at,
                handle,
            },
        );
        if let Some(old) = replaced {
            old.handle.abort();
            info!("replaced pending reminder for {identity}");
        }
        info!("scheduled reminder for {identity} in {}s", delay.as_secs());
    }

    /// Drop the pending job for `identity`. Returns whether one existed.
    pub async fn cancel(&self, identity: i64) -> bool {
        match self.jobs.lock().await.remove(&identity) {
            Some(job) => {
                job.handle.abort();
                info!("cancelled pending reminder for {identity}");
                true
            }
            None => false,
        }
    }

    /// Time left until the pending job for `identity` fires.
    pub async fn time_until(&self, identity: i64) -> Option<Duration> {
        self.jobs
            .lock()
            .await
            .get(&identity)
            .map(|job| job.fire_at.saturating_duration_since(Instant::now()))
    }

    /// Number of pending jobs.
    pub async fn pending(&self) -> usize {
        self.jobs.lock().await.len()
    }

    /// Abort every pending job.
    pub async fn shutdown(&self) {
        let mut jobs = self.jobs.lock().await;
        for (_, job) in jobs.drain() {
            job.handle.abort();
        }
    }
}
