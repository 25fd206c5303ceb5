//! Named background jobs.
//!
//! Producers enqueue a [`Job`] by name and never wait for it. A single
//! [`JobRunner`] drains the queue and hands each job to the handler
//! registered under its name. Failures are logged, never propagated back.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const JOB_NOTIFY: &str = "notifications.send";
pub const JOB_EXTERNAL_SYNC: &str = "external_sync.push";
pub const JOB_REINDEX_VIDEO: &str = "search.reindex_video";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub payload: serde_json::Value,
    pub enqueued_at: DateTime<Utc>,
}

impl Job {
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload,
            enqueued_at: Utc::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Invalid job payload: {0}")]
    Payload(String),

    #[error("Job failed: {0}")]
    Failed(String),
}

/// A job body, registered on the runner by name.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<(), JobError>;
}

// ---------------------------------------------------------------------------
// JobQueue
// ---------------------------------------------------------------------------

/// Cheap, cloneable producer side of the job channel.
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::UnboundedSender<Job>,
}

impl JobQueue {
    /// Create a queue and the receiver a [`JobRunner`] drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Job>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn enqueue(&self, job: Job) {
        let name = job.name.clone();
        if self.sender.send(job).is_err() {
            tracing::warn!(job = %name, "Job runner is gone, dropping job");
        }
    }
}

// ---------------------------------------------------------------------------
// JobRunner
// ---------------------------------------------------------------------------

pub struct JobRunner {
    receiver: mpsc::UnboundedReceiver<Job>,
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobRunner {
    pub fn new(receiver: mpsc::UnboundedReceiver<Job>) -> Self {
        Self {
            receiver,
            handlers: HashMap::new(),
        }
    }

    pub fn register(mut self, name: impl Into<String>, handler: Arc<dyn JobHandler>) -> Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    /// Run one job to completion on the current task.
    pub async fn dispatch(&self, job: Job) {
        dispatch_job(&self.handlers, job).await;
    }

    /// Drain the queue until cancelled or every producer is dropped.
    ///
    /// Each job runs on its own task so a slow push does not hold up
    /// notifications.
    pub async fn run(mut self, cancel: CancellationToken) {
        let handlers = Arc::new(std::mem::take(&mut self.handlers));
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Job runner cancelled");
                    break;
                }
                job = self.receiver.recv() => {
                    let Some(job) = job else {
                        tracing::info!("Job queue closed, runner shutting down");
                        break;
                    };
                    let handlers = Arc::clone(&handlers);
                    tokio::spawn(async move { dispatch_job(&handlers, job).await });
                }
            }
        }
    }
}

async fn dispatch_job(handlers: &HashMap<String, Arc<dyn JobHandler>>, job: Job) {
    let Some(handler) = handlers.get(&job.name) else {
        tracing::warn!(job = %job.name, "No handler registered for job");
        return;
    };
    if let Err(e) = handler.handle(&job).await {
        tracing::error!(job = %job.name, error = %e, "Background job failed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Counting(AtomicUsize);

    #[async_trait]
    impl JobHandler for Counting {
        async fn handle(&self, job: &Job) -> Result<(), JobError> {
            if job.payload["fail"] == true {
                return Err(JobError::Failed("asked to".into()));
            }
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn jobs_reach_their_handler() {
        let (queue, rx) = JobQueue::channel();
        let counter = Arc::new(Counting(AtomicUsize::new(0)));
        let runner = JobRunner::new(rx).register(JOB_NOTIFY, counter.clone());

        queue.enqueue(Job::new(JOB_NOTIFY, serde_json::json!({})));
        queue.enqueue(Job::new(JOB_NOTIFY, serde_json::json!({"fail": true})));
        queue.enqueue(Job::new("unknown.job", serde_json::json!({})));
        drop(queue);

        let mut runner = runner;
        while let Ok(job) = runner.receiver.try_recv() {
            runner.dispatch(job).await;
        }
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn runner_stops_when_cancelled() {
        let (_queue, rx) = JobQueue::channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(JobRunner::new(rx).run(cancel.clone()));
        cancel.cancel();
        handle.await.unwrap();
    }
}
