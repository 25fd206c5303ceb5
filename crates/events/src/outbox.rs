//! Side effects buffered during a transaction.
//!
//! Services push events and jobs into an [`Outbox`] while their transaction
//! is open. After a successful commit the outbox is flushed; on rollback it
//! is simply dropped, so nothing observable escapes a failed write.

use crate::bus::{DomainEvent, EventBus};
use crate::jobs::{Job, JobQueue};

#[derive(Debug, Default)]
pub struct Outbox {
    events: Vec<DomainEvent>,
    jobs: Vec<Job>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event(&mut self, event: DomainEvent) {
        self.events.push(event);
    }

    pub fn job(&mut self, job: Job) {
        self.jobs.push(job);
    }

    /// Move everything from `other` into this outbox, keeping order.
    pub fn extend(&mut self, other: Outbox) {
        self.events.extend(other.events);
        self.jobs.extend(other.jobs);
    }

    pub fn events(&self) -> &[DomainEvent] {
        &self.events
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.jobs.is_empty()
    }

    /// Publish every event and enqueue every job. Call only after commit.
    pub fn flush(self, bus: &EventBus, queue: &JobQueue) {
        if !self.is_empty() {
            tracing::debug!(
                events = self.events.len(),
                jobs = self.jobs.len(),
                "Flushing outbox"
            );
        }
        for event in self.events {
            bus.publish(event);
        }
        for job in self.jobs {
            queue.enqueue(job);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::SUBTITLES_ADDED;
    use crate::jobs::JOB_NOTIFY;

    #[tokio::test]
    async fn flush_releases_in_order() {
        let bus = EventBus::default();
        let mut events = bus.subscribe();
        let (queue, mut jobs) = JobQueue::channel();

        let mut outbox = Outbox::new();
        outbox.event(DomainEvent::new(SUBTITLES_ADDED).with_language("en"));
        let mut inner = Outbox::new();
        inner.event(DomainEvent::new(SUBTITLES_ADDED).with_language("fr"));
        inner.job(Job::new(JOB_NOTIFY, serde_json::json!({})));
        outbox.extend(inner);

        assert!(events.try_recv().is_err());
        outbox.flush(&bus, &queue);

        assert_eq!(events.recv().await.unwrap().language_code.as_deref(), Some("en"));
        assert_eq!(events.recv().await.unwrap().language_code.as_deref(), Some("fr"));
        assert_eq!(jobs.recv().await.unwrap().name, JOB_NOTIFY);
    }

    #[test]
    fn dropped_outbox_emits_nothing() {
        let bus = EventBus::default();
        let mut events = bus.subscribe();
        let mut outbox = Outbox::new();
        outbox.event(DomainEvent::new(SUBTITLES_ADDED));
        drop(outbox);
        assert!(events.try_recv().is_err());
    }
}
