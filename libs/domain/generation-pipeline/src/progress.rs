use battle_models::{Job, JobError};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Progress { job_id: Uuid, percent: u8 },
    Completed { job_id: Uuid, job: Box<Job> },
    Failed { job_id: Uuid, error: JobError },
}

impl ProgressEvent {
    pub fn job_id(&self) -> Uuid {
        match self {
            ProgressEvent::Progress { job_id, .. } => *job_id,
            ProgressEvent::Completed { job_id, .. } => *job_id,
            ProgressEvent::Failed { job_id, .. } => *job_id,
        }
    }
}

/// Process-local progress/result pub-sub. One broadcast channel per job, created
/// lazily on first publish or first subscribe and torn down once the last
/// handle (publisher and every subscriber) drops it. Mirrors the per-room
/// fan-out the combat broadcast uses for match streams, but scoped to a
/// single job's lifetime instead of a whole match.
pub struct ProgressBus {
    channels: Mutex<HashMap<Uuid, broadcast::Sender<ProgressEvent>>>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self { channels: Mutex::new(HashMap::new()) }
    }

    pub fn subscribe(&self, job_id: Uuid) -> broadcast::Receiver<ProgressEvent> {
        let mut guard = self.channels.lock().expect("progress bus lock poisoned");
        guard.entry(job_id).or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0).subscribe()
    }

    /// Publishes an event for `job_id`. Silently a no-op if nobody is
    /// subscribed yet (or anymore) — progress is advisory, not guaranteed
    /// delivery; the job's authoritative state always lives in the store.
    pub fn publish(&self, event: ProgressEvent) {
        let job_id = event.job_id();
        let guard = self.channels.lock().expect("progress bus lock poisoned");
        if let Some(sender) = guard.get(&job_id) {
            let _ = sender.send(event);
        }
    }

    /// Drops the channel for a job once it has reached a terminal state and
    /// every current subscriber has had a chance to observe the final
    /// event, so the map doesn't grow unbounded over the service's lifetime.
    pub fn retire(&self, job_id: Uuid) {
        let mut guard = self.channels.lock().expect("progress bus lock poisoned");
        guard.remove(&job_id);
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_progress() {
        let bus = ProgressBus::new();
        let job_id = Uuid::new_v4();
        let mut rx = bus.subscribe(job_id);
        bus.publish(ProgressEvent::Progress { job_id, percent: 50 });
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, ProgressEvent::Progress { percent: 50, .. }));
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = ProgressBus::new();
        bus.publish(ProgressEvent::Progress { job_id: Uuid::new_v4(), percent: 10 });
    }
}
