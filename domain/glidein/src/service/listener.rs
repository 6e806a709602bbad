use crate::model::vo::event::JobEvent;
use crate::model::vo::job::JobHandle;

/// What the log watcher should do after a listener has processed an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerFlow {
    Continue,
    /// The job reached a terminal event; stop tailing its log.
    Stop,
}

/// Consumer of the job events produced by a log watcher. Events for one job
/// arrive strictly in log order, one fully-handled event at a time.
#[async_trait::async_trait]
pub trait JobEventListener: Send + Sync {
    async fn handle_event(&self, job: &JobHandle, event: &JobEvent) -> ListenerFlow;
}
