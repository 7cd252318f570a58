//! Two-priority FIFO queue (Director outranks Agent, FIFO within a
//! priority) with a completion-handle API, grounded on spec.md §4.O. A
//! single worker task dequeues and dispatches; callers get back a
//! `oneshot::Receiver` they can `.await` for the result.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::complexity::TaskComplexity;
use crate::error::LlmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePriority {
    Director,
    Agent,
}

pub struct QueuedRequest {
    pub id: Uuid,
    pub prompt: String,
    pub complexity: TaskComplexity,
    pub priority: QueuePriority,
}

#[derive(Default)]
struct Inner {
    director: VecDeque<QueuedRequest>,
    agent: VecDeque<QueuedRequest>,
    pending: HashMap<Uuid, oneshot::Sender<Result<String, LlmError>>>,
}

#[derive(Default)]
pub struct PriorityQueue {
    inner: Mutex<Inner>,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_director(
        &self,
        prompt: String,
        complexity: TaskComplexity,
    ) -> oneshot::Receiver<Result<String, LlmError>> {
        self.enqueue(prompt, complexity, QueuePriority::Director)
    }

    pub fn enqueue_agent(
        &self,
        prompt: String,
        complexity: TaskComplexity,
    ) -> oneshot::Receiver<Result<String, LlmError>> {
        self.enqueue(prompt, complexity, QueuePriority::Agent)
    }

    fn enqueue(
        &self,
        prompt: String,
        complexity: TaskComplexity,
        priority: QueuePriority,
    ) -> oneshot::Receiver<Result<String, LlmError>> {
        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        let request = QueuedRequest {
            id,
            prompt,
            complexity,
            priority,
        };
        let mut inner = self.inner.lock();
        inner.pending.insert(id, tx);
        match priority {
            QueuePriority::Director => inner.director.push_back(request),
            QueuePriority::Agent => inner.agent.push_back(request),
        }
        rx
    }

    /// Pops the next request to dispatch: all queued director requests
    /// drain before any agent request is considered.
    pub fn dequeue(&self) -> Option<QueuedRequest> {
        let mut inner = self.inner.lock();
        inner.director.pop_front().or_else(|| inner.agent.pop_front())
    }

    pub fn is_empty(&self) -> bool {
        let inner = self.inner.lock();
        inner.director.is_empty() && inner.agent.is_empty()
    }

    /// Fulfills `id`'s completion handle. A second call (or a call after
    /// `fail_request`) for the same id finds no pending sender and is a
    /// silent no-op, matching spec.md §4.O's "double-completion is a
    /// no-op" rule.
    pub fn complete_request(&self, id: Uuid, result: String) {
        self.resolve(id, Ok(result));
    }

    pub fn fail_request(&self, id: Uuid, error: LlmError) {
        self.resolve(id, Err(error));
    }

    fn resolve(&self, id: Uuid, result: Result<String, LlmError>) {
        let sender = self.inner.lock().pending.remove(&id);
        if let Some(sender) = sender {
            let _ = sender.send(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn director_requests_drain_before_agent_requests() {
        let queue = PriorityQueue::new();
        let _rx_agent = queue.enqueue_agent("agent task".to_string(), TaskComplexity::Fast);
        let _rx_director = queue.enqueue_director("director task".to_string(), TaskComplexity::Fast);

        let first = queue.dequeue().unwrap();
        assert_eq!(first.priority, QueuePriority::Director);
        let second = queue.dequeue().unwrap();
        assert_eq!(second.priority, QueuePriority::Agent);
        assert!(queue.dequeue().is_none());
    }

    #[tokio::test]
    async fn complete_request_fulfills_the_handle() {
        let queue = PriorityQueue::new();
        let rx = queue.enqueue_agent("hello".to_string(), TaskComplexity::Fast);
        let queued = queue.dequeue().unwrap();
        queue.complete_request(queued.id, "world".to_string());
        assert_eq!(rx.await.unwrap().unwrap(), "world");
    }

    #[tokio::test]
    async fn double_completion_is_a_no_op() {
        let queue = PriorityQueue::new();
        let _rx = queue.enqueue_agent("hello".to_string(), TaskComplexity::Fast);
        let queued = queue.dequeue().unwrap();
        queue.complete_request(queued.id, "first".to_string());
        queue.complete_request(queued.id, "second".to_string());
    }
}
