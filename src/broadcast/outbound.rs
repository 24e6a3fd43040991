use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

/// What to do when a connection's outbound queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Discard the oldest queued frame to make room for the new one
    DropOldest,
    /// Close the queue; the connection is torn down by its own task
    Disconnect,
}

/// Outcome of a successful push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    DroppedOldest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushError {
    /// The queue was already closed; the connection is being pruned
    Closed,
    /// The queue filled up under the Disconnect policy and is now closed
    Overflow,
}

struct QueueState {
    frames: VecDeque<String>,
    closed: bool,
}

/// Bounded FIFO of serialized outbound frames for one connection.
///
/// Producers (the broadcast engine, in-place replies) push from any task;
/// the single consumer is the connection's socket task. The bound plus the
/// overflow policy keep one slow consumer from buffering without limit.
pub struct OutboundQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    capacity: usize,
    policy: OverflowPolicy,
}

impl OutboundQueue {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            state: Mutex::new(QueueState {
                frames: VecDeque::new(),
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
            policy,
        }
    }

    /// Enqueue a frame, applying the overflow policy when full
    pub fn push(&self, frame: String) -> Result<PushOutcome, PushError> {
        let mut state = self.state.lock().unwrap();

        if state.closed {
            return Err(PushError::Closed);
        }

        if state.frames.len() >= self.capacity {
            match self.policy {
                OverflowPolicy::DropOldest => {
                    state.frames.pop_front();
                    state.frames.push_back(frame);
                    drop(state);
                    self.notify.notify_one();
                    Ok(PushOutcome::DroppedOldest)
                }
                OverflowPolicy::Disconnect => {
                    state.closed = true;
                    drop(state);
                    self.notify.notify_waiters();
                    Err(PushError::Overflow)
                }
            }
        } else {
            state.frames.push_back(frame);
            drop(state);
            self.notify.notify_one();
            Ok(PushOutcome::Queued)
        }
    }

    /// Receive the next frame; `None` once the queue is closed and drained
    pub async fn recv(&self) -> Option<String> {
        loop {
            // Register interest before checking state so a push between the
            // check and the await cannot be missed.
            let notified = self.notify.notified();

            {
                let mut state = self.state.lock().unwrap();
                if let Some(frame) = state.frames.pop_front() {
                    return Some(frame);
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Close the queue. Pending frames may still be drained by the consumer.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        drop(state);
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn preserves_fifo_order() {
        let queue = OutboundQueue::new(8, OverflowPolicy::DropOldest);
        queue.push("a".to_string()).unwrap();
        queue.push("b".to_string()).unwrap();
        queue.push("c".to_string()).unwrap();

        assert_eq!(queue.recv().await.as_deref(), Some("a"));
        assert_eq!(queue.recv().await.as_deref(), Some("b"));
        assert_eq!(queue.recv().await.as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn drop_oldest_discards_the_head() {
        let queue = OutboundQueue::new(2, OverflowPolicy::DropOldest);
        queue.push("a".to_string()).unwrap();
        queue.push("b".to_string()).unwrap();

        let outcome = queue.push("c".to_string()).unwrap();
        assert_eq!(outcome, PushOutcome::DroppedOldest);

        assert_eq!(queue.recv().await.as_deref(), Some("b"));
        assert_eq!(queue.recv().await.as_deref(), Some("c"));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn disconnect_policy_closes_on_overflow() {
        let queue = OutboundQueue::new(1, OverflowPolicy::Disconnect);
        queue.push("a".to_string()).unwrap();

        assert_eq!(queue.push("b".to_string()), Err(PushError::Overflow));
        assert!(queue.is_closed());

        // Pending frames drain, then the consumer sees the close.
        assert_eq!(queue.recv().await.as_deref(), Some("a"));
        assert_eq!(queue.recv().await, None);
    }

    #[tokio::test]
    async fn push_after_close_fails() {
        let queue = OutboundQueue::new(4, OverflowPolicy::DropOldest);
        queue.close();
        assert_eq!(queue.push("a".to_string()), Err(PushError::Closed));
    }

    #[tokio::test]
    async fn recv_wakes_on_push() {
        let queue = Arc::new(OutboundQueue::new(4, OverflowPolicy::DropOldest));

        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.recv().await })
        };

        tokio::task::yield_now().await;
        queue.push("hello".to_string()).unwrap();

        assert_eq!(consumer.await.unwrap().as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn recv_wakes_on_close() {
        let queue = Arc::new(OutboundQueue::new(4, OverflowPolicy::DropOldest));

        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.recv().await })
        };

        tokio::task::yield_now().await;
        queue.close();

        assert_eq!(consumer.await.unwrap(), None);
    }
}
