use std::collections::VecDeque;

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub pending: usize,
    pub draining: bool,
}

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    draining: bool,
}

/// Unbounded FIFO with a drain claim.
///
/// The claim and the items share one lock, so a consumer can observe the queue empty and give
/// up the claim in a single step. A producer that pushes after that step sees the claim free and
/// starts a new drain; a producer that pushes before it is served by the current drain.
#[derive(Debug)]
pub struct WorkQueue<T> {
    state: Mutex<QueueState<T>>,
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                draining: false,
            }),
        }
    }

    pub fn push(&self, item: T) {
        self.state.lock().items.push_back(item);
    }

    /// Takes the drain claim. Returns `false` when another drain already holds it.
    pub fn try_claim(&self) -> bool {
        let mut state = self.state.lock();
        if state.draining {
            return false;
        }
        state.draining = true;
        true
    }

    /// Pops the head item, or releases the claim when the queue is empty.
    pub fn next_or_release(&self) -> Option<T> {
        let mut state = self.state.lock();
        let next = state.items.pop_front();
        if next.is_none() {
            state.draining = false;
        }
        next
    }

    pub fn release(&self) {
        self.state.lock().draining = false;
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let state = self.state.lock();
        QueueSnapshot {
            pending: state.items.len(),
            draining: state.draining,
        }
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn claim_is_exclusive_until_released_on_empty() {
        let queue = WorkQueue::new();
        queue.push(1);
        queue.push(2);

        assert!(queue.try_claim());
        assert!(!queue.try_claim());
        assert_eq!(queue.next_or_release(), Some(1));
        queue.push(3);
        assert_eq!(queue.next_or_release(), Some(2));
        assert_eq!(queue.next_or_release(), Some(3));
        assert!(!queue.try_claim());
        assert_eq!(queue.next_or_release(), None);
        assert_eq!(
            queue.snapshot(),
            QueueSnapshot {
                pending: 0,
                draining: false
            }
        );
        assert!(queue.try_claim());
    }

    #[test]
    fn release_keeps_pending_items() {
        let queue = WorkQueue::new();
        queue.push("a");
        assert!(queue.try_claim());
        queue.release();
        assert_eq!(
            queue.snapshot(),
            QueueSnapshot {
                pending: 1,
                draining: false
            }
        );
    }

    #[test]
    fn concurrent_claims_grant_exactly_one() {
        let queue = Arc::new(WorkQueue::<u32>::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let queue = queue.clone();
                thread::spawn(move || queue.try_claim())
            })
            .collect();
        let granted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|granted| *granted)
            .count();
        assert_eq!(granted, 1);
    }
}
