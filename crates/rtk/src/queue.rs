//! Bounded message queue with priority-ordered waiter lists.
//!
//! The queue stores fixed-size `Copy` items. Tasks that cannot complete an
//! operation register themselves as waiters; when the blocking condition
//! clears, the highest-priority waiter (FIFO among equals) is marked as woken
//! and the kernel makes it ready again at the next dispatch decision.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt;

use crate::sync::{Arc, Mutex};
use crate::task::TaskId;
use crate::time::Tick;

/// How long a queue operation may wait inside a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Fail immediately.
    NoWait,
    /// Wait at most `n` ticks. `Ticks(0)` behaves like `NoWait`.
    Ticks(Tick),
    /// Wait until the operation can complete.
    Forever,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// No free slot and the caller does not wait.
    Full,
    /// No item and the caller does not wait.
    Empty,
    /// The bounded wait elapsed before the operation could complete.
    Timeout,
    /// The caller has been registered as a waiter; return
    /// [`Suspend::Blocked`](crate::Suspend::Blocked) and retry when resumed.
    WouldBlock,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Full => write!(f, "queue full"),
            QueueError::Empty => write!(f, "queue empty"),
            QueueError::Timeout => write!(f, "queue wait timed out"),
            QueueError::WouldBlock => write!(f, "queue operation would block"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for QueueError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Waiter {
    pub(crate) id: TaskId,
    pub(crate) priority: u8,
}

/// Type-erased view of a queue used by the kernel to resolve blocked tasks.
pub(crate) trait WaitQueue: Send + Sync {
    /// Returns `true` once if `task` was woken by the queue.
    fn take_woken(&self, task: TaskId) -> bool;
    /// Drops every registration of `task` after its wait timed out.
    fn cancel_wait(&self, task: TaskId);
}

struct QueueState<T> {
    items: VecDeque<T>,
    capacity: usize,
    waiting_senders: Vec<Waiter>,
    waiting_receivers: Vec<Waiter>,
    woken: Vec<TaskId>,
}

impl<T> QueueState<T> {
    fn register(list: &mut Vec<Waiter>, waiter: Waiter) {
        if !list.iter().any(|w| w.id == waiter.id) {
            list.push(waiter);
        }
    }

    fn wake_one(list: &mut Vec<Waiter>, woken: &mut Vec<TaskId>) {
        let mut best: Option<usize> = None;
        for (index, waiter) in list.iter().enumerate() {
            match best {
                Some(current) if list[current].priority >= waiter.priority => {}
                _ => best = Some(index),
            }
        }
        if let Some(index) = best {
            let waiter = list.remove(index);
            woken.push(waiter.id);
        }
    }

    fn push(&mut self, item: T) -> bool {
        if self.items.len() >= self.capacity {
            return false;
        }
        self.items.push_back(item);
        Self::wake_one(&mut self.waiting_receivers, &mut self.woken);
        true
    }

    fn pop(&mut self) -> Option<T> {
        let item = self.items.pop_front()?;
        Self::wake_one(&mut self.waiting_senders, &mut self.woken);
        Some(item)
    }
}

struct Shared<T> {
    state: Mutex<QueueState<T>>,
}

impl<T: Send> WaitQueue for Shared<T> {
    fn take_woken(&self, task: TaskId) -> bool {
        let mut state = self.state.lock();
        match state.woken.iter().position(|id| *id == task) {
            Some(index) => {
                state.woken.remove(index);
                true
            }
            None => false,
        }
    }

    fn cancel_wait(&self, task: TaskId) {
        let mut state = self.state.lock();
        state.waiting_senders.retain(|w| w.id != task);
        state.waiting_receivers.retain(|w| w.id != task);
        state.woken.retain(|id| *id != task);
    }
}

/// Fixed-capacity FIFO shared between producer and consumer tasks.
///
/// Cloning yields another handle to the same queue.
pub struct BoundedQueue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for BoundedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Copy + Send + 'static> BoundedQueue<T> {
    /// Creates a queue outside of any kernel heap budget.
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    items: VecDeque::with_capacity(capacity),
                    capacity,
                    waiting_senders: Vec::new(),
                    waiting_receivers: Vec::new(),
                    woken: Vec::new(),
                }),
            }),
        }
    }

    /// Enqueues `item` if a slot is free.
    pub fn try_send(&self, item: T) -> Result<(), QueueError> {
        if self.shared.state.lock().push(item) {
            Ok(())
        } else {
            Err(QueueError::Full)
        }
    }

    /// Dequeues the oldest item if there is one.
    pub fn try_receive(&self) -> Result<T, QueueError> {
        self.shared.state.lock().pop().ok_or(QueueError::Empty)
    }

    pub fn len(&self) -> usize {
        self.shared.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        let state = self.shared.state.lock();
        state.items.len() >= state.capacity
    }

    pub fn capacity(&self) -> usize {
        self.shared.state.lock().capacity
    }

    /// Number of tasks currently waiting to send.
    pub fn waiting_senders(&self) -> usize {
        self.shared.state.lock().waiting_senders.len()
    }

    /// Number of tasks currently waiting to receive.
    pub fn waiting_receivers(&self) -> usize {
        self.shared.state.lock().waiting_receivers.len()
    }

    /// Enqueues `item`, or registers `waiter` when the queue is full.
    pub(crate) fn send_or_wait(&self, item: T, waiter: Waiter) -> Result<(), QueueError> {
        let mut state = self.shared.state.lock();
        if state.push(item) {
            Ok(())
        } else {
            QueueState::<T>::register(&mut state.waiting_senders, waiter);
            Err(QueueError::WouldBlock)
        }
    }

    /// Dequeues an item, or registers `waiter` when the queue is empty.
    pub(crate) fn receive_or_wait(&self, waiter: Waiter) -> Result<T, QueueError> {
        let mut state = self.shared.state.lock();
        match state.pop() {
            Some(item) => Ok(item),
            None => {
                QueueState::<T>::register(&mut state.waiting_receivers, waiter);
                Err(QueueError::WouldBlock)
            }
        }
    }

    pub(crate) fn wait_handle(&self) -> Arc<dyn WaitQueue> {
        self.shared.clone()
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("BoundedQueue")
            .field("len", &state.items.len())
            .field("capacity", &state.capacity)
            .field("waiting_senders", &state.waiting_senders.len())
            .field("waiting_receivers", &state.waiting_receivers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waiter(id: u8, priority: u8) -> Waiter {
        Waiter {
            id: TaskId(id),
            priority,
        }
    }

    #[test]
    fn fifo_order_and_capacity() {
        let queue = BoundedQueue::new(2);
        queue.try_send(1u32).unwrap();
        queue.try_send(2u32).unwrap();
        assert_eq!(queue.try_send(3u32), Err(QueueError::Full));
        assert!(queue.is_full());

        assert_eq!(queue.try_receive(), Ok(1));
        assert_eq!(queue.try_receive(), Ok(2));
        assert_eq!(queue.try_receive(), Err(QueueError::Empty));
    }

    #[test]
    fn highest_priority_receiver_woken_first() {
        let queue = BoundedQueue::<u8>::new(1);
        assert_eq!(queue.receive_or_wait(waiter(0, 1)), Err(QueueError::WouldBlock));
        assert_eq!(queue.receive_or_wait(waiter(1, 3)), Err(QueueError::WouldBlock));
        assert_eq!(queue.receive_or_wait(waiter(2, 3)), Err(QueueError::WouldBlock));

        let handle = queue.wait_handle();
        queue.try_send(9).unwrap();
        assert!(handle.take_woken(TaskId(1)));
        assert!(!handle.take_woken(TaskId(2)));
        assert!(!handle.take_woken(TaskId(0)));
        assert_eq!(queue.waiting_receivers(), 2);
    }

    #[test]
    fn receive_wakes_waiting_sender() {
        let queue = BoundedQueue::<u8>::new(1);
        queue.try_send(1).unwrap();
        assert_eq!(queue.send_or_wait(2, waiter(4, 2)), Err(QueueError::WouldBlock));
        assert_eq!(queue.waiting_senders(), 1);

        let handle = queue.wait_handle();
        assert_eq!(queue.try_receive(), Ok(1));
        assert!(handle.take_woken(TaskId(4)));
        assert!(!handle.take_woken(TaskId(4)));
    }

    #[test]
    fn cancel_removes_registration() {
        let queue = BoundedQueue::<u8>::new(1);
        let _ = queue.receive_or_wait(waiter(3, 1));
        let _ = queue.receive_or_wait(waiter(3, 1));
        assert_eq!(queue.waiting_receivers(), 1);

        queue.wait_handle().cancel_wait(TaskId(3));
        assert_eq!(queue.waiting_receivers(), 0);
    }
}
