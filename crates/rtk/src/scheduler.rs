//! Fixed-priority ready queue.
//!
//! Priorities are tracked in a 64-bit bitmap so that the highest ready
//! priority is found with a single `leading_zeros`. Each priority level keeps
//! its own FIFO of task identifiers; the task at the front of the highest
//! non-empty level is the one that runs.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::task::{TaskId, MAX_PRIORITY};

const LEVELS: usize = MAX_PRIORITY as usize + 1;

/// 64-bit bitmap of priorities that have at least one ready task.
#[derive(Default, Clone, Copy)]
struct ReadySet {
    bits: u64,
}

impl ReadySet {
    fn insert(&mut self, prio: u8) {
        Self::assert_range(prio);
        self.bits |= 1u64 << prio;
    }

    fn remove(&mut self, prio: u8) {
        Self::assert_range(prio);
        self.bits &= !(1u64 << prio);
    }

    fn max(&self) -> Option<u8> {
        if self.bits == 0 {
            None
        } else {
            Some(63 - self.bits.leading_zeros() as u8)
        }
    }

    fn assert_range(prio: u8) {
        assert!(
            prio <= MAX_PRIORITY,
            "priority {prio} exceeds supported range 0..{MAX_PRIORITY}"
        );
    }
}

pub(crate) struct ReadyQueue {
    set: ReadySet,
    levels: Vec<VecDeque<TaskId>>,
}

impl ReadyQueue {
    pub(crate) fn new() -> Self {
        Self {
            set: ReadySet::default(),
            levels: (0..LEVELS).map(|_| VecDeque::new()).collect(),
        }
    }

    /// Appends `id` to the back of its priority level.
    pub(crate) fn insert(&mut self, prio: u8, id: TaskId) {
        ReadySet::assert_range(prio);
        let level = &mut self.levels[prio as usize];
        if !level.contains(&id) {
            level.push_back(id);
        }
        self.set.insert(prio);
    }

    pub(crate) fn remove(&mut self, prio: u8, id: TaskId) {
        ReadySet::assert_range(prio);
        let level = &mut self.levels[prio as usize];
        level.retain(|queued| *queued != id);
        if level.is_empty() {
            self.set.remove(prio);
        }
    }

    /// Task at the front of the highest ready priority.
    pub(crate) fn highest(&self) -> Option<TaskId> {
        let prio = self.set.max()?;
        self.levels[prio as usize].front().copied()
    }

    /// Moves the front task of `prio` to the back of the same level.
    pub(crate) fn rotate(&mut self, prio: u8) {
        ReadySet::assert_range(prio);
        let level = &mut self.levels[prio as usize];
        if level.len() > 1 {
            level.rotate_left(1);
        }
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, prio: u8, id: TaskId) -> bool {
        self.levels[prio as usize].contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_priority_wins() {
        let mut ready = ReadyQueue::new();
        ready.insert(1, TaskId(0));
        ready.insert(5, TaskId(1));
        ready.insert(3, TaskId(2));

        assert_eq!(ready.highest(), Some(TaskId(1)));
        ready.remove(5, TaskId(1));
        assert_eq!(ready.highest(), Some(TaskId(2)));
        ready.remove(3, TaskId(2));
        assert_eq!(ready.highest(), Some(TaskId(0)));
        ready.remove(1, TaskId(0));
        assert_eq!(ready.highest(), None);
    }

    #[test]
    fn equal_priorities_round_robin() {
        let mut ready = ReadyQueue::new();
        ready.insert(2, TaskId(0));
        ready.insert(2, TaskId(1));
        ready.insert(2, TaskId(2));

        let mut order = Vec::new();
        for _ in 0..6 {
            let id = ready.highest().unwrap();
            order.push(id.0);
            ready.rotate(2);
        }
        assert_eq!(order, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn duplicate_insert_is_ignored() {
        let mut ready = ReadyQueue::new();
        ready.insert(4, TaskId(7));
        ready.insert(4, TaskId(7));
        ready.remove(4, TaskId(7));
        assert!(!ready.contains(4, TaskId(7)));
        assert_eq!(ready.highest(), None);
    }

    #[test]
    #[should_panic(expected = "exceeds supported range")]
    fn out_of_range_priority_panics() {
        let mut ready = ReadyQueue::new();
        ready.insert(64, TaskId(0));
    }
}
