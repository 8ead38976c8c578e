//! Per-task run-time accounting and its text rendering.

use alloc::borrow::Cow;
use alloc::vec::Vec;
use core::fmt;

use crate::task::{TaskId, TaskState};
use crate::time::Tick;

/// Snapshot of one task's scheduling data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStats {
    pub id: TaskId,
    pub name: Cow<'static, str>,
    pub priority: u8,
    pub state: TaskState,
    /// Configured stack budget in words.
    pub stack_words: u16,
    pub tag: Option<u32>,
    /// Cumulative ticks this task has consumed.
    pub runtime: Tick,
}

/// Run-time figures for every task, idle included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeStats {
    pub tasks: Vec<TaskStats>,
    /// Total ticks elapsed since the scheduler started.
    pub total: Tick,
}

impl RuntimeStats {
    pub fn get(&self, id: TaskId) -> Option<&TaskStats> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn by_name(&self, name: &str) -> Option<&TaskStats> {
        self.tasks.iter().find(|task| task.name == name)
    }

    /// Writes the table: name, state, priority, stack budget in words, id,
    /// run time and share.
    ///
    /// Host tasks have no stack of their own, so the stack column shows the
    /// configured budget where a target kernel would show the high-water mark.
    pub fn write_table(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        for task in &self.tasks {
            write!(
                out,
                "{:<12}\t{}\t{}\t{}\t{}\t{}\t",
                task.name,
                task.state.code(),
                task.priority,
                task.stack_words,
                task.id,
                task.runtime
            )?;
            match share_percent(task.runtime, self.total) {
                Share::Percent(pct) => write!(out, "{pct}%\r\n")?,
                Share::BelowOne => out.write_str("<1%\r\n")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for RuntimeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_table(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Share {
    Percent(u64),
    BelowOne,
}

fn share_percent(runtime: Tick, total: Tick) -> Share {
    if total == 0 {
        return Share::Percent(0);
    }
    let pct = runtime.saturating_mul(100) / total;
    if pct == 0 && runtime > 0 {
        Share::BelowOne
    } else {
        Share::Percent(pct)
    }
}
