//! Deferred work for the single-threaded pipeline.
//!
//! Zero-delay timers and callbacks are posted to a [`TaskQueue`] owned by the
//! document and drained once per [`Document::pump`](crate::document::Document::pump).
//! A pump drains a snapshot of the queue, so a task posted while another task
//! runs waits for the next pump and never runs on the stack that posted it.

use crate::document::Document;
use crate::frame_view::FrameViewId;
use core::fmt;
use core::mem;
use std::collections::VecDeque;

/// Which one-shot timer a [`Task::Timer`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    PostLayoutTasks(FrameViewId),
    UpdateWidgets(FrameViewId),
    ClearFocusedElement,
}

pub type TaskCallback = Box<dyn FnOnce(&mut Document)>;

pub enum Task {
    /// Fires the timer if it is still armed with the same generation.
    Timer { kind: TimerKind, generation: u64 },
    Callback(TaskCallback),
}

impl fmt::Debug for Task {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timer { kind, generation } => formatter
                .debug_struct("Timer")
                .field("kind", kind)
                .field("generation", generation)
                .finish(),
            Self::Callback(_) => formatter.write_str("Callback(..)"),
        }
    }
}

#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: VecDeque<Task>,
}

impl TaskQueue {
    pub fn post(&mut self, task: Task) {
        self.tasks.push_back(task);
    }

    /// Everything queued so far, leaving the queue empty for tasks posted
    /// while these run.
    pub fn take_ready(&mut self) -> Vec<Task> {
        mem::take(&mut self.tasks).into()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// A zero-delay one-shot timer. Starting or stopping bumps the generation so
/// a task posted for an earlier arming is ignored when it comes up.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OneShotTimer {
    generation: u64,
    active: bool,
}

impl OneShotTimer {
    /// Arm the timer and return the generation its task must carry.
    pub const fn start(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.active = true;
        self.generation
    }

    pub const fn stop(&mut self) {
        if self.active {
            self.generation = self.generation.wrapping_add(1);
            self.active = false;
        }
    }

    #[inline]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Disarm and report whether a task with `generation` should run.
    pub const fn fire(&mut self, generation: u64) -> bool {
        if !self.active || self.generation != generation {
            return false;
        }
        self.active = false;
        true
    }
}
