//! Subtask outcomes and the failure policy applied to them.

use std::fmt;

use log;

use crate::sort::SortError;

/// Step of an orchestrator frame that runs as a joined subtask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Token counting of the frame source.
    Count,
    /// Verbatim copy of a base-case source.
    Copy,
    /// Round-robin split into the two temporary files.
    Split,
    /// Recursive sort of one half.
    Sort,
    /// Merge of the two sorted halves.
    Merge,
    /// Removal of the temporary files.
    Cleanup,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Task::Count => "count",
            Task::Copy => "copy",
            Task::Split => "split",
            Task::Sort => "sort",
            Task::Merge => "merge",
            Task::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// What to do when a subtask fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the enclosing sort and propagate the failure.
    Abort,
    /// Log the failure and carry on with whatever output the subtask left behind.
    Continue,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Abort
    }
}

/// Result of a joined subtask.
#[derive(Debug)]
pub struct TaskOutcome<T> {
    task: Task,
    result: Result<T, SortError>,
}

impl<T> TaskOutcome<T> {
    pub fn new(task: Task, result: Result<T, SortError>) -> Self {
        TaskOutcome { task, result }
    }

    pub fn task(&self) -> Task {
        self.task
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Applies the failure policy.
    ///
    /// Returns the subtask value on success. On failure either returns [`SortError::TaskFailed`]
    /// ([`FailurePolicy::Abort`]) or logs it, increments `failures` and returns [`None`]
    /// ([`FailurePolicy::Continue`]).
    pub fn resolve(self, policy: FailurePolicy, failures: &mut usize) -> Result<Option<T>, SortError> {
        match self.result {
            Ok(value) => Ok(Some(value)),
            // a failed recursive sort already carries the task that failed
            Err(err @ SortError::TaskFailed { .. }) if policy == FailurePolicy::Abort => Err(err),
            Err(err) => match policy {
                FailurePolicy::Abort => Err(SortError::TaskFailed {
                    task: self.task,
                    source: Box::new(err),
                }),
                FailurePolicy::Continue => {
                    log::warn!("{} task failed, continuing: {}", self.task, err);
                    *failures += 1;
                    Ok(None)
                }
            },
        }
    }
}
