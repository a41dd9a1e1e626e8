//! Store port for plain task persistence and lookup.

use super::{StoreResult, WriteOutcome};
use crate::marketplace::domain::{ClientId, Task, TaskDetails, TaskId, TaskStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Filter for task listings; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Restrict to tasks in this status.
    pub status: Option<TaskStatus>,
    /// Restrict to tasks posted by this client.
    pub client_id: Option<ClientId>,
}

impl TaskFilter {
    /// Returns `true` when `task` satisfies the filter.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.status.is_none_or(|status| task.status() == status)
            && self
                .client_id
                .as_ref()
                .is_none_or(|client_id| task.client_id() == client_id)
    }
}

/// Task persistence contract for single-record operations.
///
/// Writes here never touch the status, bid counter, or assignee of a task
/// except through the guarded `cancel_task_if_open`; those fields belong to the
/// transactional bid workflow.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns [`super::StoreError::DuplicateTask`] when the identifier
    /// already exists.
    async fn insert_task(&self, task: &Task) -> StoreResult<()>;

    /// Finds a task by identifier.
    ///
    /// Returns `None` when the task does not exist.
    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>>;

    /// Returns tasks matching the filter, oldest first.
    async fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>>;

    /// Replaces the descriptive fields of a task that is still open.
    ///
    /// Returns [`WriteOutcome::Unmatched`] when the task is missing or no
    /// longer open.
    async fn update_task_details(
        &self,
        id: TaskId,
        details: &TaskDetails,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<WriteOutcome>;

    /// Moves an open task to cancelled.
    ///
    /// Returns [`WriteOutcome::Unmatched`] when the task is missing or no
    /// longer open.
    async fn cancel_task_if_open(
        &self,
        id: TaskId,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<WriteOutcome>;
}
