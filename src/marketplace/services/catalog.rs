//! Plain task CRUD: posting, lookup, listing, editing, and cancelling.

use super::error::{MarketplaceError, MarketplaceResult};
use crate::marketplace::{
    domain::{
        Amount, ClientId, LifecycleViolation, Task, TaskDescription, TaskDetails, TaskId,
        TaskRevision, TaskStatus, TaskTitle, ValidationError,
    },
    ports::{TaskFilter, TaskStore, WriteOutcome},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, info};

/// Request payload for posting a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    client_id: String,
    title: String,
    description: Option<String>,
    budget: Option<u64>,
}

impl CreateTaskRequest {
    /// Creates a request with the required task fields.
    #[must_use]
    pub fn new(client_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            title: title.into(),
            description: None,
            budget: None,
        }
    }

    /// Sets the task description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the task budget in minor currency units.
    #[must_use]
    pub const fn with_budget(mut self, budget: u64) -> Self {
        self.budget = Some(budget);
        self
    }
}

/// Request payload for editing the descriptive fields of an open task.
///
/// Unset fields are left unchanged; a blank description clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTaskRequest {
    title: Option<String>,
    description: Option<String>,
    budget: Option<u64>,
}

impl UpdateTaskRequest {
    /// Creates an empty edit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Replaces the description; blank input clears it.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replaces the budget.
    #[must_use]
    pub const fn with_budget(mut self, budget: u64) -> Self {
        self.budget = Some(budget);
        self
    }

    fn into_revision(self) -> Result<TaskRevision, ValidationError> {
        let revision = TaskRevision {
            title: self.title.map(TaskTitle::new).transpose()?,
            description: self.description.map(TaskDescription::parse).transpose()?,
            budget: self.budget.map(Amount::new).transpose()?,
        };
        if revision.is_empty() {
            return Err(ValidationError::EmptyUpdate);
        }
        Ok(revision)
    }
}

/// Listing criteria using raw query values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    status: Option<String>,
    client_id: Option<String>,
}

impl TaskQuery {
    /// Creates a query matching every task.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts results to a status name such as `open`.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Restricts results to one client's tasks.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    fn into_filter(self) -> Result<TaskFilter, ValidationError> {
        Ok(TaskFilter {
            status: self
                .status
                .as_deref()
                .map(TaskStatus::try_from)
                .transpose()?,
            client_id: self.client_id.map(ClientId::new).transpose()?,
        })
    }
}

/// Task catalog service over the plain task store.
///
/// Edits and cancellation are single conditional updates that only match
/// open tasks, so they never race with the transactional bid workflow over
/// status, bid counter, or assignee.
#[derive(Clone)]
pub struct TaskCatalogService<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> TaskCatalogService<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    /// Creates a catalog over a shared store.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    /// Posts a new open task.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Validation`] for malformed input or
    /// [`MarketplaceError::Storage`] when the insert fails.
    pub async fn create_task(&self, request: CreateTaskRequest) -> MarketplaceResult<Task> {
        let client_id = ClientId::new(request.client_id)?;
        let details = TaskDetails {
            title: TaskTitle::new(request.title)?,
            description: request
                .description
                .map(TaskDescription::parse)
                .transpose()?
                .flatten(),
            budget: request.budget.map(Amount::new).transpose()?,
        };
        let task = Task::post(client_id, details, &*self.clock);
        self.store.insert_task(&task).await?;
        info!(task_id = %task.id(), client_id = %task.client_id(), "task posted");
        Ok(task)
    }

    /// Retrieves a task.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::TaskNotFound`] for an unknown task or
    /// [`MarketplaceError::Storage`] when the lookup fails.
    pub async fn get_task(&self, task_id: TaskId) -> MarketplaceResult<Task> {
        self.store
            .find_task(task_id)
            .await?
            .ok_or(MarketplaceError::TaskNotFound(task_id))
    }

    /// Lists tasks matching the query, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Validation`] for an unknown status or
    /// malformed client identifier, or [`MarketplaceError::Storage`] when the
    /// lookup fails.
    pub async fn list_tasks(&self, query: TaskQuery) -> MarketplaceResult<Vec<Task>> {
        let filter = query.into_filter()?;
        Ok(self.store.list_tasks(&filter).await?)
    }

    /// Edits the descriptive fields of an open task.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Validation`] for malformed or empty edits,
    /// [`MarketplaceError::TaskNotFound`] for an unknown task,
    /// [`MarketplaceError::Conflict`] once the task is no longer open, or
    /// [`MarketplaceError::Storage`] when storage fails.
    pub async fn update_task(
        &self,
        task_id: TaskId,
        request: UpdateTaskRequest,
    ) -> MarketplaceResult<Task> {
        let revision = request.into_revision()?;
        let current = self.get_task(task_id).await?;
        current.ensure_open()?;

        let details = current.details().revised(&revision);
        let now = self.clock.utc();
        let outcome = self
            .store
            .update_task_details(task_id, &details, now)
            .await?;
        self.explain_unmatched(task_id, outcome).await?;
        debug!(%task_id, "task details updated");

        let mut data = current.into_persisted();
        data.details = details;
        data.updated_at = now;
        Ok(Task::from_persisted(data))
    }

    /// Cancels an open task. Its pending bids stay pending but can no longer
    /// be accepted.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::TaskNotFound`] for an unknown task,
    /// [`MarketplaceError::Conflict`] once the task is no longer open, or
    /// [`MarketplaceError::Storage`] when storage fails.
    pub async fn cancel_task(&self, task_id: TaskId) -> MarketplaceResult<Task> {
        let current = self.get_task(task_id).await?;
        current.ensure_open()?;

        let now = self.clock.utc();
        let outcome = self.store.cancel_task_if_open(task_id, now).await?;
        self.explain_unmatched(task_id, outcome).await?;
        info!(%task_id, "task cancelled");

        Ok(with_status_change(current, TaskStatus::Cancelled, now))
    }

    /// Turns a missed conditional write into the error that explains it.
    async fn explain_unmatched(
        &self,
        task_id: TaskId,
        outcome: WriteOutcome,
    ) -> MarketplaceResult<()> {
        if outcome.is_applied() {
            return Ok(());
        }
        let task = self.get_task(task_id).await?;
        task.ensure_open()?;
        Err(MarketplaceError::Conflict(LifecycleViolation::TaskNotOpen {
            task_id,
            status: task.status(),
        }))
    }
}

fn with_status_change(task: Task, status: TaskStatus, updated_at: DateTime<Utc>) -> Task {
    let mut data = task.into_persisted();
    data.status = status;
    data.updated_at = updated_at;
    Task::from_persisted(data)
}
