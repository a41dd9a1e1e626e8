//! Task aggregate root and related lifecycle types.

use super::{
    Amount, BidderId, ClientId, LifecycleViolation, ParseTaskStatusError, TaskDescription, TaskId,
    TaskTitle,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task accepts bids.
    Open,
    /// A bid has been accepted and the task belongs to its bidder.
    Assigned,
    /// The client withdrew the task.
    Cancelled,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Assigned => "assigned",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "open" => Ok(Self::Open),
            "assigned" => Ok(Self::Assigned),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = ParseTaskStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::try_from(value)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-editable descriptive fields of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetails {
    /// Task title.
    pub title: TaskTitle,
    /// Optional long-form description.
    pub description: Option<TaskDescription>,
    /// Optional budget in minor currency units.
    pub budget: Option<Amount>,
}

impl TaskDetails {
    /// Creates details with only a title.
    #[must_use]
    pub const fn titled(title: TaskTitle) -> Self {
        Self {
            title,
            description: None,
            budget: None,
        }
    }

    /// Returns a copy with the given revision applied.
    #[must_use]
    pub fn revised(&self, revision: &TaskRevision) -> Self {
        Self {
            title: revision.title.clone().unwrap_or_else(|| self.title.clone()),
            description: revision
                .description
                .clone()
                .unwrap_or_else(|| self.description.clone()),
            budget: revision.budget.or(self.budget),
        }
    }
}

/// Partial edit of [`TaskDetails`]; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskRevision {
    /// Replacement title.
    pub title: Option<TaskTitle>,
    /// Replacement description; `Some(None)` clears it.
    pub description: Option<Option<TaskDescription>>,
    /// Replacement budget.
    pub budget: Option<Amount>,
}

impl TaskRevision {
    /// Returns `true` when the revision changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.budget.is_none()
    }
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    client_id: ClientId,
    details: TaskDetails,
    status: TaskStatus,
    bids_count: u64,
    assigned_bidder: Option<BidderId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted poster identifier.
    pub client_id: ClientId,
    /// Persisted descriptive fields.
    pub details: TaskDetails,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
    /// Persisted denormalized bid counter.
    pub bids_count: u64,
    /// Persisted assignee, if any.
    pub assigned_bidder: Option<BidderId>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new open task with no bids.
    #[must_use]
    pub fn post(client_id: ClientId, details: TaskDetails, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: TaskId::new(),
            client_id,
            details,
            status: TaskStatus::Open,
            bids_count: 0,
            assigned_bidder: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            client_id: data.client_id,
            details: data.details,
            status: data.status,
            bids_count: data.bids_count,
            assigned_bidder: data.assigned_bidder,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Decomposes the task into its persisted representation.
    #[must_use]
    pub fn into_persisted(self) -> PersistedTaskData {
        PersistedTaskData {
            id: self.id,
            client_id: self.client_id,
            details: self.details,
            status: self.status,
            bids_count: self.bids_count,
            assigned_bidder: self.assigned_bidder,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the poster identifier.
    #[must_use]
    pub const fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Returns the descriptive fields.
    #[must_use]
    pub const fn details(&self) -> &TaskDetails {
        &self.details
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the number of bids recorded against this task.
    #[must_use]
    pub const fn bids_count(&self) -> u64 {
        self.bids_count
    }

    /// Returns the bidder whose offer was accepted, if any.
    #[must_use]
    pub const fn assigned_bidder(&self) -> Option<&BidderId> {
        self.assigned_bidder.as_ref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns `true` while the task accepts bids.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.status, TaskStatus::Open)
    }

    /// Fails unless the task is open.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleViolation::TaskNotOpen`] for assigned or cancelled
    /// tasks.
    pub const fn ensure_open(&self) -> Result<(), LifecycleViolation> {
        if self.is_open() {
            return Ok(());
        }
        Err(LifecycleViolation::TaskNotOpen {
            task_id: self.id,
            status: self.status,
        })
    }
}
