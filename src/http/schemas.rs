//! JSON request and response bodies.

use crate::marketplace::{
    domain::{Bid, BidId, BidStatus, BidderId, ClientId, Task, TaskId, TaskStatus},
    services::{CreateTaskRequest, SubmitBidRequest, TaskQuery, UpdateTaskRequest},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /tasks`.
#[derive(Debug, Deserialize)]
pub struct CreateTaskBody {
    /// Posting client.
    pub client_id: String,
    /// Task title.
    pub title: String,
    /// Optional free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional budget in minor currency units.
    #[serde(default)]
    pub budget: Option<u64>,
}

impl From<CreateTaskBody> for CreateTaskRequest {
    fn from(body: CreateTaskBody) -> Self {
        let mut request = Self::new(body.client_id, body.title);
        if let Some(description) = body.description {
            request = request.with_description(description);
        }
        if let Some(budget) = body.budget {
            request = request.with_budget(budget);
        }
        request
    }
}

/// Body of `PATCH /tasks/{task_id}`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskBody {
    /// Replacement title.
    #[serde(default)]
    pub title: Option<String>,
    /// Replacement description; an empty string clears it.
    #[serde(default)]
    pub description: Option<String>,
    /// Replacement budget.
    #[serde(default)]
    pub budget: Option<u64>,
}

impl From<UpdateTaskBody> for UpdateTaskRequest {
    fn from(body: UpdateTaskBody) -> Self {
        let mut request = Self::new();
        if let Some(title) = body.title {
            request = request.with_title(title);
        }
        if let Some(description) = body.description {
            request = request.with_description(description);
        }
        if let Some(budget) = body.budget {
            request = request.with_budget(budget);
        }
        request
    }
}

/// Query string of `GET /tasks`.
#[derive(Debug, Default, Deserialize)]
pub struct TaskListParams {
    /// Restrict to one lifecycle status.
    pub status: Option<String>,
    /// Restrict to one client's tasks.
    pub client_id: Option<String>,
}

impl From<TaskListParams> for TaskQuery {
    fn from(params: TaskListParams) -> Self {
        let mut query = Self::new();
        if let Some(status) = params.status {
            query = query.with_status(status);
        }
        if let Some(client_id) = params.client_id {
            query = query.with_client_id(client_id);
        }
        query
    }
}

/// Body of `POST /tasks/{task_id}/bids`.
#[derive(Debug, Deserialize)]
pub struct SubmitBidBody {
    /// Bidding party.
    pub bidder_id: String,
    /// Offered amount in minor currency units.
    pub amount: u64,
    /// Optional note for the client.
    #[serde(default)]
    pub message: Option<String>,
}

impl SubmitBidBody {
    /// Builds a service request for the given task.
    pub(crate) fn into_request(
        self,
        task_id: TaskId,
        idempotency_key: Option<String>,
    ) -> SubmitBidRequest {
        let mut request = SubmitBidRequest::new(task_id, self.bidder_id, self.amount);
        if let Some(message) = self.message {
            request = request.with_message(message);
        }
        if let Some(key) = idempotency_key {
            request = request.with_idempotency_key(key);
        }
        request
    }
}

/// Response of a bid submission.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmittedBid {
    /// Identifier of the created or replayed bid.
    pub bid_id: BidId,
    /// Whether an earlier submission was returned.
    pub replayed: bool,
}

/// Task as rendered to clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskView {
    /// Task identifier.
    pub id: TaskId,
    /// Posting client.
    pub client_id: ClientId,
    /// Title.
    pub title: String,
    /// Description, if any.
    pub description: Option<String>,
    /// Budget, if any.
    pub budget: Option<u64>,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Number of bids placed.
    pub bids_count: u64,
    /// Winning bidder once assigned.
    pub assigned_bidder: Option<BidderId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        let details = task.details();
        Self {
            id: task.id(),
            client_id: task.client_id().clone(),
            title: details.title.as_str().to_owned(),
            description: details.description.as_ref().map(|d| d.as_str().to_owned()),
            budget: details.budget.map(|b| b.value()),
            status: task.status(),
            bids_count: task.bids_count(),
            assigned_bidder: task.assigned_bidder().cloned(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}

/// Bid as rendered to clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct BidView {
    /// Bid identifier.
    pub id: BidId,
    /// Task the bid targets.
    pub task_id: TaskId,
    /// Bidding party.
    pub bidder_id: BidderId,
    /// Offered amount.
    pub amount: u64,
    /// Note for the client, if any.
    pub message: Option<String>,
    /// Lifecycle status.
    pub status: BidStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl From<&Bid> for BidView {
    fn from(bid: &Bid) -> Self {
        Self {
            id: bid.id(),
            task_id: bid.task_id(),
            bidder_id: bid.bidder_id().clone(),
            amount: bid.amount().value(),
            message: bid.message().map(|m| m.as_str().to_owned()),
            status: bid.status(),
            created_at: bid.created_at(),
            updated_at: bid.updated_at(),
        }
    }
}
