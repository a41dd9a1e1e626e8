//! JSON-over-HTTP surface for the marketplace.
//!
//! Handlers are thin: they decode the request, call a service, and encode
//! its result. Every rule about tasks and bids lives in
//! [`crate::marketplace::services`].

mod bids;
mod error;
mod schemas;
mod tasks;

pub use error::ApiError;
pub use schemas::{
    BidView, CreateTaskBody, SubmitBidBody, SubmittedBid, TaskListParams, TaskView,
    UpdateTaskBody,
};
pub use tasks::IDEMPOTENCY_KEY_HEADER;

use std::sync::Arc;

use axum::{Json, Router, routing::get};
use mockable::Clock;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::marketplace::{
    domain::{BidId, TaskId},
    ports::MarketplaceStore,
    services::{BidWorkflow, TaskCatalogService},
};

/// Services shared by every handler.
pub struct AppState<S, C>
where
    S: MarketplaceStore,
    C: Clock + Send + Sync,
{
    workflow: BidWorkflow<S, C>,
    catalog: TaskCatalogService<S, C>,
}

impl<S, C> AppState<S, C>
where
    S: MarketplaceStore,
    C: Clock + Send + Sync,
{
    /// Builds both services over one shared store.
    #[must_use]
    pub fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            workflow: BidWorkflow::new(Arc::clone(&store), Arc::clone(&clock)),
            catalog: TaskCatalogService::new(store, clock),
        }
    }

    /// Returns the bid workflow.
    #[must_use]
    pub const fn workflow(&self) -> &BidWorkflow<S, C> {
        &self.workflow
    }

    /// Returns the task catalog.
    #[must_use]
    pub const fn catalog(&self) -> &TaskCatalogService<S, C> {
        &self.catalog
    }
}

/// Shared handle passed to handlers through axum state.
pub type SharedState<S, C> = Arc<AppState<S, C>>;

/// Builds the application router with request tracing.
pub fn router<S, C>(state: SharedState<S, C>) -> Router
where
    S: MarketplaceStore,
    C: Clock + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .merge(tasks::router())
        .merge(bids::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn parse_task_id(raw: &str) -> Result<TaskId, ApiError> {
    raw.parse().map_err(ApiError::from)
}

fn parse_bid_id(raw: &str) -> Result<BidId, ApiError> {
    raw.parse().map_err(ApiError::from)
}
