//! Task catalog routes and the bid submission route nested under a task.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use mockable::Clock;

use super::{
    ApiError, SharedState, parse_task_id,
    schemas::{
        BidView, CreateTaskBody, SubmitBidBody, SubmittedBid, TaskListParams, TaskView,
        UpdateTaskBody,
    },
};
use crate::marketplace::{
    domain::ValidationError,
    ports::MarketplaceStore,
    services::{SubmitOutcome, TaskDeletion},
};

/// Header carrying the client-chosen key for safe bid resubmission.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

pub(super) fn router<S, C>() -> Router<SharedState<S, C>>
where
    S: MarketplaceStore,
    C: Clock + Send + Sync + 'static,
{
    Router::new()
        .route("/tasks", post(create_task::<S, C>).get(list_tasks::<S, C>))
        .route(
            "/tasks/{task_id}",
            get(get_task::<S, C>)
                .patch(update_task::<S, C>)
                .delete(delete_task::<S, C>),
        )
        .route("/tasks/{task_id}/cancel", post(cancel_task::<S, C>))
        .route(
            "/tasks/{task_id}/bids",
            post(submit_bid::<S, C>).get(list_task_bids::<S, C>),
        )
}

async fn create_task<S, C>(
    State(state): State<SharedState<S, C>>,
    payload: Result<Json<CreateTaskBody>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskView>), ApiError>
where
    S: MarketplaceStore,
    C: Clock + Send + Sync + 'static,
{
    let Json(body) = payload?;
    let task = state.catalog().create_task(body.into()).await?;
    Ok((StatusCode::CREATED, Json(TaskView::from(&task))))
}

async fn list_tasks<S, C>(
    State(state): State<SharedState<S, C>>,
    query: Result<Query<TaskListParams>, QueryRejection>,
) -> Result<Json<Vec<TaskView>>, ApiError>
where
    S: MarketplaceStore,
    C: Clock + Send + Sync + 'static,
{
    let Query(params) = query?;
    let tasks = state.catalog().list_tasks(params.into()).await?;
    Ok(Json(tasks.iter().map(TaskView::from).collect()))
}

async fn get_task<S, C>(
    State(state): State<SharedState<S, C>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<TaskView>, ApiError>
where
    S: MarketplaceStore,
    C: Clock + Send + Sync + 'static,
{
    let Path(raw) = path?;
    let task = state.catalog().get_task(parse_task_id(&raw)?).await?;
    Ok(Json(TaskView::from(&task)))
}

async fn update_task<S, C>(
    State(state): State<SharedState<S, C>>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<UpdateTaskBody>, JsonRejection>,
) -> Result<Json<TaskView>, ApiError>
where
    S: MarketplaceStore,
    C: Clock + Send + Sync + 'static,
{
    let Path(raw) = path?;
    let task_id = parse_task_id(&raw)?;
    let Json(body) = payload?;
    let task = state.catalog().update_task(task_id, body.into()).await?;
    Ok(Json(TaskView::from(&task)))
}

async fn cancel_task<S, C>(
    State(state): State<SharedState<S, C>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<TaskView>, ApiError>
where
    S: MarketplaceStore,
    C: Clock + Send + Sync + 'static,
{
    let Path(raw) = path?;
    let task = state.catalog().cancel_task(parse_task_id(&raw)?).await?;
    Ok(Json(TaskView::from(&task)))
}

async fn delete_task<S, C>(
    State(state): State<SharedState<S, C>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<TaskDeletion>, ApiError>
where
    S: MarketplaceStore,
    C: Clock + Send + Sync + 'static,
{
    let Path(raw) = path?;
    let deletion = state.workflow().delete_task(parse_task_id(&raw)?).await?;
    Ok(Json(deletion))
}

async fn submit_bid<S, C>(
    State(state): State<SharedState<S, C>>,
    path: Result<Path<String>, PathRejection>,
    headers: HeaderMap,
    payload: Result<Json<SubmitBidBody>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmittedBid>), ApiError>
where
    S: MarketplaceStore,
    C: Clock + Send + Sync + 'static,
{
    let Path(raw) = path?;
    let task_id = parse_task_id(&raw)?;
    let idempotency_key = idempotency_key(&headers)?;
    let Json(body) = payload?;
    let outcome = state
        .workflow()
        .submit_bid(body.into_request(task_id, idempotency_key))
        .await?;
    let status = match outcome {
        SubmitOutcome::Created(_) => StatusCode::CREATED,
        SubmitOutcome::Replayed(_) => StatusCode::OK,
    };
    Ok((
        status,
        Json(SubmittedBid {
            bid_id: outcome.bid_id(),
            replayed: outcome.is_replay(),
        }),
    ))
}

async fn list_task_bids<S, C>(
    State(state): State<SharedState<S, C>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Vec<BidView>>, ApiError>
where
    S: MarketplaceStore,
    C: Clock + Send + Sync + 'static,
{
    let Path(raw) = path?;
    let bids = state.workflow().bids_for_task(parse_task_id(&raw)?).await?;
    Ok(Json(bids.iter().map(BidView::from).collect()))
}

fn idempotency_key(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .map(|value| {
            value
                .to_str()
                .map(str::to_owned)
                .map_err(|_| ApiError::from(ValidationError::InvalidIdempotencyKey))
        })
        .transpose()
}
