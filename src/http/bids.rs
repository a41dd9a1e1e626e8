//! Bid lookup and acceptance routes.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::PathRejection},
    routing::{get, patch},
};
use mockable::Clock;

use super::{ApiError, SharedState, parse_bid_id, schemas::BidView};
use crate::marketplace::{ports::MarketplaceStore, services::Acceptance};

pub(super) fn router<S, C>() -> Router<SharedState<S, C>>
where
    S: MarketplaceStore,
    C: Clock + Send + Sync + 'static,
{
    Router::new()
        .route("/bids/{bid_id}", get(get_bid::<S, C>))
        .route("/bids/{bid_id}/accept", patch(accept_bid::<S, C>))
        .route("/bidders/{bidder_id}/bids", get(list_bidder_bids::<S, C>))
}

async fn get_bid<S, C>(
    State(state): State<SharedState<S, C>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<BidView>, ApiError>
where
    S: MarketplaceStore,
    C: Clock + Send + Sync + 'static,
{
    let Path(raw) = path?;
    let bid = state.workflow().get_bid(parse_bid_id(&raw)?).await?;
    Ok(Json(BidView::from(&bid)))
}

async fn accept_bid<S, C>(
    State(state): State<SharedState<S, C>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Acceptance>, ApiError>
where
    S: MarketplaceStore,
    C: Clock + Send + Sync + 'static,
{
    let Path(raw) = path?;
    let acceptance = state.workflow().accept_bid(parse_bid_id(&raw)?).await?;
    Ok(Json(acceptance))
}

async fn list_bidder_bids<S, C>(
    State(state): State<SharedState<S, C>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Vec<BidView>>, ApiError>
where
    S: MarketplaceStore,
    C: Clock + Send + Sync + 'static,
{
    let Path(bidder_id) = path?;
    let bids = state.workflow().bids_for_bidder(&bidder_id).await?;
    Ok(Json(bids.iter().map(BidView::from).collect()))
}
