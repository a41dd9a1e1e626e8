//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use eyre::{ensure, eyre};
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use skillnest::{
    http::{AppState, IDEMPOTENCY_KEY_HEADER, router},
    marketplace::adapters::memory::InMemoryMarketplaceStore,
};
use tower::ServiceExt;

#[fixture]
fn app() -> Router {
    let store = Arc::new(InMemoryMarketplaceStore::new());
    router(Arc::new(AppState::new(store, Arc::new(DefaultClock))))
}

struct Call<'a> {
    method: Method,
    uri: &'a str,
    body: Option<Value>,
    idempotency_key: Option<&'a str>,
}

impl<'a> Call<'a> {
    const fn new(method: Method, uri: &'a str) -> Self {
        Self {
            method,
            uri,
            body: None,
            idempotency_key: None,
        }
    }

    fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    const fn idempotency_key(mut self, key: &'a str) -> Self {
        self.idempotency_key = Some(key);
        self
    }

    async fn send(self, app: &Router) -> eyre::Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        if let Some(key) = self.idempotency_key {
            builder = builder.header(IDEMPOTENCY_KEY_HEADER, key);
        }
        let request = match self.body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };
        let response = app.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }
}

async fn create_task(app: &Router, title: &str) -> eyre::Result<String> {
    let (status, body) = Call::new(Method::POST, "/tasks")
        .json(json!({ "client_id": "client-1", "title": title, "budget": 400 }))
        .send(app)
        .await?;
    ensure!(status == StatusCode::CREATED, "create failed: {body}");
    body["id"]
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| eyre!("task id missing from {body}"))
}

async fn submit_bid(app: &Router, task_id: &str, bidder: &str, amount: u64) -> eyre::Result<String> {
    let (status, body) = Call::new(Method::POST, &format!("/tasks/{task_id}/bids"))
        .json(json!({ "bidder_id": bidder, "amount": amount }))
        .send(app)
        .await?;
    ensure!(status == StatusCode::CREATED, "submit failed: {body}");
    body["bid_id"]
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| eyre!("bid id missing from {body}"))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn health_reports_ok(app: Router) -> eyre::Result<()> {
    let (status, body) = Call::new(Method::GET, "/health").send(&app).await?;

    ensure!(status == StatusCode::OK);
    ensure!(body == json!({ "status": "ok" }));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn bidding_scenario_over_http(app: Router) -> eyre::Result<()> {
    let task_id = create_task(&app, "Assemble wardrobe").await?;
    let first = submit_bid(&app, &task_id, "alice", 100).await?;
    let second = submit_bid(&app, &task_id, "bob", 90).await?;

    let (status, ack) = Call::new(Method::PATCH, &format!("/bids/{second}/accept"))
        .send(&app)
        .await?;
    ensure!(status == StatusCode::OK, "accept failed: {ack}");
    ensure!(ack["assigned_bidder"] == "bob");
    ensure!(ack["rejected_bids"] == 1);

    let (_, task) = Call::new(Method::GET, &format!("/tasks/{task_id}"))
        .send(&app)
        .await?;
    ensure!(task["status"] == "assigned");
    ensure!(task["bids_count"] == 2);
    ensure!(task["assigned_bidder"] == "bob");

    let (status, error) = Call::new(Method::PATCH, &format!("/bids/{first}/accept"))
        .send(&app)
        .await?;
    ensure!(status == StatusCode::CONFLICT);
    ensure!(error["kind"] == "conflict");
    ensure!(error["retryable"] == false);

    let (_, bid) = Call::new(Method::GET, &format!("/bids/{first}")).send(&app).await?;
    ensure!(bid["status"] == "rejected");
    let (_, listed) = Call::new(Method::GET, &format!("/tasks/{task_id}/bids"))
        .send(&app)
        .await?;
    ensure!(listed.as_array().map(Vec::len) == Some(2));
    let (_, mine) = Call::new(Method::GET, "/bidders/bob/bids").send(&app).await?;
    ensure!(mine.as_array().map(Vec::len) == Some(1));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn replayed_submission_answers_ok(app: Router) -> eyre::Result<()> {
    let task_id = create_task(&app, "Fix fence").await?;
    let uri = format!("/tasks/{task_id}/bids");
    let payload = json!({ "bidder_id": "alice", "amount": 70 });

    let (first_status, first) = Call::new(Method::POST, &uri)
        .json(payload.clone())
        .idempotency_key("retry-7")
        .send(&app)
        .await?;
    let (second_status, second) = Call::new(Method::POST, &uri)
        .json(payload)
        .idempotency_key("retry-7")
        .send(&app)
        .await?;

    ensure!(first_status == StatusCode::CREATED);
    ensure!(second_status == StatusCode::OK);
    ensure!(first["bid_id"] == second["bid_id"]);
    ensure!(second["replayed"] == true);
    Ok(())
}

#[rstest]
#[case::malformed_task_id(Method::GET, "/tasks/not-a-uuid", None, StatusCode::BAD_REQUEST, "validation")]
#[case::malformed_bid_id(Method::PATCH, "/bids/42/accept", None, StatusCode::BAD_REQUEST, "validation")]
#[case::unknown_task(Method::GET, "/tasks/7d8c3f4e-1b2a-4c5d-9e6f-0a1b2c3d4e5f", None, StatusCode::NOT_FOUND, "not_found")]
#[case::unknown_bid(Method::GET, "/bids/7d8c3f4e-1b2a-4c5d-9e6f-0a1b2c3d4e5f", None, StatusCode::NOT_FOUND, "not_found")]
#[case::blank_title(Method::POST, "/tasks", Some(json!({ "client_id": "c", "title": "  " })), StatusCode::BAD_REQUEST, "validation")]
#[case::missing_field(Method::POST, "/tasks", Some(json!({ "title": "No client" })), StatusCode::BAD_REQUEST, "validation")]
#[case::unknown_status(Method::GET, "/tasks?status=archived", None, StatusCode::BAD_REQUEST, "validation")]
#[case::bad_bidder(Method::GET, "/bidders/has%20space/bids", None, StatusCode::BAD_REQUEST, "validation")]
#[tokio::test(flavor = "multi_thread")]
async fn errors_map_to_status_and_kind(
    app: Router,
    #[case] method: Method,
    #[case] uri: &str,
    #[case] body: Option<Value>,
    #[case] expected_status: StatusCode,
    #[case] expected_kind: &str,
) -> eyre::Result<()> {
    let mut call = Call::new(method, uri);
    if let Some(payload) = body {
        call = call.json(payload);
    }

    let (status, error) = call.send(&app).await?;

    ensure!(status == expected_status, "{uri}: {status} {error}");
    ensure!(error["kind"] == expected_kind);
    ensure!(error["error"].is_string());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn malformed_json_is_a_bad_request(app: Router) -> eyre::Result<()> {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/tasks")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"client_id\": "))?;

    let response = app.oneshot(request).await?;

    ensure!(response.status() == StatusCode::BAD_REQUEST);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancelled_task_refuses_bids_and_edits(app: Router) -> eyre::Result<()> {
    let task_id = create_task(&app, "Changed my mind").await?;

    let (status, task) = Call::new(Method::POST, &format!("/tasks/{task_id}/cancel"))
        .send(&app)
        .await?;
    ensure!(status == StatusCode::OK);
    ensure!(task["status"] == "cancelled");

    let (status, _) = Call::new(Method::POST, &format!("/tasks/{task_id}/bids"))
        .json(json!({ "bidder_id": "alice", "amount": 5 }))
        .send(&app)
        .await?;
    ensure!(status == StatusCode::CONFLICT);

    let (status, _) = Call::new(Method::PATCH, &format!("/tasks/{task_id}"))
        .json(json!({ "title": "Changed again" }))
        .send(&app)
        .await?;
    ensure!(status == StatusCode::CONFLICT);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn update_and_list_tasks(app: Router) -> eyre::Result<()> {
    let task_id = create_task(&app, "Draft").await?;
    create_task(&app, "Another").await?;

    let (status, task) = Call::new(Method::PATCH, &format!("/tasks/{task_id}"))
        .json(json!({ "title": "Final", "budget": 650 }))
        .send(&app)
        .await?;
    ensure!(status == StatusCode::OK);
    ensure!(task["title"] == "Final");
    ensure!(task["budget"] == 650);

    let (status, listed) = Call::new(Method::GET, "/tasks?status=open&client_id=client-1")
        .send(&app)
        .await?;
    ensure!(status == StatusCode::OK);
    ensure!(listed.as_array().map(Vec::len) == Some(2));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delete_cascades_over_http(app: Router) -> eyre::Result<()> {
    let task_id = create_task(&app, "Gone soon").await?;
    let bid_id = submit_bid(&app, &task_id, "alice", 30).await?;

    let (status, summary) = Call::new(Method::DELETE, &format!("/tasks/{task_id}"))
        .send(&app)
        .await?;
    ensure!(status == StatusCode::OK);
    ensure!(summary["removed_bids"] == 1);

    let (status, _) = Call::new(Method::GET, &format!("/bids/{bid_id}")).send(&app).await?;
    ensure!(status == StatusCode::NOT_FOUND);
    let (status, _) = Call::new(Method::GET, &format!("/tasks/{task_id}/bids"))
        .send(&app)
        .await?;
    ensure!(status == StatusCode::NOT_FOUND);
    Ok(())
}
