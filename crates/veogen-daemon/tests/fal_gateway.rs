#![allow(clippy::unwrap_used, clippy::panic)] // Integration tests use unwrap for brevity

//! `FalClient` against a local axum stand-in for the fal queue and storage
//! APIs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::sync::mpsc;

use veogen_core::config::GatewayConfig;
use veogen_core::failure::BALANCE_MESSAGE;
use veogen_core::{FailureKind, ImageRef, JobRequest};
use veogen_daemon::gateway::{FalClient, Gateway, GatewayError, GatewayInput, ImageUpload};
use veogen_daemon::registry::TaskRegistry;
use veogen_daemon::relay::{RelayConfig, RelayError, TaskRelay};

const API_KEY: &str = "test-key";
const MODEL_PATH: &str = "/queue/fal-ai/veo3";

/// Recorded traffic of the stand-in server.
#[derive(Default)]
struct FakeFal {
    base: String,
    polls: AtomicUsize,
    submitted: Mutex<Vec<Value>>,
    auth: Mutex<Vec<String>>,
    status_queries: Mutex<Vec<String>>,
    initiated: Mutex<Vec<Value>>,
    uploads: Mutex<Vec<(String, Vec<u8>)>>,
}

impl FakeFal {
    fn record_auth(&self, headers: &HeaderMap) {
        let value = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.auth.lock().unwrap().push(value);
    }
}

async fn enqueue(
    State(fal): State<Arc<FakeFal>>,
    headers: HeaderMap,
    Json(input): Json<Value>,
) -> Json<Value> {
    fal.record_auth(&headers);
    fal.submitted.lock().unwrap().push(input);
    Json(json!({ "request_id": "req-1" }))
}

async fn reject_exhausted_balance() -> (StatusCode, Json<Value>) {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "detail": "Exhausted balance" })),
    )
}

async fn status(
    State(fal): State<Arc<FakeFal>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Json<Value> {
    fal.record_auth(&headers);
    fal.status_queries
        .lock()
        .unwrap()
        .push(query.unwrap_or_default());
    let body = match fal.polls.fetch_add(1, Ordering::SeqCst) {
        0 => json!({ "status": "IN_QUEUE", "queue_position": 2 }),
        1 => json!({ "status": "IN_PROGRESS", "logs": [{ "message": "Gen 30%" }] }),
        _ => json!({ "status": "COMPLETED" }),
    };
    Json(body)
}

async fn result(Path(request_id): Path<String>) -> Json<Value> {
    Json(json!({ "video": { "url": format!("https://x/{request_id}.mp4") } }))
}

async fn initiate_upload(
    State(fal): State<Arc<FakeFal>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    fal.initiated.lock().unwrap().push(body);
    Json(json!({
        "upload_url": format!("{}/blobs/blob-1", fal.base),
        "file_url": "https://cdn.test/blob-1.png",
    }))
}

async fn put_blob(State(fal): State<Arc<FakeFal>>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    fal.uploads
        .lock()
        .unwrap()
        .push((content_type, body.to_vec()));
    StatusCode::OK
}

/// Start the stand-in server. With `out_of_credit`, job submission is
/// refused with 403.
async fn spawn_fal(out_of_credit: bool) -> Arc<FakeFal> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let fal = Arc::new(FakeFal {
        base: format!("http://{addr}"),
        ..FakeFal::default()
    });

    let submit = if out_of_credit {
        post(reject_exhausted_balance)
    } else {
        post(enqueue)
    };
    let app = Router::new()
        .route(MODEL_PATH, submit)
        .route(&format!("{MODEL_PATH}/requests/{{request_id}}"), get(result))
        .route(
            &format!("{MODEL_PATH}/requests/{{request_id}}/status"),
            get(status),
        )
        .route("/storage-api/storage/upload/initiate", post(initiate_upload))
        .route("/blobs/{blob_id}", put(put_blob))
        .with_state(Arc::clone(&fal));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    fal
}

fn gateway_config(fal: &FakeFal) -> GatewayConfig {
    GatewayConfig {
        queue_url: format!("{}/queue", fal.base),
        storage_url: format!("{}/storage-api", fal.base),
        poll_interval_ms: 1,
        ..GatewayConfig::default()
    }
}

fn relay_over(fal: &FakeFal) -> TaskRelay {
    let client = FalClient::new(&gateway_config(fal), API_KEY).unwrap();
    TaskRelay::new(
        Arc::new(client),
        Arc::new(TaskRegistry::with_defaults()),
        RelayConfig::default(),
    )
}

fn text_input(prompt: &str) -> GatewayInput {
    GatewayInput {
        prompt: prompt.into(),
        duration: "8s".into(),
        aspect_ratio: "16:9".into(),
        image_url: None,
    }
}

// =========================================================================
// Queue protocol
// =========================================================================

#[tokio::test]
async fn queue_round_trip_forwards_logs() {
    let fal = spawn_fal(false).await;
    let client = FalClient::new(&gateway_config(&fal), API_KEY).unwrap();

    let (tx, mut rx) = mpsc::channel(8);
    let raw = client.subscribe(text_input("A calm lake"), tx).await.unwrap();
    assert_eq!(raw, json!({ "video": { "url": "https://x/req-1.mp4" } }));

    let mut forwarded = Vec::new();
    while let Some(payload) = rx.recv().await {
        forwarded.push(payload);
    }
    assert_eq!(forwarded, vec![json!([{ "message": "Gen 30%" }])]);

    assert_eq!(fal.polls.load(Ordering::SeqCst), 3);
    assert!(
        fal.status_queries
            .lock()
            .unwrap()
            .iter()
            .all(|q| q == "logs=1")
    );
    assert_eq!(
        fal.submitted.lock().unwrap().clone(),
        vec![json!({ "prompt": "A calm lake", "duration": "8s", "aspect_ratio": "16:9" })]
    );
    assert!(
        fal.auth
            .lock()
            .unwrap()
            .iter()
            .all(|header| header == "Key test-key")
    );
}

#[tokio::test]
async fn relay_over_fal_client_completes() {
    let fal = spawn_fal(false).await;
    let relay = relay_over(&fal);

    let record = relay.generate(JobRequest::new("A calm lake")).await.unwrap();
    assert_eq!(record.video_url, "https://x/req-1.mp4");
}

#[tokio::test]
async fn rejected_submission_keeps_status_and_detail() {
    let fal = spawn_fal(true).await;
    let client = FalClient::new(&gateway_config(&fal), API_KEY).unwrap();

    let (tx, _rx) = mpsc::channel(8);
    let err = client.subscribe(text_input("x"), tx).await.unwrap_err();
    match err {
        GatewayError::Api { status, detail, .. } => {
            assert_eq!(status, 403);
            assert_eq!(detail, Some(json!("Exhausted balance")));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fal.polls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn exhausted_balance_reaches_caller_as_balance_message() {
    let fal = spawn_fal(true).await;
    let relay = relay_over(&fal);

    let record = match relay.generate(JobRequest::new("x")).await {
        Err(RelayError::Failed(record)) => record,
        other => panic!("expected a failure record, got {other:?}"),
    };
    assert_eq!(record.kind, FailureKind::Gateway);
    assert_eq!(record.message, BALANCE_MESSAGE);
    assert_eq!(record.provider_status_code, Some(403));
    assert_eq!(record.provider_detail, Some(json!("Exhausted balance")));
}

// =========================================================================
// Storage upload
// =========================================================================

#[tokio::test]
async fn upload_initiates_then_puts_bytes() {
    let fal = spawn_fal(false).await;
    let client = FalClient::new(&gateway_config(&fal), API_KEY).unwrap();

    let url = client
        .stage_image(&ImageUpload {
            bytes: b"\x89PNG".to_vec(),
            media_type: "image/png".into(),
            file_name: "cat.png".into(),
        })
        .await
        .unwrap();

    assert_eq!(url, "https://cdn.test/blob-1.png");
    assert_eq!(
        fal.initiated.lock().unwrap().clone(),
        vec![json!({ "content_type": "image/png", "file_name": "cat.png" })]
    );
    assert_eq!(
        fal.uploads.lock().unwrap().clone(),
        vec![("image/png".to_string(), b"\x89PNG".to_vec())]
    );
}

#[tokio::test]
async fn image_job_submits_uploaded_file_url() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cat.png");
    std::fs::write(&path, b"\x89PNG").unwrap();

    let fal = spawn_fal(false).await;
    let relay = relay_over(&fal);

    relay
        .generate(JobRequest::new("a cat").with_image(ImageRef::File(path.clone())))
        .await
        .unwrap();

    let submitted = fal.submitted.lock().unwrap().clone();
    assert_eq!(submitted[0]["image_url"], "https://cdn.test/blob-1.png");
    assert_eq!(fal.uploads.lock().unwrap().len(), 1);
    assert!(path.exists());
}
