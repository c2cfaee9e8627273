#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::sync::Notify;
use tower::ServiceExt;

use logrelay_core::{
    DeliveryError, LogEntry, LogFilter, LogId, MemoryCheckpointStore, SourceError,
};
use logrelay_events::{Deliverer, DeliveryMode, DigestSchedule, TracingReporter, WebhookSink};
use logrelay_pipeline::{Orchestrator, RunSettings};
use logrelay_source::{LogReader, LogSource};
use logrelay_worker::{router, AppState, Relay};

pub fn entry(id: u32) -> LogEntry {
    LogEntry::try_from(json!({ "_id": format!("{id:04}"), "type": "s" })).unwrap()
}

/// Serves a fixed log stream. With a gate installed, every read announces
/// itself on `entered` and then waits for `release`.
#[derive(Default)]
pub struct FakeReader {
    pub logs: Vec<LogEntry>,
    pub reads: AtomicUsize,
    pub fail: bool,
    pub gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

#[async_trait]
impl LogReader for FakeReader {
    async fn read_page(
        &self,
        from: Option<&LogId>,
        take: usize,
    ) -> Result<Vec<LogEntry>, SourceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        if self.fail {
            return Err(SourceError::Status {
                from: from.cloned(),
                status: 503,
                body: "maintenance".into(),
            });
        }
        Ok(self
            .logs
            .iter()
            .filter(|e| from.map_or(true, |cursor| e.id() > cursor))
            .take(take)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct FakeSink {
    pub received: Mutex<Vec<Value>>,
}

#[async_trait]
impl WebhookSink for FakeSink {
    async fn send(&self, payload: &Value) -> Result<(), DeliveryError> {
        self.received.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub relay: Arc<Relay>,
    pub reader: Arc<FakeReader>,
    pub sink: Arc<FakeSink>,
    pub store: Arc<MemoryCheckpointStore>,
}

impl TestApp {
    pub fn router(&self) -> Router {
        router(AppState {
            relay: Arc::clone(&self.relay),
        })
    }
}

/// Relay over in-memory collaborators, mirroring the wiring in `app.rs`.
pub fn build_test_app(reader: FakeReader) -> TestApp {
    let reader = Arc::new(reader);
    let sink = Arc::new(FakeSink::default());
    let store = Arc::new(MemoryCheckpointStore::default());

    let orchestrator = Orchestrator::new(
        LogSource::new(reader.clone()),
        LogFilter::default(),
        Deliverer::new(sink.clone(), DeliveryMode::FanOut { concurrency: 2 }),
        store.clone(),
        Arc::new(TracingReporter),
        RunSettings {
            digest: DigestSchedule::new(23),
            ..RunSettings::default()
        },
    );

    TestApp {
        relay: Arc::new(Relay::new(orchestrator)),
        reader,
        sink,
        store,
    }
}

pub async fn send(app: Router, method: Method, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
