//! Scripted inference endpoint for retry tests.
//!
//! `httpmock` answers every request the same way, while the retry tests need a sequence
//! (503, then warm-up, then success) and an exact attempt count. This server replays a script
//! one step per request and repeats the last step once the script runs out.
#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::Value;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;
use tokio::{net::TcpListener, task::JoinHandle};

/// One scripted reply.
#[derive(Clone, Debug)]
pub enum Step {
    /// Respond with a status and JSON body.
    Json(u16, Value),
    /// Respond with a status and plain-text body.
    Text(u16, &'static str),
    /// Sleep, then respond with 200 and the JSON body.
    Delayed(Duration, Value),
}

struct Script {
    steps: Vec<Step>,
    hits: AtomicUsize,
    bodies: Mutex<Vec<Value>>,
    auth: Mutex<Vec<Option<String>>>,
}

/// Running scripted endpoint; stops when dropped.
pub struct ScriptedEndpoint {
    /// Endpoint URL to hand to the client.
    pub url: String,
    script: Arc<Script>,
    handle: JoinHandle<()>,
}

impl ScriptedEndpoint {
    /// Bind to an ephemeral local port and start replaying `steps`.
    pub async fn start(steps: Vec<Step>) -> Self {
        assert!(!steps.is_empty(), "script needs at least one step");
        let script = Arc::new(Script {
            steps,
            hits: AtomicUsize::new(0),
            bodies: Mutex::new(Vec::new()),
            auth: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .route("/models/test", post(reply))
            .with_state(script.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            url: format!("http://{address}/models/test"),
            script,
            handle,
        }
    }

    /// Requests received so far.
    pub fn hits(&self) -> usize {
        self.script.hits.load(Ordering::SeqCst)
    }

    /// JSON bodies received so far.
    pub fn bodies(&self) -> Vec<Value> {
        self.script.bodies.lock().unwrap().clone()
    }

    /// Authorization headers received so far.
    pub fn authorization_headers(&self) -> Vec<Option<String>> {
        self.script.auth.lock().unwrap().clone()
    }
}

impl Drop for ScriptedEndpoint {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn reply(
    State(script): State<Arc<Script>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let index = script.hits.fetch_add(1, Ordering::SeqCst);
    script.bodies.lock().unwrap().push(body);
    script.auth.lock().unwrap().push(
        headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    );
    let step = script
        .steps
        .get(index)
        .or_else(|| script.steps.last())
        .cloned()
        .expect("non-empty script");

    match step {
        Step::Json(status, value) => (status_code(status), Json(value)).into_response(),
        Step::Text(status, text) => (status_code(status), text).into_response(),
        Step::Delayed(delay, value) => {
            tokio::time::sleep(delay).await;
            (StatusCode::OK, Json(value)).into_response()
        }
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).expect("valid status")
}

/// URL on localhost where nothing is listening.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{address}/models/test")
}
