use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::{GARBAGE_API_KEY, GOOD_API_KEY, GOOD_QUERY, GOOD_TOKEN};

const PARSE_ERROR: &str = r#"{"code":3,"message":"invalid query request"}"#;

#[derive(Clone)]
struct MockState {
    response: Arc<String>,
    queries: Arc<Mutex<Vec<Value>>>,
}

/// Stand-in for both the IAM token endpoint and the logs query endpoint.
/// Every successful query is answered with the same canned stream.
pub struct MockServer {
    addr: SocketAddr,
    queries: Arc<Mutex<Vec<Value>>>,
    task: JoinHandle<()>,
}

impl MockServer {
    pub async fn start(response: impl Into<String>) -> anyhow::Result<Self> {
        let queries = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            response: Arc::new(response.into()),
            queries: queries.clone(),
        };
        let app = Router::new()
            .route("/v1/query", post(query))
            .route("/identity/token", post(token))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            queries,
            task,
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Bodies of every query request that passed authentication.
    pub fn queries(&self) -> Vec<Value> {
        self.queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn query(State(state): State<MockState>, headers: HeaderMap, body: Bytes) -> Response {
    let bearer = format!("Bearer {GOOD_TOKEN}");
    let header_str = |name: header::HeaderName| headers.get(name).and_then(|v| v.to_str().ok());

    if header_str(header::AUTHORIZATION) != Some(bearer.as_str()) {
        return (StatusCode::FORBIDDEN, "Access denied!").into_response();
    }
    if !header_str(header::CONTENT_TYPE).is_some_and(|v| v.starts_with("application/json")) {
        return (StatusCode::BAD_REQUEST, PARSE_ERROR).into_response();
    }

    let Ok(request) = serde_json::from_slice::<Value>(&body) else {
        return (StatusCode::BAD_REQUEST, PARSE_ERROR).into_response();
    };
    if let Ok(mut queries) = state.queries.lock() {
        queries.push(request.clone());
    }
    if request.get("query").and_then(Value::as_str) != Some(GOOD_QUERY) {
        return (StatusCode::BAD_REQUEST, PARSE_ERROR).into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/event-stream")],
        state.response.as_str().to_string(),
    )
        .into_response()
}

async fn token(Form(form): Form<HashMap<String, String>>) -> Response {
    let field = |name: &str| form.get(name).map(String::as_str).unwrap_or_default();

    if field("grant_type") != "urn:ibm:params:oauth:grant-type:apikey" {
        return iam_error(
            StatusCode::BAD_REQUEST,
            "BXNIM0109E",
            "Property missing or empty.",
            "Property 'grant_type' either missing or empty.",
        );
    }

    match field("apikey") {
        GOOD_API_KEY => Json(json!({
            "access_token": GOOD_TOKEN,
            "refresh_token": "not_supported",
            "token_type": "Bearer",
            "expires_in": 3600,
            "expiration": 1735159110,
            "scope": "ibm openid"
        }))
        .into_response(),
        GARBAGE_API_KEY => {
            (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response()
        }
        _ => iam_error(
            StatusCode::BAD_REQUEST,
            "BXNIM0415E",
            "Provided API key could not be found.",
            "",
        ),
    }
}

fn iam_error(status: StatusCode, code: &str, message: &str, details: &str) -> Response {
    (
        status,
        Json(json!({
            "errorCode": code,
            "errorMessage": message,
            "errorDetails": details
        })),
    )
        .into_response()
}
