//! Shared test fixtures
//!
//! - [`MockBackend`]: an axum server on an ephemeral port that records every
//!   request and answers with scripted envelopes
//! - [`ScriptedSource`]: an in-memory [`RecordSource`] whose list responses
//!   can be held back to force out-of-order completion

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use melodex_common::envelope::PageMeta;
use melodex_common::{Error, Payload, Record, Result};
use melodex_console::client::ProgressFn;
use melodex_console::form::EditForm;
use melodex_console::source::{ListQuery, RecordSource, Review};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

// ----------------------------------------------------------------------
// Mock HTTP backend
// ----------------------------------------------------------------------

/// One request as the backend saw it
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub authorization: Option<String>,
    pub body: Vec<u8>,
}

impl Captured {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn body_json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Clone, Default)]
struct MockState {
    routes: Arc<Mutex<HashMap<String, (StatusCode, Value)>>>,
    requests: Arc<Mutex<Vec<Captured>>>,
}

/// Running mock backend; the server task stops when the test runtime ends
pub struct MockBackend {
    pub base_url: String,
    state: MockState,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new().fallback(respond).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Answer `METHOD path` with a 200 and the given JSON body
    pub fn on(&self, method: &str, path: &str, body: Value) {
        self.on_status(method, path, StatusCode::OK, body);
    }

    pub fn on_status(&self, method: &str, path: &str, status: StatusCode, body: Value) {
        self.state
            .routes
            .lock()
            .unwrap()
            .insert(format!("{} {}", method, path), (status, body));
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<Captured> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }
}

async fn respond(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.requests.lock().unwrap().push(Captured {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        content_type: header("content-type"),
        authorization: header("authorization"),
        body: body.to_vec(),
    });

    let key = format!("{} {}", method, uri.path());
    let scripted = state.routes.lock().unwrap().get(&key).cloned();
    match scripted {
        Some((status, body)) => (status, Json(body)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"code": 404, "msg": format!("no route for {}", key)})),
        )
            .into_response(),
    }
}

/// `{code: "200", data}` envelope
pub fn ok(data: Value) -> Value {
    json!({"code": "200", "data": data})
}

// ----------------------------------------------------------------------
// Scripted in-memory source
// ----------------------------------------------------------------------

pub fn record(value: Value) -> Record {
    Record::from_value(value).unwrap()
}

/// `count` records with ids `1..=count` and names `item-N`
pub fn numbered(count: i64) -> Vec<Record> {
    (1..=count)
        .map(|id| record(json!({"id": id, "name": format!("item-{}", id), "status": id % 2})))
        .collect()
}

struct Held {
    gate: oneshot::Receiver<()>,
    result: Result<Payload>,
}

#[derive(Default)]
pub struct ScriptedSource {
    records: Mutex<Vec<Record>>,
    held: Mutex<VecDeque<Held>>,
    fail_next: Mutex<Option<Error>>,
    pub queries: Mutex<Vec<ListQuery>>,
    pub deleted: Mutex<Vec<Vec<i64>>>,
    pub saved: Mutex<Vec<EditForm>>,
    pub reviews: Mutex<Vec<(i64, Review)>>,
}

impl ScriptedSource {
    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    pub fn set_records(&self, records: Vec<Record>) {
        *self.records.lock().unwrap() = records;
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// The next list call waits for the returned sender, then yields `result`
    pub fn hold_next_list(&self, result: Result<Payload>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.held
            .lock()
            .unwrap()
            .push_back(Held { gate: rx, result });
        tx
    }

    /// The next call of any kind fails with `error`
    pub fn fail_next(&self, error: Error) {
        *self.fail_next.lock().unwrap() = Some(error);
    }

    pub fn list_calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    fn take_failure(&self) -> Result<()> {
        match self.fail_next.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn current_page(&self, query: &ListQuery) -> Payload {
        let records = self.records.lock().unwrap().clone();
        match query.page {
            Some((page_num, page_size)) => {
                let total = records.len() as u64;
                let pages = total.div_ceil(page_size);
                let start = ((page_num - 1) * page_size) as usize;
                let items = records
                    .into_iter()
                    .skip(start)
                    .take(page_size as usize)
                    .collect();
                Payload {
                    items,
                    page: Some(PageMeta {
                        page_num,
                        page_size: Some(page_size),
                        pages,
                        total: Some(total),
                        has_previous: page_num > 1,
                        has_next: page_num < pages,
                    }),
                }
            }
            None => Payload {
                items: records,
                page: None,
            },
        }
    }
}

#[async_trait]
impl RecordSource for ScriptedSource {
    async fn list(&self, query: &ListQuery) -> Result<Payload> {
        self.queries.lock().unwrap().push(query.clone());
        let held = self.held.lock().unwrap().pop_front();
        if let Some(held) = held {
            let _ = held.gate.await;
            return held.result;
        }
        self.take_failure()?;
        Ok(self.current_page(query))
    }

    async fn get(&self, id: i64) -> Result<Record> {
        self.take_failure()?;
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id() == Some(id))
            .cloned()
            .ok_or_else(|| Error::Application {
                code: "404".to_string(),
                message: Some("not found".to_string()),
            })
    }

    async fn save(&self, form: &EditForm) -> Result<()> {
        self.take_failure()?;
        self.saved.lock().unwrap().push(form.clone());
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.delete_many(&[id]).await
    }

    async fn delete_many(&self, ids: &[i64]) -> Result<()> {
        self.take_failure()?;
        self.records
            .lock()
            .unwrap()
            .retain(|r| !r.id().map(|id| ids.contains(&id)).unwrap_or(false));
        self.deleted.lock().unwrap().push(ids.to_vec());
        Ok(())
    }

    async fn review(&self, id: i64, review: Review) -> Result<()> {
        self.take_failure()?;
        self.reviews.lock().unwrap().push((id, review));
        Ok(())
    }

    async fn upload(&self, _file: &Path, progress: ProgressFn) -> Result<()> {
        self.take_failure()?;
        progress(50, 100);
        progress(100, 100);
        Ok(())
    }

    fn media_url(&self, path: &str) -> String {
        format!("http://media.test{}", path)
    }
}
