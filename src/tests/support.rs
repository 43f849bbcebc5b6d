//! In-memory capabilities for tests. Nothing here touches the network.

use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{json, Value};

use crate::http::{HttpResponse, HttpTransport, TransportError};
use crate::llm::{CompletionRequest, LanguageModel, LlmError};
use crate::semantic::{Embedder, EmbeddingError};

#[derive(Clone)]
struct Route {
    status: u16,
    content_type: Option<String>,
    content_length: Option<u64>,
    body: Vec<u8>,
}

/// Routes requests by exact URL (query parameters are recorded, not matched).
/// Unknown URLs fail like an unreachable host.
#[derive(Default)]
pub struct FakeHttp {
    gets: Mutex<HashMap<String, Route>>,
    heads: Mutex<HashMap<String, Route>>,
    get_calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
    head_calls: Mutex<Vec<String>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_json(&self, url: &str, body: Value) {
        self.get_bytes(
            url,
            200,
            "application/json;charset=UTF-8",
            body.to_string().into_bytes(),
        );
    }

    pub fn get_text(&self, url: &str, status: u16, content_type: &str, body: &str) {
        self.get_bytes(url, status, content_type, body.as_bytes().to_vec());
    }

    pub fn get_bytes(&self, url: &str, status: u16, content_type: &str, body: Vec<u8>) {
        let route = Route {
            status,
            content_type: Some(content_type.to_string()),
            content_length: Some(body.len() as u64),
            body,
        };
        self.gets.lock().unwrap().insert(url.to_string(), route);
    }

    /// HEAD answering 200 `image/jpeg` with the given length.
    pub fn head_image(&self, url: &str, len: u64) {
        self.head(url, 200, Some("image/jpeg"), Some(len));
    }

    pub fn head(&self, url: &str, status: u16, content_type: Option<&str>, len: Option<u64>) {
        let route = Route {
            status,
            content_type: content_type.map(str::to_owned),
            content_length: len,
            body: Vec::new(),
        };
        self.heads.lock().unwrap().insert(url.to_string(), route);
    }

    pub fn get_calls(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.get_calls.lock().unwrap().clone()
    }

    /// GET requests whose URL ends with `endpoint`.
    pub fn get_count(&self, endpoint: &str) -> usize {
        self.get_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(url, _)| url.ends_with(endpoint))
            .count()
    }

    pub fn head_count(&self) -> usize {
        self.head_calls.lock().unwrap().len()
    }

    fn respond(route: Option<Route>, url: &str) -> Result<HttpResponse, TransportError> {
        let route =
            route.ok_or_else(|| TransportError::Request(format!("no route for {url}")))?;
        Ok(HttpResponse {
            status: route.status,
            content_type: route.content_type,
            content_length: route.content_length,
            body: Box::new(Cursor::new(route.body)),
        })
    }
}

impl HttpTransport for FakeHttp {
    fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
        _timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let params = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        self.get_calls
            .lock()
            .unwrap()
            .push((url.to_string(), params));

        let route = self.gets.lock().unwrap().get(url).cloned();
        Self::respond(route, url)
    }

    fn head(&self, url: &str, _timeout: Duration) -> Result<HttpResponse, TransportError> {
        self.head_calls.lock().unwrap().push(url.to_string());
        let route = self.heads.lock().unwrap().get(url).cloned();
        Self::respond(route, url)
    }
}

/// Area list with Seoul (1), Busan (6) and Jeju (39), in that order.
pub fn area_payload() -> Value {
    json!({ "response": {
        "header": { "resultCode": "0000", "resultMsg": "OK" },
        "body": { "items": { "item": [
            { "rnum": 1, "code": "1", "name": "서울" },
            { "rnum": 2, "code": "6", "name": "부산" },
            { "rnum": 3, "code": 39, "name": "제주도" }
        ] } }
    } })
}

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync>;

/// Scripted replies are used first, in order; after that the responder, if
/// any, answers. With neither, the call fails.
#[derive(Default)]
pub struct FakeLlm {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    responder: Option<Responder>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FakeLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responder(
        responder: impl Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Some(Box::new(responder)),
            ..Default::default()
        }
    }

    pub fn reply(&self, text: &str) {
        self.script.lock().unwrap().push_back(Ok(text.to_string()));
    }

    pub fn reply_json(&self, json: &str) {
        self.reply(json);
    }

    pub fn fail(&self) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(LlmError::Request("connection reset".to_string())));
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl LanguageModel for FakeLlm {
    fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(scripted) = self.script.lock().unwrap().pop_front() {
            return scripted;
        }
        match &self.responder {
            Some(responder) => responder(request),
            None => Err(LlmError::Request("no scripted reply".to_string())),
        }
    }
}

/// Bag-of-characters embedding: equal texts give equal vectors, texts
/// sharing no characters are orthogonal-ish.
#[derive(Default)]
pub struct FakeEmbedder {
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub const DIMENSIONS: usize = 32;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; Self::DIMENSIONS];
        for c in text.chars().filter(|c| !c.is_whitespace()) {
            v[c as usize % Self::DIMENSIONS] += 1.0;
        }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbeddingError::EmbeddingFailed("model offline".to_string()));
        }
        Ok(Self::vector(text))
    }
}
