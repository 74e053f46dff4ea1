//! Common test utilities for jrpc-client integration tests
//!
//! [`MockTransport`] answers payloads with a scripted function instead of a
//! server, and keeps every payload it was handed so tests can inspect what
//! the client put on the wire.

#![allow(dead_code)]

use async_trait::async_trait;
use jrpc_client::Transport;
use jrpc_core::{Error, Result, TransportError};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

type Responder = Box<dyn Fn(&Value) -> Result<Vec<u8>> + Send + Sync>;

/// Payloads seen by a [`MockTransport`]
#[derive(Clone, Default)]
pub struct SentLog(Arc<Mutex<Vec<Value>>>);

impl SentLog {
    pub fn all(&self) -> Vec<Value> {
        self.0.lock().unwrap().clone()
    }

    pub fn last(&self) -> Value {
        self.0.lock().unwrap().last().cloned().expect("nothing was sent")
    }

    fn push(&self, value: Value) {
        self.0.lock().unwrap().push(value);
    }
}

/// Scripted in-memory transport
pub struct MockTransport {
    responder: Responder,
    descriptors: Option<Vec<u8>>,
    sent: SentLog,
}

impl MockTransport {
    /// Answer every payload with `responder`
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&Value) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            descriptors: None,
            sent: SentLog::default(),
        }
    }

    /// Answer every payload with the same JSON value
    pub fn replying(value: Value) -> Self {
        Self::new(move |_| Ok(serde_json::to_vec(&value).unwrap()))
    }

    /// Answer every payload with the same raw body
    pub fn raw(body: &'static [u8]) -> Self {
        Self::new(move |_| Ok(body.to_vec()))
    }

    /// Fail every payload with a transport error
    pub fn failing(message: &'static str) -> Self {
        Self::new(move |_| Err(Error::Transport(TransportError::message(message))))
    }

    /// Behave like a well-behaved server: echo params as result, keep ids,
    /// drop notifications
    pub fn echo() -> Self {
        Self::new(|payload| {
            let answer = match payload {
                Value::Array(items) => {
                    let responses: Vec<Value> = items.iter().filter_map(echo_one).collect();
                    if responses.is_empty() {
                        return Ok(Vec::new());
                    }
                    Value::Array(responses)
                }
                single => match echo_one(single) {
                    Some(response) => response,
                    None => return Ok(Vec::new()),
                },
            };
            Ok(serde_json::to_vec(&answer).unwrap())
        })
    }

    /// Serve `descriptors` on discovery
    pub fn with_descriptors(mut self, descriptors: Value) -> Self {
        self.descriptors = Some(serde_json::to_vec(&descriptors).unwrap());
        self
    }

    /// Serve a raw discovery body
    pub fn with_raw_descriptors(mut self, body: &'static [u8]) -> Self {
        self.descriptors = Some(body.to_vec());
        self
    }

    /// Handle on the payloads sent through this transport
    pub fn sent(&self) -> SentLog {
        self.sent.clone()
    }
}

fn echo_one(request: &Value) -> Option<Value> {
    let id = request.get("id")?.clone();
    Some(json!({
        "jsonrpc": "2.0",
        "result": request.get("params").cloned().unwrap_or(Value::Null),
        "id": id,
    }))
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, body: Vec<u8>) -> Result<Vec<u8>> {
        let payload: Value = serde_json::from_slice(&body).unwrap();
        self.sent.push(payload.clone());
        (self.responder)(&payload)
    }

    async fn describe(&self) -> Result<Vec<u8>> {
        match &self.descriptors {
            Some(body) => Ok(body.clone()),
            None => Err(Error::Transport(TransportError::message("404 - Not Found"))),
        }
    }
}

/// A JSON-RPC success response
pub fn success(result: Value, id: Value) -> Value {
    json!({"jsonrpc": "2.0", "result": result, "id": id})
}

/// A JSON-RPC error response
pub fn failure(code: i32, message: &str, data: Option<Value>, id: Value) -> Value {
    let mut error = json!({"code": code, "message": message});
    if let Some(data) = data {
        error["data"] = data;
    }
    json!({"jsonrpc": "2.0", "error": error, "id": id})
}
