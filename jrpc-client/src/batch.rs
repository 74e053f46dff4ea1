//! Batch request building and response handling
//!
//! JSON-RPC 2.0 allows sending several calls and notifications in one
//! array. A [`BatchRequest`] is started from a client with
//! [`JrpcClient::batch`]; every call reserves its id from the client's
//! sequence at the moment it is added, so ids follow submission order.
//!
//! # Response Mapping
//!
//! [`BatchRequest::execute`] sends the array and maps the answer:
//!
//! - an empty body gives an empty [`BatchResponse`] (all notifications)
//! - an array gives one [`BatchItem`] per element, in the order the server
//!   sent them. An element that is not a well-formed 2.0 response is an
//!   "Invalid response", one with `error` is a server error, anything else
//!   carries its `result`
//! - a single object with `error` fails the whole batch with that error
//! - anything else is an "Invalid response"
//!
//! # Examples
//!
//! ```rust,no_run
//! use jrpc_client::JrpcClient;
//!
//! # async fn example(client: &JrpcClient) -> jrpc_core::Result<()> {
//! let mut batch = client.batch();
//! let sum = batch.add_call("sum", (1, 2, 3));
//! batch.add_notification("log", ("hello",));
//! let mirror = batch.add_call("mirror", serde_json::json!({"a": 1}));
//!
//! let responses = batch.execute().await?;
//! let total: i64 = responses.get_as(&sum)?;
//! assert!(responses.get(&mirror).is_some());
//! # Ok(())
//! # }
//! ```

use crate::client::{read_response, to_params};
use crate::JrpcClient;
use jrpc_core::{
    codec, ClientError, Error, Id, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, Result,
    ServerError,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum BatchEntry {
    Call(JsonRpcRequest),
    Notify(JsonRpcNotification),
}

/// Builder for a batch of calls and notifications
#[derive(Debug)]
pub struct BatchRequest {
    client: JrpcClient,
    entries: Vec<BatchEntry>,
    ids: Vec<Id>,
    error: Option<Error>,
}

impl BatchRequest {
    pub(crate) fn new(client: JrpcClient) -> Self {
        Self {
            client,
            entries: Vec::new(),
            ids: Vec::new(),
            error: None,
        }
    }

    /// Add a call, chainable
    pub fn call<P: Serialize>(mut self, method: impl Into<String>, params: P) -> Self {
        self.add_call(method, params);
        self
    }

    /// Add a notification, chainable
    pub fn notify<P: Serialize>(mut self, method: impl Into<String>, params: P) -> Self {
        self.add_notification(method, params);
        self
    }

    /// Add a call and return the id reserved for it
    ///
    /// If `params` fails to serialize, the error is reported by
    /// [`execute`](Self::execute).
    pub fn add_call<P: Serialize>(&mut self, method: impl Into<String>, params: P) -> Id {
        let id = self.client.next_id();
        match to_params(params) {
            Ok(params) => {
                self.entries
                    .push(BatchEntry::Call(JsonRpcRequest::new(method, params, id.clone())));
                self.ids.push(id.clone());
            }
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        id
    }

    /// Add a notification
    pub fn add_notification<P: Serialize>(&mut self, method: impl Into<String>, params: P) {
        match to_params(params) {
            Ok(params) => self
                .entries
                .push(BatchEntry::Notify(JsonRpcNotification::new(method, params))),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
    }

    /// Ids of the calls added so far, in submission order
    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    /// Number of entries (calls and notifications)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No entry was added
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Send the batch and map the response
    #[tracing::instrument(skip(self), fields(batch_size = self.entries.len()))]
    pub async fn execute(self) -> Result<BatchResponse> {
        if let Some(e) = self.error {
            return Err(e);
        }
        if let Some(metrics) = self.client.metrics() {
            metrics.record_batch(self.entries.len() as u64);
        }

        let body = self
            .client
            .transport()
            .send(codec::encode(&self.entries)?)
            .await?;
        let response = parse_batch_response(&body)?;

        tracing::debug!(responses = response.len(), "Batch completed");
        Ok(response)
    }
}

/// One mapped element of a batch response
#[derive(Debug, Clone)]
pub struct BatchItem {
    /// Id carried by the element, `Null` when absent or unreadable
    pub id: Id,
    /// The `result`, or the error the element stands for
    pub outcome: Result<Value>,
}

impl BatchItem {
    fn from_raw(raw: Value) -> Self {
        let id = raw.get("id").and_then(Id::from_value).unwrap_or_default();

        let outcome = match read_response(raw) {
            Some(JsonRpcResponse {
                error: Some(error),
                id,
                ..
            }) => Err(ServerError::from_error_data(error, id).into()),
            Some(JsonRpcResponse {
                result: Some(result),
                ..
            }) => Ok(result),
            _ => Err(ClientError::invalid_response().into()),
        };

        Self { id, outcome }
    }
}

/// Mapped batch response, in the order the server answered
#[derive(Debug, Clone, Default)]
pub struct BatchResponse {
    items: Vec<BatchItem>,
}

impl BatchResponse {
    /// All items
    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    /// Outcome for the call with `id`
    pub fn get(&self, id: &Id) -> Option<&Result<Value>> {
        self.items
            .iter()
            .find(|item| &item.id == id)
            .map(|item| &item.outcome)
    }

    /// Deserialize the result of the call with `id`
    pub fn get_as<R: DeserializeOwned>(&self, id: &Id) -> Result<R> {
        match self.get(id) {
            Some(Ok(value)) => serde_json::from_value(value.clone()).map_err(Error::from),
            Some(Err(e)) => Err(e.clone()),
            None => Err(Error::InvalidArgument(format!("No response for id {}", id))),
        }
    }

    /// Outcomes in response order
    pub fn into_results(self) -> Vec<Result<Value>> {
        self.items.into_iter().map(|item| item.outcome).collect()
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// No items (the batch held only notifications)
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl IntoIterator for BatchResponse {
    type Item = BatchItem;
    type IntoIter = std::vec::IntoIter<BatchItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

fn parse_batch_response(body: &[u8]) -> Result<BatchResponse> {
    let value = match codec::decode_response_body(body)? {
        None => return Ok(BatchResponse::default()),
        Some(value) => value,
    };

    match value {
        Value::Array(raw) => Ok(BatchResponse {
            items: raw.into_iter().map(BatchItem::from_raw).collect(),
        }),
        other => match read_response(other) {
            Some(JsonRpcResponse {
                error: Some(error),
                id,
                ..
            }) => Err(ServerError::from_error_data(error, id).into()),
            _ => Err(ClientError::invalid_response().into()),
        },
    }
}
