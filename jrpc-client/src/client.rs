//! JSON-RPC client engine
//!
//! This module provides [`JrpcClient`], which turns calls into request
//! payloads, hands them to a [`Transport`] and validates what comes back.
//!
//! # Response Validation
//!
//! For a call, the response body must be a JSON object with
//! `"jsonrpc": "2.0"` and either:
//!
//! - an `error` member, which becomes a [`ServerError`] (a non-null id that
//!   differs from the request id is reported as "Mismatched IDs" instead)
//! - a `result` member with the request id, which is returned
//!
//! An empty body, a non-object body or a body with neither member is an
//! "Invalid response". A body that is not JSON is a "Response parse error".
//! Transport failures are returned untouched.
//!
//! # Discovery
//!
//! A client built with [`ClientBuilder::discover`](crate::ClientBuilder::discover)
//! fetches the server's method descriptors once. Each discovered method is
//! available as a [`RemoteMethod`] through [`JrpcClient::method`]. The names
//! `call`, `notify` and `batch` are never exposed that way. When discovery
//! fails, the client simply has no discovered methods.
//!
//! # Cloning
//!
//! `JrpcClient` is cheaply cloneable using `Arc` internally. All clones
//! share the transport and the id sequence.

use crate::{BatchRequest, ClientMetrics, IdGenerator, Transport};
use jrpc_core::{
    codec, ClientError, Error, Id, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    MethodDescriptor, Params, Result, ServerError, JSONRPC_VERSION,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Method names that discovery never exposes
pub const RESERVED_NAMES: [&str; 3] = ["call", "notify", "batch"];

struct ClientInner {
    transport: Arc<dyn Transport>,
    ids: IdGenerator,
    metrics: Option<Arc<ClientMetrics>>,
    methods: Vec<MethodDescriptor>,
}

/// JSON-RPC 2.0 client
#[derive(Clone)]
pub struct JrpcClient {
    inner: Arc<ClientInner>,
}

impl JrpcClient {
    /// Bare client over `transport`, without discovery or metrics
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::from_parts(Arc::new(transport), None, Vec::new())
    }

    /// Start configuring an HTTP client for `url`
    pub fn builder(url: impl Into<String>) -> crate::ClientBuilder {
        crate::ClientBuilder::new(url)
    }

    pub(crate) fn from_parts(
        transport: Arc<dyn Transport>,
        metrics: Option<Arc<ClientMetrics>>,
        methods: Vec<MethodDescriptor>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                ids: IdGenerator::new(),
                metrics,
                methods,
            }),
        }
    }

    /// Call `method` and return its result
    ///
    /// `params` is anything serializable: a tuple, `Vec` or JSON array for
    /// positional params, a struct, map or JSON object for named params, `()`
    /// for none. A lone scalar is sent as a one-element array.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # async fn example(client: &jrpc_client::JrpcClient) -> jrpc_core::Result<()> {
    /// let total = client.call("sum", (1, 2, 3)).await?;
    /// assert_eq!(total, serde_json::json!(6));
    /// # Ok(())
    /// # }
    /// ```
    #[tracing::instrument(skip(self, params), fields(method = %method))]
    pub async fn call<P>(&self, method: &str, params: P) -> Result<Value>
    where
        P: Serialize,
    {
        let id = self.inner.ids.next_id();
        let start = Instant::now();

        let outcome = self.exchange(method, params, &id).await;

        let elapsed = start.elapsed().as_secs_f64();
        match &outcome {
            Ok(_) => tracing::debug!(id = %id, "Call succeeded"),
            Err(e) => tracing::debug!(id = %id, error = %e, "Call failed"),
        }
        if let Some(metrics) = &self.inner.metrics {
            let status = if outcome.is_ok() { "success" } else { "error" };
            metrics.record_request(method, status, elapsed);
            if let Err(e) = &outcome {
                metrics.record_error(e.symbol().unwrap_or("transport"));
            }
        }
        outcome
    }

    /// Call `method` and deserialize its result
    pub async fn call_as<P, R>(&self, method: &str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let value = self.call(method, params).await?;
        serde_json::from_value(value).map_err(Error::from)
    }

    async fn exchange<P: Serialize>(&self, method: &str, params: P, id: &Id) -> Result<Value> {
        let request = JsonRpcRequest::new(method, to_params(params)?, id.clone());
        let body = self.inner.transport.send(codec::encode(&request)?).await?;
        parse_call_response(&body, id)
    }

    /// Send a notification
    ///
    /// Succeeds on an empty response body. A body carrying an `error` member
    /// fails with that server error; any other body is an "Invalid response".
    #[tracing::instrument(skip(self, params), fields(method = %method))]
    pub async fn notify<P>(&self, method: &str, params: P) -> Result<()>
    where
        P: Serialize,
    {
        let notification = JsonRpcNotification::new(method, to_params(params)?);
        let body = self
            .inner
            .transport
            .send(codec::encode(&notification)?)
            .await?;

        if let Some(metrics) = &self.inner.metrics {
            metrics.record_notification(method);
        }
        parse_notify_response(&body)
    }

    /// Start a batch
    ///
    /// Ids of the batch's calls come from this client's sequence.
    pub fn batch(&self) -> BatchRequest {
        BatchRequest::new(self.clone())
    }

    /// Descriptors of the discovered methods
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.inner.methods
    }

    /// Discovered method called `name`
    pub fn method(&self, name: &str) -> Option<RemoteMethod> {
        self.inner
            .methods
            .iter()
            .find(|descriptor| descriptor.name == name)
            .map(|descriptor| RemoteMethod {
                client: self.clone(),
                descriptor: descriptor.clone(),
            })
    }

    pub(crate) fn next_id(&self) -> Id {
        self.inner.ids.next_id()
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.inner.transport.as_ref()
    }

    pub(crate) fn metrics(&self) -> Option<&ClientMetrics> {
        self.inner.metrics.as_deref()
    }
}

impl std::fmt::Debug for JrpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JrpcClient")
            .field("id_prefix", &self.inner.ids.prefix())
            .field("methods", &self.inner.methods)
            .finish()
    }
}

/// A discovered method, callable by name
#[derive(Debug, Clone)]
pub struct RemoteMethod {
    client: JrpcClient,
    descriptor: MethodDescriptor,
}

impl RemoteMethod {
    /// Method name
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Declared parameter names, rest parameters as `"...name"`
    pub fn params(&self) -> &[String] {
        &self.descriptor.params
    }

    /// Forward to [`JrpcClient::call`]
    pub async fn call<P: Serialize>(&self, params: P) -> Result<Value> {
        self.client.call(&self.descriptor.name, params).await
    }

    /// Forward to [`JrpcClient::call_as`]
    pub async fn call_as<P: Serialize, R: DeserializeOwned>(&self, params: P) -> Result<R> {
        self.client.call_as(&self.descriptor.name, params).await
    }
}

/// Fetch descriptors, dropping reserved names; failures give an empty list
pub(crate) async fn discover_methods(transport: &dyn Transport) -> Vec<MethodDescriptor> {
    let fetched = match transport.describe().await {
        Ok(body) => serde_json::from_slice::<Vec<MethodDescriptor>>(&body).map_err(Error::from),
        Err(e) => Err(e),
    };

    match fetched {
        Ok(descriptors) => {
            let methods: Vec<_> = descriptors
                .into_iter()
                .filter(|d| !RESERVED_NAMES.contains(&d.name.as_str()))
                .collect();
            tracing::debug!(count = methods.len(), "Discovered methods");
            methods
        }
        Err(e) => {
            tracing::debug!(error = %e, "Method discovery failed, continuing without");
            Vec::new()
        }
    }
}

pub(crate) fn to_params<P: Serialize>(params: P) -> Result<Params> {
    Ok(Params::from(serde_json::to_value(params)?))
}

/// Read a response object; `None` if it is not a well-formed 2.0 response
pub(crate) fn read_response(value: Value) -> Option<JsonRpcResponse> {
    if !value.is_object() {
        return None;
    }
    let response: JsonRpcResponse = serde_json::from_value(value).ok()?;
    (response.jsonrpc == JSONRPC_VERSION).then_some(response)
}

fn parse_call_response(body: &[u8], id: &Id) -> Result<Value> {
    let value = codec::decode_response_body(body)?.ok_or_else(ClientError::invalid_response)?;
    let response = read_response(value).ok_or_else(ClientError::invalid_response)?;

    if let Some(error) = response.error {
        if !response.id.is_null() && response.id != *id {
            return Err(ClientError::mismatched_ids(id, &response.id).into());
        }
        return Err(ServerError::from_error_data(error, response.id).into());
    }

    match response.result {
        Some(_) if response.id != *id => {
            Err(ClientError::mismatched_ids(id, &response.id).into())
        }
        Some(result) => Ok(result),
        None => Err(ClientError::invalid_response().into()),
    }
}

fn parse_notify_response(body: &[u8]) -> Result<()> {
    let value = match codec::decode_response_body(body)? {
        None => return Ok(()),
        Some(value) => value,
    };

    match read_response(value) {
        Some(JsonRpcResponse {
            error: Some(error),
            id,
            ..
        }) => Err(ServerError::from_error_data(error, id).into()),
        _ => Err(ClientError::invalid_response().into()),
    }
}
