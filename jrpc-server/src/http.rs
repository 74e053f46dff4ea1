//! HTTP binding
//!
//! Serves one [`Dispatcher`] on one path with `warp`:
//!
//! - `GET <endpoint>` answers with the method descriptor array
//! - `POST <endpoint>` dispatches the body; the response payload is sent as
//!   `application/json`, or an empty `200 OK` body when every item was a
//!   notification
//!
//! Bodies larger than the configured limit are refused with `413`, and other
//! paths or verbs get warp's default `404` / `405` rejections. The limit is
//! checked against `Content-Length` when the header is present, and again
//! while the body streams in, so chunked uploads are accepted too.

use crate::dispatcher::Dispatcher;
use bytes::{Buf, BufMut, BytesMut};
use futures::{Stream, TryStreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use warp::filters::path::FullPath;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

/// Normalize an endpoint path: leading slash, no trailing slash (except `/`)
pub fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_matches('/');
    format!("/{}", trimmed)
}

/// Build the warp filter serving `dispatcher` on `endpoint`
pub fn routes(
    dispatcher: Dispatcher,
    endpoint: &str,
    max_body_bytes: u64,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let endpoint: Arc<str> = Arc::from(normalize_endpoint(endpoint));

    let on_endpoint = warp::path::full()
        .and_then(move |path: FullPath| {
            let endpoint = Arc::clone(&endpoint);
            async move {
                if path.as_str().trim_end_matches('/') == endpoint.trim_end_matches('/') {
                    Ok(())
                } else {
                    Err(warp::reject::not_found())
                }
            }
        })
        .untuple_one();

    let describe = warp::get()
        .and(on_endpoint.clone())
        .and(with_dispatcher(dispatcher.clone()))
        .map(|dispatcher: Dispatcher| {
            if let Some(metrics) = dispatcher.metrics() {
                metrics.record_http("GET");
            }
            tracing::debug!(methods = dispatcher.describe().len(), "Serving method descriptors");
            warp::reply::json(&dispatcher.describe()).into_response()
        });

    let call = warp::post()
        .and(on_endpoint)
        .and(warp::header::optional::<u64>("content-length"))
        .and(warp::body::stream())
        .and(with_dispatcher(dispatcher))
        .then(move |length: Option<u64>, body, dispatcher: Dispatcher| async move {
            if let Some(metrics) = dispatcher.metrics() {
                metrics.record_http("POST");
            }
            if length.is_some_and(|length| length > max_body_bytes) {
                return too_large(max_body_bytes);
            }
            let body = match read_body(body, max_body_bytes).await {
                Ok(body) => body,
                Err(BodyError::TooLarge) => return too_large(max_body_bytes),
                Err(BodyError::Read(e)) => {
                    tracing::debug!(error = %e, "Failed to read request body");
                    return StatusCode::BAD_REQUEST.into_response();
                }
            };
            match dispatcher.dispatch(&body).await {
                Some(response) => warp::reply::json(&response).into_response(),
                None => warp::reply().into_response(),
            }
        });

    describe
        .or(call)
        .unify()
        .with(warp::trace::named("jrpc"))
}

enum BodyError {
    TooLarge,
    Read(warp::Error),
}

/// Collect a request body, giving up once it exceeds `limit` bytes
async fn read_body<S, B>(body: S, limit: u64) -> Result<BytesMut, BodyError>
where
    S: Stream<Item = Result<B, warp::Error>>,
    B: Buf,
{
    let mut body = Box::pin(body);
    let mut collected = BytesMut::new();
    while let Some(chunk) = body.try_next().await.map_err(BodyError::Read)? {
        if (collected.len() + chunk.remaining()) as u64 > limit {
            return Err(BodyError::TooLarge);
        }
        collected.put(chunk);
    }
    Ok(collected)
}

fn too_large(limit: u64) -> warp::reply::Response {
    tracing::debug!(limit, "Request body over the size limit");
    StatusCode::PAYLOAD_TOO_LARGE.into_response()
}

fn with_dispatcher(
    dispatcher: Dispatcher,
) -> impl Filter<Extract = (Dispatcher,), Error = Infallible> + Clone {
    warp::any().map(move || dispatcher.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::from_fn;
    use crate::registry::MethodRegistry;
    use serde_json::{json, Value};

    fn dispatcher() -> Dispatcher {
        let mut registry = MethodRegistry::new();
        registry
            .add(
                crate::MethodDefinition::new(
                    "echo",
                    from_fn(|p| async move { Ok(p.into_value()) }),
                )
                .param("value"),
            )
            .unwrap();
        Dispatcher::new(registry)
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint(""), "/");
        assert_eq!(normalize_endpoint("/"), "/");
        assert_eq!(normalize_endpoint("rpc"), "/rpc");
        assert_eq!(normalize_endpoint("/api/rpc/"), "/api/rpc");
    }

    #[tokio::test]
    async fn test_get_descriptors() {
        let filter = routes(dispatcher(), "/rpc", 1024);
        let response = warp::test::request()
            .method("GET")
            .path("/rpc")
            .reply(&filter)
            .await;

        assert_eq!(response.status(), 200);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body, json!([{"name": "echo", "params": ["value"]}]));
    }

    #[tokio::test]
    async fn test_post_call() {
        let filter = routes(dispatcher(), "/rpc", 1024);
        let response = warp::test::request()
            .method("POST")
            .path("/rpc")
            .header("content-type", "application/json")
            .body(r#"{"jsonrpc":"2.0","method":"echo","params":[1],"id":1}"#)
            .reply(&filter)
            .await;

        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers()["content-type"],
            "application/json"
        );
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body, json!({"jsonrpc": "2.0", "result": [1], "id": 1}));
    }

    #[tokio::test]
    async fn test_post_notification_empty_body() {
        let filter = routes(dispatcher(), "/", 1024);
        let response = warp::test::request()
            .method("POST")
            .path("/")
            .body(r#"{"jsonrpc":"2.0","method":"echo"}"#)
            .reply(&filter)
            .await;

        assert_eq!(response.status(), 200);
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn test_other_path_not_found() {
        let filter = routes(dispatcher(), "/rpc", 1024);
        let response = warp::test::request()
            .method("POST")
            .path("/other")
            .body("{}")
            .reply(&filter)
            .await;

        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_body_limit() {
        let filter = routes(dispatcher(), "/rpc", 8);
        let response = warp::test::request()
            .method("POST")
            .path("/rpc")
            .body(r#"{"jsonrpc":"2.0","method":"echo","id":1}"#)
            .reply(&filter)
            .await;

        assert_eq!(response.status(), 413);
    }
}
