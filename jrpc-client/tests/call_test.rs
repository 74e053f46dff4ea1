//! Call and notification integration tests
//!
//! Wire shape of outgoing requests, id correlation, and every way a
//! response can be rejected.

mod common;

use common::{failure, success, MockTransport};
use jrpc_client::JrpcClient;
use jrpc_core::{ClientErrorKind, Error, Id, ServerErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Point {
    x: i64,
    y: i64,
}

fn client_with(transport: MockTransport) -> (JrpcClient, common::SentLog) {
    let sent = transport.sent();
    (JrpcClient::new(transport), sent)
}

#[tokio::test]
async fn test_call_wire_shape_and_ids() {
    let (client, sent) = client_with(MockTransport::echo());

    let result = client.call("mirror", (1, "two", [3])).await.unwrap();
    assert_eq!(result, json!([1, "two", [3]]));

    let request = sent.last();
    assert_eq!(request["jsonrpc"], "2.0");
    assert_eq!(request["method"], "mirror");
    assert_eq!(request["params"], json!([1, "two", [3]]));

    let id = request["id"].as_str().unwrap().to_string();
    let (prefix, counter) = id.rsplit_once('-').unwrap();
    assert_eq!(prefix.len(), 20);
    assert_eq!(counter, "1");

    client.call("mirror", ()).await.unwrap();
    assert_eq!(sent.last()["id"], format!("{}-2", prefix));
    assert_eq!(sent.last()["params"], json!([]));
}

#[tokio::test]
async fn test_clones_share_the_id_sequence() {
    let (client, sent) = client_with(MockTransport::echo());
    let other = client.clone();

    client.call("a", ()).await.unwrap();
    other.call("b", ()).await.unwrap();

    let ids: Vec<String> = sent
        .all()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect();
    assert!(ids[0].ends_with("-1"));
    assert!(ids[1].ends_with("-2"));
}

#[tokio::test]
async fn test_concurrent_calls_get_distinct_ids() {
    let (client, sent) = client_with(MockTransport::echo());

    let calls = (0..20).map(|i| {
        let client = client.clone();
        async move { client.call("mirror", (i,)).await }
    });
    let results = futures::future::join_all(calls).await;
    assert!(results.iter().all(|r| r.is_ok()));

    let mut ids: Vec<String> = sent
        .all()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);
}

#[tokio::test]
async fn test_named_params_and_typed_result() {
    let (client, sent) = client_with(MockTransport::echo());

    let point: Point = client.call_as("mirror", Point { x: 1, y: -2 }).await.unwrap();
    assert_eq!(point, Point { x: 1, y: -2 });
    assert_eq!(sent.last()["params"], json!({"x": 1, "y": -2}));
}

#[tokio::test]
async fn test_typed_result_mismatch_is_serialization_error() {
    let (client, _) = client_with(MockTransport::echo());

    let result = client.call_as::<_, Point>("mirror", ("not a point",)).await;
    assert!(matches!(result, Err(Error::Serialization(_))));
}

#[tokio::test]
async fn test_mismatched_ids() {
    let (client, _) = client_with(MockTransport::replying(success(json!(1), json!("someone-else-1"))));

    match client.call("sum", (1,)).await {
        Err(Error::Client(e)) => {
            assert_eq!(e.kind(), ClientErrorKind::MismatchedIds);
            assert_eq!(e.code(), -31601);
            assert!(e.message().contains("someone-else-1"));
        }
        other => panic!("expected mismatched ids, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_keeps_data_and_id() {
    let transport = MockTransport::new(|request| {
        let body = failure(
            -32099,
            "Application error",
            Some(json!({"name": "Error", "message": "boom"})),
            request["id"].clone(),
        );
        Ok(serde_json::to_vec(&body).unwrap())
    });
    let (client, sent) = client_with(transport);

    match client.call("explode", ()).await {
        Err(Error::Server(e)) => {
            assert_eq!(e.kind(), ServerErrorKind::ApplicationError);
            assert_eq!(e.code(), -32099);
            assert_eq!(e.data().unwrap()["message"], "boom");
            assert_eq!(e.id(), &Id::from(sent.last()["id"].as_str().unwrap()));
        }
        other => panic!("expected server error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_error_code_falls_back_to_protocol_kind() {
    let (client, _) = client_with(MockTransport::replying(failure(-1, "custom", None, json!(null))));

    match client.call("x", ()).await {
        Err(Error::Server(e)) => {
            assert_eq!(e.kind(), ServerErrorKind::Protocol);
            assert_eq!(e.code(), -1);
            assert!(e.message().contains("custom"));
        }
        other => panic!("expected server error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_responses() {
    let cases: Vec<(MockTransport, ClientErrorKind)> = vec![
        (MockTransport::raw(b""), ClientErrorKind::InvalidResponse),
        (MockTransport::raw(b"{oops"), ClientErrorKind::ResponseParseError),
        (MockTransport::replying(json!("text")), ClientErrorKind::InvalidResponse),
        (
            MockTransport::replying(json!({"jsonrpc": "2.0", "id": "x"})),
            ClientErrorKind::InvalidResponse,
        ),
    ];

    for (transport, expected) in cases {
        let client = JrpcClient::new(transport);
        match client.call("m", ()).await {
            Err(Error::Client(e)) => assert_eq!(e.kind(), expected),
            other => panic!("expected {:?}, got {:?}", expected, other),
        }
    }
}

#[tokio::test]
async fn test_transport_error_is_untouched() {
    let (client, _) = client_with(MockTransport::failing("503 - Service Unavailable"));

    match client.call("m", ()).await {
        Err(Error::Transport(e)) => assert_eq!(e.to_string(), "503 - Service Unavailable"),
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_notify() {
    let (client, sent) = client_with(MockTransport::echo());

    client.notify("log", json!({"line": "hi"})).await.unwrap();
    let notification = sent.last();
    assert!(notification.get("id").is_none());
    assert_eq!(notification["params"], json!({"line": "hi"}));
}

#[tokio::test]
async fn test_notify_rejections() {
    let error = JrpcClient::new(MockTransport::replying(failure(
        -32600,
        "Invalid Request",
        None,
        json!(null),
    )))
    .notify("n", ())
    .await;
    assert!(matches!(error, Err(Error::Server(e)) if e.kind() == ServerErrorKind::InvalidRequest));

    let unexpected = JrpcClient::new(MockTransport::replying(success(json!(1), json!(null))))
        .notify("n", ())
        .await;
    assert!(matches!(unexpected, Err(Error::Client(e)) if e.kind() == ClientErrorKind::InvalidResponse));
}
