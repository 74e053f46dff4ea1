//! JSON-RPC server over HTTP
//!
//! Run with `cargo run --example http_server`, then try:
//!
//! ```text
//! curl http://127.0.0.1:8080/rpc
//! curl -d '{"jsonrpc":"2.0","method":"sum","params":[1,2,3],"id":1}' http://127.0.0.1:8080/rpc
//! ```

use jrpc::core::{LogFormat, ObservabilityConfig};
use jrpc::server::{from_sync_fn, HandlerError, MethodDefinition};
use jrpc::{method, JrpcServer};
use serde::Deserialize;

#[method]
fn sum(#[rest] values: Vec<f64>) -> f64 {
    values.iter().sum()
}

#[method(name = "accounts.get")]
async fn get_account(id: u64) -> Result<serde_json::Value, HandlerError> {
    match id {
        1 => Ok(serde_json::json!({"id": 1, "owner": "alice", "balance": 120})),
        _ => Err(HandlerError::named("NotFound", format!("no account {}", id))),
    }
}

#[derive(Deserialize)]
struct Transfer {
    from: u64,
    to: u64,
    amount: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let server = JrpcServer::builder()
        .bind_str("127.0.0.1:8080")?
        .endpoint("/rpc")
        .with_observability(
            ObservabilityConfig::local("jrpc-demo-server")
                .with_log_level("info")
                .with_log_format(LogFormat::Text),
        )
        .method(sum())
        .method(get_account())
        .method(
            MethodDefinition::new(
                "mirror",
                from_sync_fn(|params| Ok(params.into_value())),
            )
            .rest("args"),
        )
        .method(
            MethodDefinition::new(
                "transfer",
                jrpc::server::from_typed_fn(|t: Transfer| async move {
                    if t.from == t.to {
                        return Err(HandlerError::new("cannot transfer to the same account"));
                    }
                    Ok(serde_json::json!({"from": t.from, "to": t.to, "amount": t.amount}))
                }),
            )
            .params(["from", "to", "amount"]),
        )
        .build()
        .await?;

    println!("Listening on {}", server.url());
    for descriptor in server.dispatcher().describe() {
        println!("  - {}({})", descriptor.name, descriptor.params.join(", "));
    }

    let handle = server.spawn();
    tokio::signal::ctrl_c().await?;
    handle.shutdown().await?;
    jrpc::core::shutdown_observability();
    Ok(())
}
