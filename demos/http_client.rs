//! JSON-RPC client over HTTP
//!
//! Start `cargo run --example http_server` first, then
//! `cargo run --example http_client`.

use jrpc::{ClientBuilder, Error};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = ClientBuilder::new("http://127.0.0.1:8080/rpc")
        .header("User-Agent", "jrpc-demo")
        .discover()
        .await?;

    println!("Discovered methods:");
    for descriptor in client.methods() {
        println!("  - {}({})", descriptor.name, descriptor.params.join(", "));
    }

    let total: f64 = client.call_as("sum", (1, 2, 3.5)).await?;
    println!("sum = {}", total);

    if let Some(get) = client.method("accounts.get") {
        println!("account 1 = {}", get.call((1,)).await?);
        match get.call((2,)).await {
            Err(Error::Server(e)) => println!("account 2 failed: {} {:?}", e.code(), e.data()),
            other => println!("account 2 = {:?}", other),
        }
    }

    let mut batch = client.batch();
    let mirror = batch.add_call("mirror", ("a", 1, true));
    batch.add_notification("sum", (0,));
    let transfer = batch.add_call("transfer", json!({"from": 1, "to": 2, "amount": 10}));
    let responses = batch.execute().await?;
    println!("mirror = {:?}", responses.get(&mirror));
    println!("transfer = {:?}", responses.get(&transfer));

    client.notify("sum", (1, 1)).await?;
    Ok(())
}
