//! Echo service
//!
//! Registers a name on the bus and answers every request with
//! `{"msg": "pong", "echo": <payload>}`. Reconnects whenever the bus goes
//! away.
//!
//! Run with: cargo run --example echo_service [BUS_ADDR] [NAME]
//!
//! Examples:
//!   cargo run --example echo_service                    # 127.0.0.1:5001 as "alpha"
//!   cargo run --example echo_service localhost point    # 127.0.0.1:5001 as "point"

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::{json, Value};
use svcbus::client::Request;
use svcbus::{ClientConfig, Multiplexer, RequestHandler, ServiceName, ServiceRunner};

struct Echo;

impl RequestHandler for Echo {
    async fn handle(&self, request: Request, _bus: Multiplexer) -> Result<Value, String> {
        println!("[{}] {} -> {}", request.correlation_id, request.from, request.payload);
        Ok(json!({"msg": "pong", "echo": request.payload}))
    }
}

fn parse_addr(arg: &str) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, 5001));
    }

    Err(format!("Invalid bus address: '{}'", arg))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    let bus_addr = match args.get(1) {
        Some(arg) => parse_addr(arg)?,
        None => ClientConfig::default().bus_addr,
    };
    let name: ServiceName = args.get(2).map(String::as_str).unwrap_or("alpha").parse()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("svcbus=info".parse()?)
                .add_directive("echo_service=debug".parse()?),
        )
        .init();

    let config = ClientConfig::new(bus_addr).reconnect_backoff(Duration::from_secs(2));
    let runner = ServiceRunner::new(name, config, Echo);

    println!("Serving '{}' on bus {}", name, bus_addr);

    runner
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await?;

    Ok(())
}
