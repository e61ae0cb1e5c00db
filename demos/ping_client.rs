//! Ping a service through the bus
//!
//! Run with: cargo run --example ping_client [BUS_ADDR] [SERVICE] [COUNT]
//!
//! Examples:
//!   cargo run --example ping_client                     # pings "alpha" once
//!   cargo run --example ping_client localhost point 10  # pings "point" ten times

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use serde_json::json;
use svcbus::{ClientConfig, Multiplexer, ServiceName};

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
    let target: ServiceName = args.get(2).map(String::as_str).unwrap_or("alpha").parse()?;
    let count: u32 = match args.get(3) {
        Some(n) => n.parse()?,
        None => 1,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("svcbus=info".parse()?)
                .add_directive("ping_client=debug".parse()?),
        )
        .init();

    let config = ClientConfig::new(bus_addr).request_timeout(Duration::from_secs(5));
    let bus = Multiplexer::connect(config).await?;
    println!("Connected to {} as '{}'", bus_addr, bus.name());

    for seq in 0..count {
        let started = Instant::now();
        match bus.request(&target, json!({"msg": "ping", "seq": seq})).await {
            Ok(reply) => println!("{} seq={} time={:?}", reply, seq, started.elapsed()),
            Err(e) => println!("seq={} failed: {}", seq, e),
        }
    }

    bus.shutdown().await;
    Ok(())
}
