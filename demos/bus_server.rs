//! Standalone bus router
//!
//! Run with: cargo run --example bus_server [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example bus_server                    # binds to 0.0.0.0:5001
//!   cargo run --example bus_server localhost          # binds to 127.0.0.1:5001
//!   cargo run --example bus_server 127.0.0.1:5002     # binds to 127.0.0.1:5002
//!
//! Then start a service and a caller:
//!   cargo run --example echo_service localhost alpha
//!   cargo run --example ping_client localhost alpha

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use svcbus::{BusServer, ServerConfig};

/// Parse a bind address argument
///
/// Accepts `localhost`, a bare IP, or IP:PORT. The port defaults to 5001.
fn parse_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = 5001;

    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: bus_server [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:5001)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let config = match args.get(1) {
        Some(arg) => match parse_addr(arg) {
            Ok(addr) => ServerConfig::with_addr(addr),
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => ServerConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("svcbus=debug".parse()?)
                .add_directive("bus_server=debug".parse()?),
        )
        .init();

    let server = Arc::new(BusServer::new(config));
    println!("Starting bus on {}", server.bind_addr());

    let reporter = {
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(30));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let snap = server.stats().snapshot();
                println!(
                    "Stats: connections={} services={} routed={} unroutable={} dropped={}",
                    snap.active_connections,
                    server.registry().service_count().await,
                    snap.frames_routed,
                    snap.frames_unroutable,
                    snap.frames_dropped,
                );
            }
        })
    };

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                eprintln!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
    }

    reporter.abort();
    Ok(())
}
