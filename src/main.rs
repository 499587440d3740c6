// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Instant;

use conveyor::broker::{BrokerLink, InProcessLink};
use conveyor::config::{load_and_validate_config, RuntimeBuilder};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <config.yaml> [payload ...]", args[0]);
        eprintln!("Example: {} configs/orders.yaml '{{\"order\":1}}' '{{\"order\":2}}'", args[0]);
        std::process::exit(1);
    }

    let config_file = &args[1];
    let payloads = &args[2..];

    if let Err(e) = run_once(config_file, payloads).await {
        eprintln!("❌ Failed to execute {}: {}", config_file, e);
        std::process::exit(1);
    }
}

/// Load a config, seed the in-process replicas with the given payloads,
/// run one pass of the stage graph, and print what moved.
async fn run_once(
    config_file: &str,
    payloads: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();

    let config = load_and_validate_config(config_file)?;

    // One in-process link per replica endpoint, kept for inspection
    let mut links: HashMap<String, Arc<InProcessLink>> = HashMap::new();
    for cluster in &config.broker.clusters {
        links.insert(cluster.url.clone(), InProcessLink::shared());
    }

    let runtime = {
        let links = links.clone();
        RuntimeBuilder::new().build(&config, move |url| {
            Arc::clone(&links[url]) as Arc<dyn BrokerLink>
        })?
    };

    println!("🚀 Conveyor: one pass");
    println!("📋 Configuration: {}", config_file);
    println!("🔌 Replicas: {}", config.broker.url());
    println!("🧩 Stages: {}", config.stages.len());

    runtime.open().await;

    // Seed every payload onto the first replica's first read subject
    if let (Some(stream), Some(connection)) = (
        config.streams.values().next(),
        runtime.connections().first(),
    ) {
        for (index, payload) in payloads.iter().enumerate() {
            connection
                .deliver(&stream.subject, (index + 1) as u64, payload.clone().into_bytes())
                .await;
        }
        if !payloads.is_empty() {
            println!("📥 Seeded {} messages on '{}'", payloads.len(), stream.subject);
        }
    }

    let pass_start = Instant::now();
    runtime.run_pass(serde_json::Value::Null).await;
    let pass_time = pass_start.elapsed();

    println!("\n📊 Pass Results:");
    println!("⏱️  Pass Time: {:?}", pass_time);
    for (url, link) in &links {
        let published = link.published();
        let acked = link.acked();
        println!("  {} -> published {}, acknowledged {}", url, published.len(), acked.len());
        for (subject, body) in published {
            println!("     📤 {}: {}", subject, String::from_utf8_lossy(&body));
        }
    }

    runtime.close().await;

    println!("\n⏱️  Total Time (including config load): {:?}", start_time.elapsed());
    Ok(())
}
