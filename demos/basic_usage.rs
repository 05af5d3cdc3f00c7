//! Basic emission example
//!
//! Demonstrates templated messages, explicit and random levels, and a
//! console sink alongside the OTLP export.
//!
//! Run with: cargo run --example basic_usage
//! (expects a collector on http://localhost:4318; without one, delivery
//! failures are reported on stderr and emission still succeeds)

use otlp_log_emitter::prelude::*;
use otlp_log_emitter::{info, warning};
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== OTLP Log Emitter - Basic Usage Example ===\n");

    let config = ExportConfig::default()
        .with_resource(ServiceResource::new("basic-usage").with_namespace("demos"))
        .with_max_batch_size(16)
        .with_max_delay(Duration::from_millis(500));

    let emitter = Emitter::builder()
        .config(config)
        .appender(ConsoleAppender::new())
        .build();

    println!("1. Explicit levels:");
    emitter.emit("service started on port {port}", Some(Level::Info), Attributes::new().with("port", 8080))?;
    emitter.emit(
        "cache miss for {key}",
        Some(Level::Debug),
        Attributes::new().with("key", "user:42"),
    )?;

    println!("\n2. Level chosen at random when omitted:");
    for i in 0..5 {
        let response = emitter.emit_response("heartbeat {seq}", None, Attributes::new().with("seq", i))?;
        println!("   -> [{}] {}", response.emitted_level, response.formatted_message);
    }

    println!("\n3. Macros:");
    info!(emitter, "user {user} signed in", user = "ada")?;
    warning!(emitter, "disk usage at {pct}%", pct = 91.5)?;

    println!("\n4. A missing attribute is a format error:");
    match emitter.emit("order {order_id} shipped", Some(Level::Info), Attributes::new()) {
        Ok(_) => println!("   unexpected success"),
        Err(e) => println!("   {}", e),
    }

    emitter.flush(Duration::from_secs(2)).ok();
    emitter.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
