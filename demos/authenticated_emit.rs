//! Authenticated emission example
//!
//! Signs in against a token endpoint and exports with a bearer header.
//!
//! Run with: cargo run --example authenticated_emit
//!
//! Environment:
//! - `AUTH_URL` (default `http://localhost:8080/api/auth/login`)
//! - `AUTH_USERNAME` / `AUTH_PASSWORD` (default `demo` / `demo`)
//! - `OTLP_ENDPOINT` (default `http://localhost:4318/v1/logs`)

use otlp_log_emitter::prelude::*;
use std::env;
use std::time::Duration;

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn main() -> Result<()> {
    println!("=== OTLP Log Emitter - Authenticated Example ===\n");

    let provider = CredentialProvider::new(&env_or(
        "AUTH_URL",
        "http://localhost:8080/api/auth/login",
    ))?;
    let authenticator = Authenticator::new(
        provider,
        env_or("AUTH_USERNAME", "demo"),
        env_or("AUTH_PASSWORD", "demo"),
    )
    .with_refresh_skew(Duration::from_secs(60));

    let emitter = Emitter::builder()
        .config(
            ExportConfig::default()
                .with_endpoint(env_or("OTLP_ENDPOINT", "http://localhost:4318/v1/logs"))
                .with_resource(ServiceResource::new("authenticated-demo")),
        )
        .authenticator(authenticator)
        .on_diagnostic(std::sync::Arc::new(|d: &Diagnostic| {
            println!("   [diagnostic] {}", d);
        }))
        .build();

    match emitter.emit(
        "payment {id} captured",
        Some(Level::Info),
        Attributes::new().with("id", "pay_123"),
    ) {
        Ok(record) => println!("1. Emitted: {}", record.message()),
        Err(EmitterError::Auth { status, message }) => {
            println!("1. Sign-in failed (status {:?}): {}", status, message);
            return Ok(());
        }
        Err(e) => return Err(e),
    }

    emitter.flush(Duration::from_secs(5))?;
    emitter.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
