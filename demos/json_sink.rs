//! JSON sink example
//!
//! Writes every emitted record to a JSON-lines file while exporting.
//!
//! Run with: cargo run --example json_sink

use otlp_log_emitter::prelude::*;

fn main() -> Result<()> {
    println!("=== OTLP Log Emitter - JSON Sink Example ===\n");

    let emitter = Emitter::builder()
        .config(ExportConfig::default().with_resource(ServiceResource::new("json-sink-demo")))
        .appender(JsonAppender::new("emitted.jsonl")?)
        .level_policy(FixedLevel(Level::Info))
        .build();
    // Exports whatever is still queued when main returns
    let _guard = emitter.shutdown_guard();

    for i in 0..10 {
        emitter.emit(
            "job {job} finished in {ms}ms",
            None,
            Attributes::new().with("job", i).with("ms", 12.5 * i as f64),
        )?;
    }

    emitter.flush(DEFAULT_SHUTDOWN_TIMEOUT).ok();

    println!("Check 'emitted.jsonl' for the records");
    Ok(())
}
