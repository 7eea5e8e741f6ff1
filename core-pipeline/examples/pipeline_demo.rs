//! End-to-end pipeline demonstration
//!
//! Builds a scheduler with a scripted codec, admits a batch (one file is
//! deliberately flaky), and prints the event stream while the queue drains.
//!
//! Run with:
//! ```bash
//! cargo run --example pipeline_demo
//! ```

use bytes::Bytes;
use codec_traits::testing::{FailureScript, ScriptedCodec};
use codec_traits::{FileCodec, OperationKind};
use core_pipeline::{FileCandidate, JobScheduler};
use core_runtime::logging::{init_logging, LogLevel, LoggingConfig};
use core_runtime::{CoreConfig, EventBus};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::default().with_level(LogLevel::Info))?;

    let codec: Arc<dyn FileCodec> = Arc::new(ScriptedCodec::failing_first(
        OperationKind::CompressPdf,
        1,
        FailureScript::Generic,
    ));
    let config = CoreConfig::builder()
        .codec(codec)
        .max_concurrent_jobs(2)
        .initial_backoff_ms(100)
        .build()?;

    let bus = EventBus::default();
    let mut events = bus.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!("[{:?}] {}", event.severity(), event.description());
        }
    });

    let mut scheduler = JobScheduler::new(config, OperationKind::CompressPdf, bus)?;

    scheduler.admit(vec![
        FileCandidate::new("report.pdf", "application/pdf", Bytes::from_static(b"%PDF-1")),
        FileCandidate::new("scan.pdf", "application/pdf", Bytes::from_static(b"%PDF-2")),
        FileCandidate::new("notes.docx", "application/msword", Bytes::from_static(b"PK")),
    ]);

    scheduler.run_until_idle().await?;

    let stats = scheduler.stats();
    println!(
        "done={} failed={} held={}B",
        stats.done, stats.failed, stats.live_result_bytes
    );
    for view in scheduler.snapshot() {
        println!(
            "{}: {} ({}%, {} attempts)",
            view.name, view.status, view.progress, view.attempts
        );
    }

    printer.abort();
    Ok(())
}
