// SPDX-License-Identifier: MPL-2.0

//! Demo program: print RFID events until Ctrl+C or a time limit.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example tag_monitor -- [seconds] [library-path]
//! ```
//!
//! # Example
//!
//! ```bash
//! RUST_LOG=phidget_rfid=debug cargo run --example tag_monitor -- 30
//! ```

use std::env;
use std::time::Duration;

use phidget_rfid::{ReaderConfig, ReaderEvent, RfidReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = env::args().collect();

    let seconds = match args.get(1) {
        Some(value) => value.parse::<u64>()?,
        None => 60,
    };

    let mut config = ReaderConfig::default().with_event_logging(false);
    if let Some(path) = args.get(2) {
        config = config.with_library_path(path);
    }

    println!("Loading Phidget22 driver...");
    let mut reader = RfidReader::with_config(config)?;
    let mut events = reader.subscribe();

    println!("Waiting for a reader to be plugged in...");
    reader.initialize().await?;
    println!("Reader open, watching tags for {seconds} s (Ctrl+C to stop)");

    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ReaderEvent::Attached) => println!("Reader attached"),
                Some(ReaderEvent::Detached) => println!("Reader detached"),
                Some(ReaderEvent::TagScanned { tag }) => println!("Tag scanned: {tag}"),
                Some(ReaderEvent::TagLost { tag }) => println!("Tag lost:    {tag}"),
                None => break,
            },
            () = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("Disposing reader...");
    reader.dispose();

    println!("Done!");
    Ok(())
}
