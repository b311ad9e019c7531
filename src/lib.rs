// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `phidget_rfid` - an event stream over Phidget22 RFID readers.
//!
//! The Phidget22 driver is loaded at runtime. Its attach, detach, tag and
//! tag-lost callbacks are translated into [`ReaderEvent`]s and fanned out
//! to any number of subscribers, which makes the crate a natural backend
//! for a Flutter or other UI layer that only wants a stream of tags.
//!
//! # Supported Platforms
//!
//! - **macOS**: the `Phidget22.framework` install location, falling back to
//!   `libphidget22.dylib` on the loader search path
//! - **Windows**: `phidget22.dll`
//!
//! Any other platform fails with [`Error::PlatformUnsupported`].
//!
//! # Quick Start
//!
//! ```no_run
//! use phidget_rfid::{ReaderEvent, RfidReader};
//!
//! #[tokio::main]
//! async fn main() -> phidget_rfid::Result<()> {
//!     // Load the driver and resolve its entry points
//!     let mut reader = RfidReader::new()?;
//!
//!     // Subscribe before opening so the attach event is not missed
//!     let mut events = reader.subscribe();
//!
//!     // Waits up to 5 s for the reader to be plugged in
//!     reader.initialize().await?;
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             ReaderEvent::Attached => println!("reader attached"),
//!             ReaderEvent::Detached => println!("reader detached"),
//!             ReaderEvent::TagScanned { tag } => println!("tag {tag}"),
//!             ReaderEvent::TagLost { tag } => println!("lost {tag}"),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Configuration
//!
//! ```no_run
//! use std::time::Duration;
//! use phidget_rfid::{ReaderConfig, RfidReader};
//!
//! # fn example() -> phidget_rfid::Result<()> {
//! let config = ReaderConfig::default()
//!     .with_open_timeout(Duration::from_secs(10))
//!     .with_event_logging(false);
//!
//! let reader = RfidReader::with_config(config)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod event;
pub mod native;
pub mod reader;
pub mod trampoline;

pub use error::{Error, Result};
pub use event::{EventReceiver, EventStream, ReaderEvent};
pub use native::{DeviceHandle, Driver, NativeDriver, Platform, ReturnCode};
pub use reader::{ReaderConfig, ReaderState, RfidReader};
