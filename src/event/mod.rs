// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event system for reader notifications.
//!
//! The native driver reports attach, detach, tag and tag-lost notifications
//! through callbacks. These are turned into [`ReaderEvent`]s and published
//! on an [`EventStream`], which fans each event out to every current
//! subscriber.
//!
//! # Examples
//!
//! ```
//! use phidget_rfid::event::{EventStream, ReaderEvent};
//!
//! let stream = EventStream::new();
//!
//! // Subscribe to events
//! let mut rx = stream.subscribe();
//!
//! // Publish an event
//! stream.publish(ReaderEvent::tag_scanned("0102abcd"));
//! ```

mod event_stream;
mod reader_event;

pub use event_stream::{EventReceiver, EventStream, TryRecvError};
pub use reader_event::ReaderEvent;
