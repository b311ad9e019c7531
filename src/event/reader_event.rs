// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reader event types.

/// Events emitted by an RFID reader.
///
/// Events are created by the native callback trampolines and delivered to
/// every current subscriber of the reader's [`EventStream`](super::EventStream).
///
/// # Examples
///
/// ```
/// use phidget_rfid::event::ReaderEvent;
///
/// let event = ReaderEvent::tag_scanned("0102abcd");
///
/// match &event {
///     ReaderEvent::Attached => println!("reader plugged in"),
///     ReaderEvent::Detached => println!("reader unplugged"),
///     ReaderEvent::TagScanned { tag } => println!("tag {tag} entered the field"),
///     ReaderEvent::TagLost { tag } => println!("tag {tag} left the field"),
/// }
/// assert_eq!(event.tag(), Some("0102abcd"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", rename_all = "camelCase")
)]
pub enum ReaderEvent {
    /// The reader was attached and opened.
    Attached,

    /// The reader was detached.
    Detached,

    /// A tag entered the antenna field.
    TagScanned {
        /// Decoded tag identifier.
        tag: String,
    },

    /// A tag left the antenna field.
    TagLost {
        /// Decoded tag identifier.
        tag: String,
    },
}

impl ReaderEvent {
    /// Creates a tag scanned event.
    #[must_use]
    pub fn tag_scanned(tag: impl Into<String>) -> Self {
        Self::TagScanned { tag: tag.into() }
    }

    /// Creates a tag lost event.
    #[must_use]
    pub fn tag_lost(tag: impl Into<String>) -> Self {
        Self::TagLost { tag: tag.into() }
    }

    /// Returns the tag identifier for tag events.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::TagScanned { tag } | Self::TagLost { tag } => Some(tag),
            Self::Attached | Self::Detached => None,
        }
    }

    /// Returns `true` if this is a tag scanned or tag lost event.
    #[must_use]
    pub fn is_tag_event(&self) -> bool {
        matches!(self, Self::TagScanned { .. } | Self::TagLost { .. })
    }

    /// Returns `true` if this is an attach or detach event.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Attached | Self::Detached)
    }

    /// Short name of the event kind, used in log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Attached => "attached",
            Self::Detached => "detached",
            Self::TagScanned { .. } => "tag_scanned",
            Self::TagLost { .. } => "tag_lost",
        }
    }
}
