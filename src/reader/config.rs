// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reader configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default time to wait for a reader to attach when opening.
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_millis(5000);

/// Configuration for an [`RfidReader`](crate::RfidReader).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use phidget_rfid::ReaderConfig;
///
/// let config = ReaderConfig::default()
///     .with_open_timeout(Duration::from_secs(2))
///     .with_library_path("/opt/phidgets/libphidget22.dylib")
///     .with_event_logging(false);
///
/// assert_eq!(config.open_timeout_ms(), 2000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReaderConfig {
    /// How long `initialize` waits for the device to attach.
    pub open_timeout: Duration,
    /// Explicit driver location, replacing the platform default.
    pub library_path: Option<PathBuf>,
    /// Log every attach, detach and tag event at info level.
    pub log_events: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            open_timeout: DEFAULT_OPEN_TIMEOUT,
            library_path: None,
            log_events: true,
        }
    }
}

impl ReaderConfig {
    /// Sets the open timeout.
    #[must_use]
    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Loads the driver from `path` instead of the platform default.
    #[must_use]
    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    /// Enables or disables per-event info logging.
    #[must_use]
    pub fn with_event_logging(mut self, enabled: bool) -> Self {
        self.log_events = enabled;
        self
    }

    /// The open timeout in whole milliseconds, saturated to the driver's
    /// `uint32_t` argument.
    #[must_use]
    pub fn open_timeout_ms(&self) -> u32 {
        u32::try_from(self.open_timeout.as_millis()).unwrap_or(u32::MAX)
    }
}
