// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the RFID binding.
//!
//! Every failure that can reach the caller is raised synchronously from
//! [`RfidReader::new`](crate::RfidReader::new) or
//! [`RfidReader::initialize`](crate::RfidReader::initialize). Faults inside
//! native callbacks never surface here: they are logged and dropped because
//! nothing may unwind back into the driver.

use thiserror::Error;

use crate::native::ReturnCode;
use crate::reader::ReaderState;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The running operating system has no known driver location.
    #[error("platform '{os}' is not supported by the Phidget22 RFID binding")]
    PlatformUnsupported {
        /// Name of the operating system as reported by the standard library.
        os: String,
    },

    /// The native driver library could not be opened.
    #[error("failed to load native library '{path}': {source}")]
    LibraryLoadFailed {
        /// The path or bare library name that was tried.
        path: String,
        /// Error reported by the dynamic loader.
        #[source]
        source: libloading::Error,
    },

    /// A required entry point is missing from the driver library.
    #[error("symbol '{symbol}' not found in native library")]
    SymbolNotFound {
        /// Name of the missing symbol.
        symbol: String,
    },

    /// A native call returned a nonzero status.
    #[error("native call '{call}' failed with code {code}")]
    NativeCallFailed {
        /// Short name of the native operation.
        call: &'static str,
        /// The driver's return code, surfaced verbatim.
        code: ReturnCode,
    },

    /// The reader is not in a state that permits the requested operation.
    #[error("invalid reader state: expected {expected:?}, got {actual:?}")]
    InvalidState {
        /// State required by the operation.
        expected: ReaderState,
        /// State the reader was actually in.
        actual: ReaderState,
    },

    /// The blocking worker that waits for the device did not complete.
    #[error("blocking worker failed: {0}")]
    Worker(String),
}

impl Error {
    /// Creates a native call failure.
    #[must_use]
    pub fn native_call(call: &'static str, code: ReturnCode) -> Self {
        Self::NativeCallFailed { call, code }
    }

    /// Creates a symbol not found error.
    pub fn symbol_not_found(symbol: impl Into<String>) -> Self {
        Self::SymbolNotFound {
            symbol: symbol.into(),
        }
    }

    /// Returns the driver return code carried by this error, if any.
    #[must_use]
    pub fn native_code(&self) -> Option<ReturnCode> {
        match self {
            Self::NativeCallFailed { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns `true` for construction-time failures that no retry can fix.
    ///
    /// A missing driver installation or an unsupported platform will not go
    /// away by calling again; a failed open (device unplugged) might.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::PlatformUnsupported { .. }
                | Self::LibraryLoadFailed { .. }
                | Self::SymbolNotFound { .. }
        )
    }
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
