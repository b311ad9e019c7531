// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Native boundary of the Phidget22 driver.
//!
//! This module holds the ABI-level types shared by the loader, the symbol
//! table and the callback trampolines:
//!
//! - [`DeviceHandle`] - opaque pointer-width channel handle
//! - [`ReturnCode`] - driver status code, `0` on success
//! - callback function pointer types matching the driver's handler shapes
//!
//! The [`Driver`] trait is the seam between the reader session and the
//! eight native entry points. [`NativeDriver`] implements it on top of a
//! dynamically loaded library.

mod driver;
mod library;
mod loader;

pub use driver::Driver;
pub use library::NativeDriver;
pub use loader::{Platform, library_candidates, open_library};

use std::ffi::{c_char, c_int, c_void};
use std::fmt;

/// Opaque handle to a native RFID channel.
///
/// The driver hands out a pointer; it is carried as a pointer-width integer
/// so it can move freely between threads. Zero means "not open".
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceHandle(isize);

impl DeviceHandle {
    /// The "not open" sentinel.
    pub const NULL: Self = Self(0);

    /// Wraps a raw handle value.
    #[must_use]
    pub const fn from_raw(raw: isize) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub const fn as_raw(self) -> isize {
        self.0
    }

    /// Returns `true` if this is the "not open" sentinel.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Status code returned by every driver call.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReturnCode(c_int);

impl ReturnCode {
    /// Success.
    pub const OK: Self = Self(0);

    /// Wraps a raw status value.
    #[must_use]
    pub const fn new(code: c_int) -> Self {
        Self(code)
    }

    /// Returns the raw status value.
    #[must_use]
    pub const fn value(self) -> c_int {
        self.0
    }

    /// Returns `true` for the success code.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// Converts the code into a `Result`, naming the call on failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NativeCallFailed`](crate::Error::NativeCallFailed)
    /// for any nonzero code.
    pub fn check(self, call: &'static str) -> crate::Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(crate::Error::native_call(call, self))
        }
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handler for tag and tag-lost notifications.
///
/// ```c
/// void (*)(PhidgetRFIDHandle ch, void *ctx, const char *tag, PhidgetRFID_Protocol protocol);
/// ```
pub type TagHandlerFn = unsafe extern "C" fn(
    handle: DeviceHandle,
    ctx: *mut c_void,
    tag: *const c_char,
    protocol: c_int,
);

/// Handler for attach and detach notifications.
///
/// ```c
/// void (*)(PhidgetHandle ch, void *ctx);
/// ```
pub type ConnectionHandlerFn = unsafe extern "C" fn(handle: DeviceHandle, ctx: *mut c_void);
