// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Symbol table for the Phidget22 RFID entry points.
#![allow(unsafe_code)]

use std::ffi::c_void;
use std::fmt;
use std::path::Path;

use libloading::Library;

use super::loader::open_library;
use super::{ConnectionHandlerFn, DeviceHandle, Driver, ReturnCode, TagHandlerFn};
use crate::error::{Error, Result};

/// `PhidgetReturnCode PhidgetRFID_create(PhidgetRFIDHandle *ch);`
type CreateFn = unsafe extern "C" fn(handle: *mut DeviceHandle) -> ReturnCode;

/// `PhidgetReturnCode Phidget_openWaitForAttachment(PhidgetHandle ch, uint32_t timeoutMs);`
type OpenWaitForAttachmentFn =
    unsafe extern "C" fn(handle: DeviceHandle, timeout_ms: u32) -> ReturnCode;

/// `PhidgetReturnCode Phidget_close(PhidgetHandle ch);`
type CloseFn = unsafe extern "C" fn(handle: DeviceHandle) -> ReturnCode;

/// `PhidgetReturnCode PhidgetRFID_delete(PhidgetRFIDHandle *ch);`
type DeleteFn = unsafe extern "C" fn(handle: *mut DeviceHandle) -> ReturnCode;

/// `PhidgetRFID_setOnTagHandler` / `PhidgetRFID_setOnTagLostHandler`.
type SetTagHandlerFn = unsafe extern "C" fn(
    handle: DeviceHandle,
    handler: Option<TagHandlerFn>,
    ctx: *mut c_void,
) -> ReturnCode;

/// `Phidget_setOnAttachHandler` / `Phidget_setOnDetachHandler`.
type SetConnectionHandlerFn = unsafe extern "C" fn(
    handle: DeviceHandle,
    handler: Option<ConnectionHandlerFn>,
    ctx: *mut c_void,
) -> ReturnCode;

/// Resolves one symbol into a copied function pointer.
///
/// # Safety
///
/// `T` must match the symbol's real signature.
unsafe fn resolve<T: Copy>(library: &Library, name: &str) -> Result<T> {
    let mut symbol = Vec::with_capacity(name.len() + 1);
    symbol.extend_from_slice(name.as_bytes());
    symbol.push(0);

    // SAFETY: the caller guarantees `T` matches the exported signature.
    unsafe { library.get::<T>(&symbol) }
        .map(|s| *s)
        .map_err(|e| {
            tracing::error!(symbol = name, error = %e, "Missing driver entry point");
            Error::symbol_not_found(name)
        })
}

/// The Phidget22 library with its RFID entry points resolved.
///
/// The function pointers are only valid while `library` stays loaded, so
/// both live in the same value and the library is dropped last.
pub struct NativeDriver {
    create: CreateFn,
    open_wait_for_attachment: OpenWaitForAttachmentFn,
    close: CloseFn,
    delete: DeleteFn,
    set_on_tag_handler: SetTagHandlerFn,
    set_on_tag_lost_handler: SetTagHandlerFn,
    set_on_attach_handler: SetConnectionHandlerFn,
    set_on_detach_handler: SetConnectionHandlerFn,
    path: String,
    _library: Library,
}

impl NativeDriver {
    /// Loads the driver for the running platform and resolves every symbol.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PlatformUnsupported`], [`Error::LibraryLoadFailed`],
    /// or [`Error::SymbolNotFound`]. There is no partially loaded mode.
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let (library, path) = open_library(override_path)?;

        // SAFETY: each type alias mirrors the declaration in phidget22.h.
        let driver = unsafe {
            Self {
                create: resolve(&library, "PhidgetRFID_create")?,
                open_wait_for_attachment: resolve(&library, "Phidget_openWaitForAttachment")?,
                close: resolve(&library, "Phidget_close")?,
                delete: resolve(&library, "PhidgetRFID_delete")?,
                set_on_tag_handler: resolve(&library, "PhidgetRFID_setOnTagHandler")?,
                set_on_tag_lost_handler: resolve(&library, "PhidgetRFID_setOnTagLostHandler")?,
                set_on_attach_handler: resolve(&library, "Phidget_setOnAttachHandler")?,
                set_on_detach_handler: resolve(&library, "Phidget_setOnDetachHandler")?,
                path,
                _library: library,
            }
        };

        tracing::debug!(path = %driver.path, "Resolved Phidget22 RFID symbols");
        Ok(driver)
    }

    /// Location the library was loaded from.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Debug for NativeDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeDriver")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

// The driver's calls are thread-safe per the Phidget22 documentation; the
// handle is never shared between sessions.
impl Driver for NativeDriver {
    fn create(&self, handle: &mut DeviceHandle) -> ReturnCode {
        // SAFETY: `handle` is a valid out-pointer for the duration of the call.
        unsafe { (self.create)(handle) }
    }

    fn open_wait_for_attachment(&self, handle: DeviceHandle, timeout_ms: u32) -> ReturnCode {
        // SAFETY: the session only passes handles returned by `create`.
        unsafe { (self.open_wait_for_attachment)(handle, timeout_ms) }
    }

    fn close(&self, handle: DeviceHandle) -> ReturnCode {
        // SAFETY: as above.
        unsafe { (self.close)(handle) }
    }

    fn delete(&self, handle: &mut DeviceHandle) -> ReturnCode {
        // SAFETY: the driver frees the channel and nulls the out-pointer.
        unsafe { (self.delete)(handle) }
    }

    unsafe fn set_on_tag_handler(
        &self,
        handle: DeviceHandle,
        handler: Option<TagHandlerFn>,
        ctx: *mut c_void,
    ) -> ReturnCode {
        // SAFETY: forwarded from the caller's contract on `ctx`.
        unsafe { (self.set_on_tag_handler)(handle, handler, ctx) }
    }

    unsafe fn set_on_tag_lost_handler(
        &self,
        handle: DeviceHandle,
        handler: Option<TagHandlerFn>,
        ctx: *mut c_void,
    ) -> ReturnCode {
        // SAFETY: forwarded from the caller's contract on `ctx`.
        unsafe { (self.set_on_tag_lost_handler)(handle, handler, ctx) }
    }

    unsafe fn set_on_attach_handler(
        &self,
        handle: DeviceHandle,
        handler: Option<ConnectionHandlerFn>,
        ctx: *mut c_void,
    ) -> ReturnCode {
        // SAFETY: forwarded from the caller's contract on `ctx`.
        unsafe { (self.set_on_attach_handler)(handle, handler, ctx) }
    }

    unsafe fn set_on_detach_handler(
        &self,
        handle: DeviceHandle,
        handler: Option<ConnectionHandlerFn>,
        ctx: *mut c_void,
    ) -> ReturnCode {
        // SAFETY: forwarded from the caller's contract on `ctx`.
        unsafe { (self.set_on_detach_handler)(handle, handler, ctx) }
    }
}
