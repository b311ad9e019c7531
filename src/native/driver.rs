// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Driver trait abstracting the native entry points.
#![allow(unsafe_code)]

use std::ffi::c_void;

use super::{ConnectionHandlerFn, DeviceHandle, ReturnCode, TagHandlerFn};

/// The eight native operations a reader session needs.
///
/// [`NativeDriver`](super::NativeDriver) forwards each method to the
/// matching symbol of the Phidget22 library. Test code can provide its own
/// implementation to simulate return codes and fire callbacks.
///
/// Implementations must be shareable across threads: the open call runs on a
/// blocking worker while the session keeps its own reference.
pub trait Driver: Send + Sync + 'static {
    /// Allocates a channel and writes its handle into `handle`.
    fn create(&self, handle: &mut DeviceHandle) -> ReturnCode;

    /// Opens the channel, blocking until a device attaches or `timeout_ms`
    /// elapses.
    fn open_wait_for_attachment(&self, handle: DeviceHandle, timeout_ms: u32) -> ReturnCode;

    /// Closes an open channel. Callbacks stop firing once this returns.
    fn close(&self, handle: DeviceHandle) -> ReturnCode;

    /// Frees the channel and resets `handle` to null.
    fn delete(&self, handle: &mut DeviceHandle) -> ReturnCode;

    /// Registers the tag handler.
    ///
    /// # Safety
    ///
    /// `ctx` is handed back to `handler` on driver threads. It must stay
    /// valid until the handle has been closed and deleted.
    unsafe fn set_on_tag_handler(
        &self,
        handle: DeviceHandle,
        handler: Option<TagHandlerFn>,
        ctx: *mut c_void,
    ) -> ReturnCode;

    /// Registers the tag-lost handler.
    ///
    /// # Safety
    ///
    /// Same contract as [`set_on_tag_handler`](Self::set_on_tag_handler).
    unsafe fn set_on_tag_lost_handler(
        &self,
        handle: DeviceHandle,
        handler: Option<TagHandlerFn>,
        ctx: *mut c_void,
    ) -> ReturnCode;

    /// Registers the attach handler.
    ///
    /// # Safety
    ///
    /// Same contract as [`set_on_tag_handler`](Self::set_on_tag_handler).
    unsafe fn set_on_attach_handler(
        &self,
        handle: DeviceHandle,
        handler: Option<ConnectionHandlerFn>,
        ctx: *mut c_void,
    ) -> ReturnCode;

    /// Registers the detach handler.
    ///
    /// # Safety
    ///
    /// Same contract as [`set_on_tag_handler`](Self::set_on_tag_handler).
    unsafe fn set_on_detach_handler(
        &self,
        handle: DeviceHandle,
        handler: Option<ConnectionHandlerFn>,
        ctx: *mut c_void,
    ) -> ReturnCode;
}
