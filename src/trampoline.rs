// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Native callback trampolines.
//!
//! The driver invokes handlers on its own threads. Each trampoline here has
//! the exact C signature the driver expects, recovers the session's
//! [`CallbackContext`] from the `ctx` pointer, decodes its arguments, and
//! hands a [`ReaderEvent`] to the [`EventStream`]. Publishing only pushes
//! onto unbounded per-subscriber queues, so the driver thread is never
//! blocked.
//!
//! Nothing may unwind across the C boundary: every body runs under
//! `catch_unwind` and a caught panic is logged and dropped.
#![allow(unsafe_code)]

use std::ffi::{CStr, c_char, c_int, c_void};
use std::panic::{self, AssertUnwindSafe};

use crate::event::{EventStream, ReaderEvent};
use crate::native::{DeviceHandle, Driver, ReturnCode};

/// Which driver notification a registration handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    /// Reader attached.
    Attach,
    /// Reader detached.
    Detach,
    /// Tag entered the field.
    Tag,
    /// Tag left the field.
    TagLost,
}

/// State reachable from a trampoline through the driver's `ctx` pointer.
#[derive(Debug)]
pub struct CallbackContext {
    kind: CallbackKind,
    events: EventStream,
    log_events: bool,
}

impl CallbackContext {
    fn publish(&self, event: ReaderEvent) {
        if self.log_events {
            match event.tag() {
                Some(tag) => tracing::info!(kind = event.kind(), tag, "RFID event"),
                None => tracing::info!(kind = event.kind(), "RFID event"),
            }
        }
        if !self.events.publish(event) {
            tracing::debug!(kind = ?self.kind, "Event stream closed, dropping event");
        }
    }
}

/// An owned binding between a trampoline and its callback context.
///
/// The context is boxed so its address stays fixed while the driver holds
/// it. The registration must outlive the device handle it was installed on.
#[derive(Debug)]
pub struct Registration {
    context: Box<CallbackContext>,
}

impl Registration {
    /// Creates a registration publishing to `events`.
    #[must_use]
    pub fn new(kind: CallbackKind, events: EventStream, log_events: bool) -> Self {
        Self {
            context: Box::new(CallbackContext {
                kind,
                events,
                log_events,
            }),
        }
    }

    /// The notification this registration handles.
    #[must_use]
    pub fn kind(&self) -> CallbackKind {
        self.context.kind
    }

    /// Installs this registration's trampoline on `handle`.
    ///
    /// Returns the setter's status code unchanged.
    ///
    /// # Safety
    ///
    /// The registration must stay alive until `handle` has been closed and
    /// deleted, since the driver may call back with its context until then.
    pub unsafe fn install<D: Driver + ?Sized>(
        &self,
        driver: &D,
        handle: DeviceHandle,
    ) -> ReturnCode {
        let ctx = self.context_ptr();
        // SAFETY: forwarded from the caller's contract.
        unsafe {
            match self.kind() {
                CallbackKind::Attach => driver.set_on_attach_handler(handle, Some(on_attach), ctx),
                CallbackKind::Detach => driver.set_on_detach_handler(handle, Some(on_detach), ctx),
                CallbackKind::Tag => driver.set_on_tag_handler(handle, Some(on_tag), ctx),
                CallbackKind::TagLost => {
                    driver.set_on_tag_lost_handler(handle, Some(on_tag_lost), ctx)
                }
            }
        }
    }

    /// The pointer to pass as the driver's `ctx` argument.
    ///
    /// Valid for as long as this registration is alive.
    #[must_use]
    pub fn context_ptr(&self) -> *mut c_void {
        std::ptr::from_ref::<CallbackContext>(&*self.context)
            .cast_mut()
            .cast::<c_void>()
    }
}

/// Decodes a tag buffer up to its first NUL byte.
///
/// Returns `None` for an empty tag. Malformed UTF-8 is replaced with
/// U+FFFD rather than rejected, and bytes after the terminator are ignored.
///
/// ```
/// use phidget_rfid::trampoline::decode_tag;
///
/// assert_eq!(decode_tag(b"AB\0junk").as_deref(), Some("AB"));
/// assert_eq!(decode_tag(b"\0AB"), None);
/// assert_eq!(decode_tag(&[0xFF, 0x00]).as_deref(), Some("\u{FFFD}"));
/// ```
#[must_use]
pub fn decode_tag(bytes: &[u8]) -> Option<String> {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    if len == 0 {
        return None;
    }
    Some(String::from_utf8_lossy(&bytes[..len]).into_owned())
}

/// Runs `f` with the context behind `ctx`, swallowing panics.
///
/// # Safety
///
/// `ctx` must be null or point to a live [`CallbackContext`].
unsafe fn with_context(ctx: *mut c_void, f: impl FnOnce(&CallbackContext)) {
    if ctx.is_null() {
        tracing::warn!("Native callback invoked without a context");
        return;
    }
    // SAFETY: guaranteed by the caller; the context is only read.
    let context = unsafe { &*ctx.cast::<CallbackContext>() };

    if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| f(context))) {
        let message = panic
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        tracing::error!(kind = ?context.kind, error = %message, "Failed to process native callback");
    }
}

/// Reads the driver's NUL-terminated tag buffer.
///
/// # Safety
///
/// `tag` must be null or point to a NUL-terminated buffer.
unsafe fn read_tag(tag: *const c_char) -> Option<String> {
    if tag.is_null() {
        return None;
    }
    // SAFETY: the driver passes a NUL-terminated string valid for the call.
    let bytes = unsafe { CStr::from_ptr(tag) }.to_bytes_with_nul();
    decode_tag(bytes)
}

unsafe extern "C" fn on_attach(_handle: DeviceHandle, ctx: *mut c_void) {
    // SAFETY: `ctx` is the registration's context, alive until the handle is deleted.
    unsafe { with_context(ctx, |context| context.publish(ReaderEvent::Attached)) };
}

unsafe extern "C" fn on_detach(_handle: DeviceHandle, ctx: *mut c_void) {
    // SAFETY: as for `on_attach`.
    unsafe { with_context(ctx, |context| context.publish(ReaderEvent::Detached)) };
}

unsafe extern "C" fn on_tag(
    _handle: DeviceHandle,
    ctx: *mut c_void,
    tag: *const c_char,
    _protocol: c_int,
) {
    // SAFETY: as for `on_attach`; `tag` is valid for the duration of the call.
    unsafe {
        with_context(ctx, |context| {
            if let Some(tag) = read_tag(tag) {
                context.publish(ReaderEvent::TagScanned { tag });
            }
        });
    }
}

unsafe extern "C" fn on_tag_lost(
    _handle: DeviceHandle,
    ctx: *mut c_void,
    tag: *const c_char,
    _protocol: c_int,
) {
    // SAFETY: as for `on_tag`.
    unsafe {
        with_context(ctx, |context| {
            if let Some(tag) = read_tag(tag) {
                context.publish(ReaderEvent::TagLost { tag });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TryRecvError;
    use crate::native::{ConnectionHandlerFn, TagHandlerFn};

    fn fire_tag(registration: &Registration, bytes: &[u8]) {
        let trampoline: TagHandlerFn = match registration.kind() {
            CallbackKind::Tag => on_tag,
            CallbackKind::TagLost => on_tag_lost,
            kind => panic!("{kind:?} is not a tag registration"),
        };
        unsafe {
            trampoline(
                DeviceHandle::from_raw(1),
                registration.context_ptr(),
                bytes.as_ptr().cast(),
                0,
            );
        }
    }

    fn fire_connection(registration: &Registration) {
        let trampoline: ConnectionHandlerFn = match registration.kind() {
            CallbackKind::Attach => on_attach,
            CallbackKind::Detach => on_detach,
            kind => panic!("{kind:?} is not a connection registration"),
        };
        unsafe { trampoline(DeviceHandle::from_raw(1), registration.context_ptr()) };
    }

    #[test]
    fn decode_stops_at_terminator() {
        assert_eq!(decode_tag(b"0102ab\0ff").as_deref(), Some("0102ab"));
    }

    #[test]
    fn decode_empty_is_none() {
        assert_eq!(decode_tag(b"\0"), None);
        assert_eq!(decode_tag(b""), None);
    }

    #[test]
    fn decode_replaces_malformed_sequences() {
        let decoded = decode_tag(&[0x41, 0xC3, 0x28, 0x42, 0x00]).unwrap();
        assert_eq!(decoded, "A\u{FFFD}(B");
    }

    #[test]
    fn decode_never_exceeds_terminator_length() {
        let bytes = [0xE2, 0x82, 0xAC, 0x80, 0x00, 0x41];
        let decoded = decode_tag(&bytes).unwrap();
        assert!(decoded.chars().count() <= 4);
        assert!(decoded.starts_with('€'));
    }

    #[test]
    fn tag_trampoline_publishes_scanned() {
        let events = EventStream::new();
        let mut rx = events.subscribe();
        let registration = Registration::new(CallbackKind::Tag, events, false);

        fire_tag(&registration, &[0x41, 0x42, 0x00]);

        assert_eq!(rx.try_recv(), Ok(ReaderEvent::tag_scanned("AB")));
    }

    #[test]
    fn tag_lost_trampoline_publishes_lost() {
        let events = EventStream::new();
        let mut rx = events.subscribe();
        let registration = Registration::new(CallbackKind::TagLost, events, false);

        fire_tag(&registration, b"CD\0");

        assert_eq!(rx.try_recv(), Ok(ReaderEvent::tag_lost("CD")));
    }

    #[test]
    fn empty_tag_publishes_nothing() {
        let events = EventStream::new();
        let mut rx = events.subscribe();
        let registration = Registration::new(CallbackKind::Tag, events, false);

        fire_tag(&registration, &[0x00]);

        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn null_tag_pointer_publishes_nothing() {
        let events = EventStream::new();
        let mut rx = events.subscribe();
        let registration = Registration::new(CallbackKind::Tag, events, false);

        unsafe {
            on_tag(
                DeviceHandle::from_raw(1),
                registration.context_ptr(),
                std::ptr::null(),
                0,
            );
        }

        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn invalid_lead_byte_is_replaced() {
        let events = EventStream::new();
        let mut rx = events.subscribe();
        let registration = Registration::new(CallbackKind::Tag, events, true);

        fire_tag(&registration, &[0xFF, 0x00]);

        assert_eq!(rx.try_recv(), Ok(ReaderEvent::tag_scanned("\u{FFFD}")));
    }

    #[test]
    fn attach_and_detach_publish() {
        let events = EventStream::new();
        let mut rx = events.subscribe();
        let attach = Registration::new(CallbackKind::Attach, events.clone(), false);
        let detach = Registration::new(CallbackKind::Detach, events, false);

        fire_connection(&attach);
        fire_connection(&detach);

        assert_eq!(rx.try_recv(), Ok(ReaderEvent::Attached));
        assert_eq!(rx.try_recv(), Ok(ReaderEvent::Detached));
    }

    #[test]
    fn publish_after_close_is_silent() {
        let events = EventStream::new();
        let mut rx = events.subscribe();
        let registration = Registration::new(CallbackKind::Attach, events.clone(), false);
        events.close();

        fire_connection(&registration);

        assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[test]
    fn null_context_is_ignored() {
        unsafe { on_attach(DeviceHandle::from_raw(1), std::ptr::null_mut()) };
    }

    #[test]
    fn panics_do_not_escape() {
        let events = EventStream::new();
        let registration = Registration::new(CallbackKind::Tag, events, false);

        unsafe {
            with_context(registration.context_ptr(), |_| panic!("decoder blew up"));
        }
    }
}
