// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RFID reader session.
//!
//! An [`RfidReader`] owns one native channel handle, the four callback
//! registrations installed on it, and the [`EventStream`] those callbacks
//! publish to. Its lifecycle is:
//!
//! ```text
//! Unopened --initialize--> Created --(handlers)--> Open --dispose--> Disposed
//! ```
//!
//! A failed open tears everything down again before the error is returned,
//! so no handle or registration leaks from a partial initialization.
//!
//! The open call blocks on a worker thread and cannot be cancelled. If the
//! reader is disposed while it is still waiting, the handle and the callback
//! registrations are handed to that worker and released once the open
//! returns.

mod config;

pub use config::{DEFAULT_OPEN_TIMEOUT, ReaderConfig};

use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::event::{EventReceiver, EventStream};
use crate::native::{DeviceHandle, Driver, NativeDriver};
use crate::trampoline::{CallbackKind, Registration};

/// Lifecycle state of an [`RfidReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReaderState {
    /// Constructed; no native handle yet.
    Unopened,
    /// Native handle created, handlers being installed or device not yet open.
    Created,
    /// Device attached and open.
    Open,
    /// Torn down; the reader cannot be reused.
    Disposed,
}

/// The four callback registrations owned by a session.
#[derive(Debug, Default)]
struct Registrations {
    attach: Option<Registration>,
    detach: Option<Registration>,
    tag: Option<Registration>,
    tag_lost: Option<Registration>,
}

impl Registrations {
    fn iter(&self) -> impl Iterator<Item = &Registration> {
        [&self.attach, &self.detach, &self.tag, &self.tag_lost]
            .into_iter()
            .flatten()
    }

    fn len(&self) -> usize {
        self.iter().count()
    }

    /// Drops every registration, returning how many were live.
    fn release(&mut self) -> usize {
        [
            self.attach.take(),
            self.detach.take(),
            self.tag.take(),
            self.tag_lost.take(),
        ]
        .into_iter()
        .flatten()
        .count()
    }
}

/// Closes then deletes `handle`, logging nonzero codes, and resets it to null.
fn release_handle<D: Driver + ?Sized>(driver: &D, handle: &mut DeviceHandle) {
    if handle.is_null() {
        return;
    }
    let channel = *handle;

    let code = driver.close(channel);
    if !code.is_ok() {
        tracing::warn!(handle = %channel, code = %code, "Native close failed");
    }

    let code = driver.delete(handle);
    if !code.is_ok() {
        tracing::warn!(handle = %channel, code = %code, "Native delete failed");
    }

    tracing::debug!(handle = %channel, "Released RFID channel");
    *handle = DeviceHandle::NULL;
}

/// Native resources left behind by a reader disposed mid-open.
#[derive(Debug)]
struct Teardown<D: Driver> {
    driver: Arc<D>,
    handle: DeviceHandle,
    registrations: Registrations,
}

impl<D: Driver> Teardown<D> {
    fn run(mut self) {
        release_handle(self.driver.as_ref(), &mut self.handle);
        // Contexts must outlive the handle.
        self.registrations.release();
    }
}

/// Progress of the blocking open call, shared with its worker.
#[derive(Debug)]
enum OpenTask<D: Driver> {
    Running,
    Finished,
    /// The reader was disposed while the open was running.
    Abandoned(Teardown<D>),
}

/// A Phidget22 RFID reader.
///
/// The type parameter selects the native backend. [`NativeDriver`] loads
/// the real driver library; tests can substitute any other [`Driver`].
///
/// # Examples
///
/// ```no_run
/// use phidget_rfid::{ReaderEvent, RfidReader};
///
/// #[tokio::main]
/// async fn main() -> phidget_rfid::Result<()> {
///     let mut reader = RfidReader::new()?;
///     let mut events = reader.subscribe();
///
///     reader.initialize().await?;
///
///     while let Some(event) = events.recv().await {
///         if let ReaderEvent::TagScanned { tag } = event {
///             println!("scanned {tag}");
///             break;
///         }
///     }
///
///     reader.dispose();
///     Ok(())
/// }
/// ```
///
/// # Blocking
///
/// [`dispose`](Self::dispose), and therefore `Drop`, calls the driver's close
/// and delete entry points synchronously on the current thread. Both may
/// block while the driver shuts its threads down, so dropping a reader inside
/// an async task briefly stalls that runtime worker. Use
/// [`tokio::task::spawn_blocking`] to dispose off the runtime if that matters.
///
/// Dropping an `initialize` future does not cancel the native open. A reader
/// disposed while the open is still waiting leaves the release to the worker
/// running the open, which closes and deletes the handle once it returns.
#[derive(Debug)]
pub struct RfidReader<D: Driver = NativeDriver> {
    driver: Arc<D>,
    config: ReaderConfig,
    handle: DeviceHandle,
    state: ReaderState,
    registrations: Registrations,
    events: EventStream,
    open_task: Option<Arc<Mutex<OpenTask<D>>>>,
}

impl RfidReader<NativeDriver> {
    /// Loads the driver with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PlatformUnsupported`], [`Error::LibraryLoadFailed`],
    /// or [`Error::SymbolNotFound`].
    pub fn new() -> Result<Self> {
        Self::with_config(ReaderConfig::default())
    }

    /// Loads the driver with a custom configuration.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_config(config: ReaderConfig) -> Result<Self> {
        let driver = NativeDriver::load(config.library_path.as_deref())?;
        Ok(Self::from_driver(driver, config))
    }
}

impl<D: Driver> RfidReader<D> {
    /// Creates a reader on top of an already loaded driver.
    #[must_use]
    pub fn from_driver(driver: D, config: ReaderConfig) -> Self {
        Self {
            driver: Arc::new(driver),
            config,
            handle: DeviceHandle::NULL,
            state: ReaderState::Unopened,
            registrations: Registrations::default(),
            events: EventStream::new(),
            open_task: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Returns `true` once the device is attached and open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == ReaderState::Open
    }

    /// The native handle, or [`DeviceHandle::NULL`] when not created.
    #[must_use]
    pub fn handle(&self) -> DeviceHandle {
        self.handle
    }

    /// Number of callback registrations currently installed.
    #[must_use]
    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }

    /// The reader's configuration.
    #[must_use]
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// The driver backing this reader.
    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The event stream fed by the native callbacks.
    #[must_use]
    pub fn events(&self) -> &EventStream {
        &self.events
    }

    /// Subscribes to reader events.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Creates the native channel, installs the callbacks and opens the
    /// device, waiting up to the configured open timeout for it to attach.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if the reader was already initialized or
    ///   disposed.
    /// - [`Error::NativeCallFailed`] if create or open returns nonzero. A
    ///   failed open disposes the reader before returning.
    /// - [`Error::Worker`] if the blocking open task could not complete.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.state != ReaderState::Unopened {
            return Err(Error::InvalidState {
                expected: ReaderState::Unopened,
                actual: self.state,
            });
        }

        let mut handle = DeviceHandle::NULL;
        self.driver.create(&mut handle).check("create")?;
        self.handle = handle;
        self.state = ReaderState::Created;
        tracing::debug!(handle = %handle, "Created RFID channel");

        self.install_handlers();

        let driver = Arc::clone(&self.driver);
        let timeout_ms = self.config.open_timeout_ms();
        let task = Arc::new(Mutex::new(OpenTask::Running));
        self.open_task = Some(Arc::clone(&task));

        let opened = tokio::task::spawn_blocking(move || {
            let code = driver.open_wait_for_attachment(handle, timeout_ms);
            let previous = mem::replace(&mut *task.lock(), OpenTask::Finished);
            if let OpenTask::Abandoned(teardown) = previous {
                tracing::debug!(code = %code, "Open returned after dispose, releasing channel");
                teardown.run();
            }
            code
        })
        .await;
        self.open_task = None;

        let code = match opened {
            Ok(code) => code,
            Err(e) => {
                self.dispose();
                return Err(Error::Worker(e.to_string()));
            }
        };

        if !code.is_ok() {
            tracing::error!(
                code = %code,
                timeout_ms,
                "RFID reader not found, check that it is plugged in"
            );
            self.dispose();
            return Err(Error::native_call("open", code));
        }

        self.state = ReaderState::Open;
        tracing::info!(handle = %handle, "RFID reader opened");
        Ok(())
    }

    fn install_handlers(&mut self) {
        let log_events = self.config.log_events;
        let registrations = &mut self.registrations;
        for (slot, kind) in [
            (&mut registrations.attach, CallbackKind::Attach),
            (&mut registrations.detach, CallbackKind::Detach),
            (&mut registrations.tag, CallbackKind::Tag),
            (&mut registrations.tag_lost, CallbackKind::TagLost),
        ] {
            let registration =
                slot.insert(Registration::new(kind, self.events.clone(), log_events));

            // Registration failures are not fatal; the driver treats handlers
            // as best effort.
            // SAFETY: the registration stays in `self.registrations` until
            // `dispose` has closed and deleted the handle.
            #[allow(unsafe_code)]
            let code = unsafe { registration.install(self.driver.as_ref(), self.handle) };
            if !code.is_ok() {
                tracing::warn!(kind = ?kind, code = %code, "Failed to install native handler");
            }
        }
    }

    /// Tears the reader down: closes and deletes the native handle, releases
    /// the callback registrations and closes the event stream.
    ///
    /// Safe to call any number of times. Once the handle has been reset no
    /// further native calls are made.
    ///
    /// If an abandoned `initialize` left the native open running, the handle
    /// and registrations are released by that open's worker after it returns
    /// instead of here. The event stream is closed immediately either way.
    pub fn dispose(&mut self) {
        if let Some(task) = self.open_task.take() {
            let mut slot = task.lock();
            if matches!(*slot, OpenTask::Running) {
                tracing::warn!(
                    handle = %self.handle,
                    "Native open still in progress, deferring release until it returns"
                );
                *slot = OpenTask::Abandoned(Teardown {
                    driver: Arc::clone(&self.driver),
                    handle: mem::replace(&mut self.handle, DeviceHandle::NULL),
                    registrations: mem::take(&mut self.registrations),
                });
            }
        }

        release_handle(self.driver.as_ref(), &mut self.handle);

        let released = self.registrations.release();
        if released > 0 {
            tracing::debug!(released, "Released native callback registrations");
        }

        if self.events.close() {
            tracing::debug!("Closed RFID event stream");
        }

        self.state = ReaderState::Disposed;
    }
}

impl<D: Driver> Drop for RfidReader<D> {
    fn drop(&mut self) {
        if self.state != ReaderState::Disposed {
            self.dispose();
        }
    }
}
