// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Locating and opening the Phidget22 shared library.

use std::fmt;
use std::path::{Path, PathBuf};

use libloading::Library;

use crate::error::{Error, Result};

/// Install location of the macOS framework shipped by the driver installer.
pub const MACOS_FRAMEWORK_PATH: &str =
    "/Library/Frameworks/Phidget22.framework/Versions/Current/Phidget22";

/// Bare library name resolved through the macOS dynamic loader search path.
pub const MACOS_LIBRARY_NAME: &str = "libphidget22.dylib";

/// Library name resolved through the Windows DLL search order.
pub const WINDOWS_LIBRARY_NAME: &str = "phidget22.dll";

const INSTALL_HINT: &str = "install the Phidget22 drivers from https://www.phidgets.com/docs/OS_-_Operating_System_Support";

/// Operating systems the binding knows how to load the driver on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    /// macOS (primary target).
    MacOs,
    /// Windows.
    Windows,
    /// Anything else, carrying the OS name.
    Unsupported(String),
}

impl Platform {
    /// Detects the running operating system.
    #[must_use]
    pub fn current() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Maps an OS name as reported by `std::env::consts::OS`.
    #[must_use]
    pub fn from_os_name(os: &str) -> Self {
        match os {
            "macos" => Self::MacOs,
            "windows" => Self::Windows,
            other => Self::Unsupported(other.to_string()),
        }
    }

    /// Returns `true` for the two platforms with a known driver location.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MacOs => f.write_str("macos"),
            Self::Windows => f.write_str("windows"),
            Self::Unsupported(os) => f.write_str(os),
        }
    }
}

/// Returns the ordered library locations to try on `platform`.
///
/// On macOS the framework path comes first, followed by the bare library
/// name. Windows has a single fixed name.
///
/// # Errors
///
/// Returns [`Error::PlatformUnsupported`] for any other platform.
pub fn library_candidates(platform: &Platform) -> Result<Vec<PathBuf>> {
    match platform {
        Platform::MacOs => Ok(vec![
            PathBuf::from(MACOS_FRAMEWORK_PATH),
            PathBuf::from(MACOS_LIBRARY_NAME),
        ]),
        Platform::Windows => Ok(vec![PathBuf::from(WINDOWS_LIBRARY_NAME)]),
        Platform::Unsupported(os) => Err(Error::PlatformUnsupported { os: os.clone() }),
    }
}

/// Picks the single location to load.
///
/// An explicit `override_path` wins. Otherwise absolute candidates that do
/// not exist on disk are skipped; bare names are left to the OS loader.
pub(crate) fn resolve_library_path(
    platform: &Platform,
    override_path: Option<&Path>,
) -> Result<PathBuf> {
    let candidates = library_candidates(platform)?;

    if let Some(path) = override_path {
        return Ok(path.to_path_buf());
    }

    candidates
        .iter()
        .find(|candidate| {
            let usable = is_bare_name(candidate) || candidate.exists();
            if !usable {
                tracing::debug!(path = %candidate.display(), "Driver not found at install path");
            }
            usable
        })
        .or_else(|| candidates.last())
        .cloned()
        .ok_or_else(|| Error::PlatformUnsupported {
            os: platform.to_string(),
        })
}

/// A bare name has no directory part and is resolved by the OS loader.
fn is_bare_name(path: &Path) -> bool {
    path.components().count() == 1
}

/// Opens the driver library for the running platform.
///
/// Returns the library together with the location it was loaded from.
///
/// # Errors
///
/// Returns [`Error::PlatformUnsupported`] on an unsupported OS and
/// [`Error::LibraryLoadFailed`] when the dynamic loader rejects the library.
pub fn open_library(override_path: Option<&Path>) -> Result<(Library, String)> {
    let platform = Platform::current();
    let path = resolve_library_path(&platform, override_path)?;
    let path_str = path.display().to_string();

    // SAFETY: loading runs the library's initialisers. The Phidget22 driver
    // has no initialisation-order requirements beyond being loaded once.
    #[allow(unsafe_code)]
    let library = unsafe { Library::new(&path) }.map_err(|source| {
        tracing::error!(
            path = %path_str,
            platform = %platform,
            error = %source,
            hint = INSTALL_HINT,
            "Failed to load Phidget22 library"
        );
        Error::LibraryLoadFailed {
            path: path_str.clone(),
            source,
        }
    })?;

    tracing::info!(path = %path_str, platform = %platform, "Loaded Phidget22 library");

    Ok((library, path_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_from_os_name() {
        assert_eq!(Platform::from_os_name("macos"), Platform::MacOs);
        assert_eq!(Platform::from_os_name("windows"), Platform::Windows);
        assert_eq!(
            Platform::from_os_name("linux"),
            Platform::Unsupported("linux".to_string())
        );
        assert!(!Platform::from_os_name("freebsd").is_supported());
    }

    #[test]
    fn macos_candidates_prefer_framework() {
        let candidates = library_candidates(&Platform::MacOs).unwrap();
        assert_eq!(
            candidates,
            vec![
                PathBuf::from(MACOS_FRAMEWORK_PATH),
                PathBuf::from(MACOS_LIBRARY_NAME)
            ]
        );
    }

    #[test]
    fn windows_uses_fixed_name() {
        let candidates = library_candidates(&Platform::Windows).unwrap();
        assert_eq!(candidates, vec![PathBuf::from(WINDOWS_LIBRARY_NAME)]);
    }

    #[test]
    fn unsupported_platform_fails_early() {
        let err = library_candidates(&Platform::Unsupported("linux".to_string())).unwrap_err();
        assert!(matches!(err, Error::PlatformUnsupported { ref os } if os == "linux"));
    }

    #[test]
    fn unsupported_platform_ignores_override() {
        let platform = Platform::Unsupported("haiku".to_string());
        let result = resolve_library_path(&platform, Some(Path::new("/opt/libphidget22.so")));
        assert!(matches!(result, Err(Error::PlatformUnsupported { .. })));
    }

    #[test]
    fn macos_falls_back_to_bare_name_when_framework_missing() {
        // The framework is only present on macOS hosts with the driver installed.
        if Path::new(MACOS_FRAMEWORK_PATH).exists() {
            return;
        }
        let path = resolve_library_path(&Platform::MacOs, None).unwrap();
        assert_eq!(path, PathBuf::from(MACOS_LIBRARY_NAME));
    }

    #[test]
    fn override_path_wins_on_supported_platform() {
        let path =
            resolve_library_path(&Platform::Windows, Some(Path::new("C:/drivers/phidget22.dll")))
                .unwrap();
        assert_eq!(path, PathBuf::from("C:/drivers/phidget22.dll"));
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    #[test]
    fn open_library_rejects_host_platform() {
        let err = open_library(None).unwrap_err();
        assert!(matches!(err, Error::PlatformUnsupported { .. }));
        assert!(err.is_fatal());
    }

    #[cfg(any(target_os = "macos", target_os = "windows"))]
    #[test]
    fn open_library_reports_load_failure_with_path() {
        let missing = Path::new("/nonexistent/phidget22");
        let err = open_library(Some(missing)).unwrap_err();

        assert!(matches!(
            err,
            Error::LibraryLoadFailed { ref path, .. } if *path == missing.display().to_string()
        ));
        assert!(err.is_fatal());
        assert!(std::error::Error::source(&err).is_some());
    }
}
