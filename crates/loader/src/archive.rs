//! Opening code archives.
//!
//! An archive is a shared library (`.so` / `.dylib` / `.dll`) exporting
//! [`MANIFEST_SYMBOL`]. [`DylibOpener`] opens real libraries;
//! [`StaticOpener`] serves a manifest linked into the host, which is how
//! built-in actions and tests are loaded.

// This module needs unsafe for FFI.
#![allow(unsafe_code, reason = "FFI calls for dynamic library loading")]

use std::fmt;
use std::path::{Path, PathBuf};

use cirrus_action::{MANIFEST_SYMBOL, Manifest, ManifestFn};
use libloading::Library;

use crate::error::LoadError;

/// An opened archive.
///
/// Everything produced from the manifest may point into the archive's code,
/// so the archive must outlive every instance created from it.
pub trait Archive: Send + Sync + fmt::Debug {
    fn path(&self) -> &Path;

    /// Call the archive's manifest function. This runs foreign code and may
    /// panic.
    fn manifest(&self) -> Manifest;
}

/// Opens archives from paths.
pub trait ArchiveOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn Archive>, LoadError>;
}

/// Opens archives as shared libraries.
///
/// On Unix the library is opened with `RTLD_NOW | RTLD_LOCAL` so its symbols
/// stay out of the global namespace; on glibc `RTLD_DEEPBIND` is added so
/// the library resolves its own symbols before the host's.
#[derive(Debug, Clone, Copy, Default)]
pub struct DylibOpener;

impl ArchiveOpener for DylibOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn Archive>, LoadError> {
        if !path.is_file() {
            return Err(LoadError::Open {
                path: path.to_path_buf(),
                reason: "no such file".to_owned(),
            });
        }

        // SAFETY: opening a library runs its initialisers. The archive is
        // supplied by the trusted orchestrator; its code is what we are
        // asked to run.
        let library = unsafe { open_library(path) }.map_err(|e| LoadError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // SAFETY: archives built with `export_actions!` export this symbol
        // with the `ManifestFn` signature; the ABI version in the manifest is
        // checked before anything else from it is used.
        let manifest_fn = unsafe { library.get::<ManifestFn>(MANIFEST_SYMBOL.as_bytes()) }
            .map(|symbol| *symbol)
            .map_err(|e| LoadError::Manifest {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        tracing::debug!(archive = %path.display(), "archive opened");
        Ok(Box::new(DylibArchive {
            manifest_fn,
            path: path.to_path_buf(),
            library,
        }))
    }
}

#[cfg(unix)]
unsafe fn open_library(path: &Path) -> Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_LOCAL, RTLD_NOW};

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    let flags = RTLD_NOW | RTLD_LOCAL | libc::RTLD_DEEPBIND;
    #[cfg(not(all(target_os = "linux", target_env = "gnu")))]
    let flags = RTLD_NOW | RTLD_LOCAL;

    // SAFETY: forwarded from the caller.
    unsafe { UnixLibrary::open(Some(path), flags) }.map(Library::from)
}

#[cfg(not(unix))]
unsafe fn open_library(path: &Path) -> Result<Library, libloading::Error> {
    // SAFETY: forwarded from the caller.
    unsafe { Library::new(path) }
}

/// A shared library kept open for as long as this value lives.
struct DylibArchive {
    // Copied out of `library`; valid while `library` is loaded.
    manifest_fn: ManifestFn,
    path: PathBuf,
    library: Library,
}

impl Archive for DylibArchive {
    fn path(&self) -> &Path {
        &self.path
    }

    fn manifest(&self) -> Manifest {
        (self.manifest_fn)()
    }
}

impl fmt::Debug for DylibArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DylibArchive")
            .field("path", &self.path)
            .field("library", &self.library)
            .finish()
    }
}

/// Serves a manifest function linked into the host for any path.
#[derive(Clone, Copy)]
pub struct StaticOpener {
    manifest_fn: ManifestFn,
}

impl StaticOpener {
    pub fn new(manifest_fn: ManifestFn) -> Self {
        Self { manifest_fn }
    }
}

impl fmt::Debug for StaticOpener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticOpener").finish_non_exhaustive()
    }
}

impl ArchiveOpener for StaticOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn Archive>, LoadError> {
        Ok(Box::new(StaticArchive {
            manifest_fn: self.manifest_fn,
            path: path.to_path_buf(),
        }))
    }
}

struct StaticArchive {
    manifest_fn: ManifestFn,
    path: PathBuf,
}

impl Archive for StaticArchive {
    fn path(&self) -> &Path {
        &self.path
    }

    fn manifest(&self) -> Manifest {
        (self.manifest_fn)()
    }
}

impl fmt::Debug for StaticArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticArchive")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
