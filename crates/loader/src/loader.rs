use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cirrus_action::{
    ABI_VERSION, API_VERSION, Activation, Engine, FunctionEngine, Object, Policy, RouteBuilder,
    SandboxedContext, build_id,
};
use cirrus_json::BinaryRef;
use cirrus_sandbox::{Ambient, InvocationGate};
use tempfile::TempPath;

use crate::archive::{Archive, ArchiveOpener, DylibOpener};
use crate::error::{InvocationError, LoadError, panic_message};

/// Where the archive to load lives.
#[derive(Debug)]
pub enum ArchiveSource {
    /// A file the runtime does not own.
    Path(PathBuf),
    /// A file extracted from the init document. It is removed when loading
    /// fails, or when the loaded action is dropped.
    Extracted(BinaryRef),
}

impl ArchiveSource {
    pub fn path(&self) -> &Path {
        match self {
            Self::Path(path) => path,
            Self::Extracted(binary) => binary.path(),
        }
    }
}

impl From<PathBuf> for ArchiveSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<BinaryRef> for ArchiveSource {
    fn from(binary: BinaryRef) -> Self {
        Self::Extracted(binary)
    }
}

/// Resolves entry points inside archives and starts an engine for them.
pub struct ActionLoader {
    opener: Arc<dyn ArchiveOpener>,
    policy: Arc<Policy>,
}

impl ActionLoader {
    /// A loader for shared-library archives.
    pub fn new(policy: Arc<Policy>) -> Self {
        Self::with_opener(Arc::new(DylibOpener), policy)
    }

    pub fn with_opener(opener: Arc<dyn ArchiveOpener>, policy: Arc<Policy>) -> Self {
        Self { opener, policy }
    }

    /// The policy every loaded action is invoked under.
    pub fn policy(&self) -> &Arc<Policy> {
        &self.policy
    }

    /// Open `source`, instantiate `entry_point`, register it with a fresh
    /// [`FunctionEngine`] and start the engine.
    ///
    /// Foreign code runs while resolving the manifest, constructing the entry
    /// point and configuring its routes; panics in any of them are reported
    /// as errors.
    #[tracing::instrument(skip(self, source), fields(archive = %source.path().display()))]
    pub fn load(&self, source: ArchiveSource, entry_point: &str) -> Result<LoadedAction, LoadError> {
        let (path, backing) = match source {
            ArchiveSource::Path(path) => (path, None),
            ArchiveSource::Extracted(binary) => {
                let temp = binary.into_temp_path();
                (temp.to_path_buf(), Some(temp))
            }
        };

        let archive = self.opener.open(&path)?;
        let manifest = guarded(|| archive.manifest()).map_err(|reason| LoadError::Manifest {
            path: path.clone(),
            reason: format!("manifest function panicked: {reason}"),
        })?;
        if !manifest.is_compatible() {
            return Err(LoadError::AbiMismatch {
                found_abi: manifest.abi_version,
                found_api: manifest.api_version.to_owned(),
                expected_abi: ABI_VERSION,
                expected_api: API_VERSION,
                same_build: manifest.build_id == build_id(),
            });
        }

        let entry = manifest
            .find(entry_point)
            .copied()
            .ok_or_else(|| LoadError::EntryPointNotFound {
                name: entry_point.to_owned(),
                available: manifest.names().into_iter().map(str::to_owned).collect(),
            })?;
        let instance = guarded(|| entry.instantiate()).map_err(|reason| LoadError::Instantiate {
            name: entry_point.to_owned(),
            reason,
        })?;
        let mut builder = instance
            .downcast::<Box<dyn RouteBuilder>>()
            .map_err(|_| LoadError::NotAnAction {
                name: entry_point.to_owned(),
            })?;

        let mut engine = FunctionEngine::new();
        let started = guarded(|| {
            engine.add_routes(&mut **builder)?;
            engine.start()
        });
        drop(builder);
        match started {
            Ok(Ok(())) => {}
            Ok(Err(source)) => {
                return Err(LoadError::Engine {
                    name: entry_point.to_owned(),
                    source,
                });
            }
            Err(reason) => {
                return Err(LoadError::Instantiate {
                    name: entry_point.to_owned(),
                    reason,
                });
            }
        }

        tracing::info!(entry_point, routes = engine.routes().len(), "action loaded");
        Ok(LoadedAction {
            engine: Box::new(engine),
            archive,
            backing,
            entry_point: Arc::from(entry_point),
            archive_path: Arc::from(path.as_path()),
            policy: Arc::clone(&self.policy),
        })
    }
}

impl fmt::Debug for ActionLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionLoader")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// A started engine for one entry point, ready to be invoked.
pub struct LoadedAction {
    // Field order is drop order: the engine holds code from the archive, and
    // the archive file must stay until the library is closed.
    engine: Box<dyn Engine>,
    archive: Box<dyn Archive>,
    backing: Option<TempPath>,
    entry_point: Arc<str>,
    archive_path: Arc<Path>,
    policy: Arc<Policy>,
}

impl LoadedAction {
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Whether the archive file is removed when this action is dropped.
    pub fn owns_archive(&self) -> bool {
        self.backing.is_some()
    }

    /// Run one input through the engine as the only in-flight invocation,
    /// with this action's scope and policy installed.
    pub fn invoke(&self, input: Object, env: Object) -> Result<Object, InvocationError> {
        let sandbox = SandboxedContext::new(Arc::clone(&self.entry_point), Arc::clone(&self.policy))
            .with_activation(Activation::from_env(&env));
        let ambient = Ambient::action(
            Arc::clone(&self.entry_point),
            Arc::clone(&self.archive_path),
            Arc::clone(&self.policy),
        );

        let outcome = InvocationGate::run(ambient, || {
            guarded(|| self.engine.execute(input, env, &sandbox))
        });

        match outcome {
            Ok(Ok(Some(output))) => Ok(output),
            Ok(Ok(None)) => Err(InvocationError::NoResult),
            Ok(Err(err)) => Err(InvocationError::Failed(err)),
            Err(message) => Err(InvocationError::Panicked(message)),
        }
    }
}

impl fmt::Debug for LoadedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedAction")
            .field("entry_point", &self.entry_point)
            .field("archive", &self.archive)
            .field("owns_archive", &self.owns_archive())
            .finish_non_exhaustive()
    }
}

fn guarded<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(&*payload))
}
