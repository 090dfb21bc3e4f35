//! Action runtime -- the init-once, run-many lifecycle controller.

use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use cirrus_action::Object;
use cirrus_json::{CodeArchive, Parser};
use cirrus_loader::{ActionLoader, LoadedAction};
use tokio::sync::Mutex;
use tokio::task::JoinError;

use crate::activation::{ActivationBoundary, ActivationLog, StderrActivationLog};
use crate::document::{InitRequest, RunRequest};
use crate::error::RuntimeError;
use crate::state::RuntimeState;

/// Holds at most one loaded action for the life of the process.
///
/// 1. [`init`](Self::init) parses the init document, loads the archive and
///    entry point, and moves the runtime to `Initialized`. It succeeds once.
/// 2. [`run`](Self::run) parses a run document and invokes the loaded action,
///    any number of times.
///
/// Parsing and loading run on the blocking pool. Loaded code has no
/// timeout; a run that never returns holds its blocking thread forever.
pub struct ActionRuntime {
    loader: Arc<ActionLoader>,
    spill_dir: Option<PathBuf>,
    activation_log: Arc<dyn ActivationLog>,
    // Both are shared with the blocking init task, so a cancelled request
    // cannot release the lock before the load it started has settled.
    init_lock: Arc<Mutex<()>>,
    action: Arc<OnceLock<Arc<LoadedAction>>>,
}

impl ActionRuntime {
    /// A runtime that loads with `loader` and signals activations on stderr.
    pub fn new(loader: ActionLoader) -> Self {
        Self {
            loader: Arc::new(loader),
            spill_dir: None,
            activation_log: Arc::new(StderrActivationLog),
            init_lock: Arc::new(Mutex::new(())),
            action: Arc::new(OnceLock::new()),
        }
    }

    /// Directory extracted archives are written to. Defaults to the system
    /// temporary directory.
    pub fn with_spill_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spill_dir = Some(dir.into());
        self
    }

    pub fn with_activation_log(mut self, log: Arc<dyn ActivationLog>) -> Self {
        self.activation_log = log;
        self
    }

    pub fn state(&self) -> RuntimeState {
        match self.action.get() {
            None => RuntimeState::Uninitialized,
            Some(action) => RuntimeState::Initialized {
                entry_point: action.entry_point().to_owned(),
                archive: action.archive_path().to_path_buf(),
            },
        }
    }

    /// Load the action described by the init document in `body`.
    ///
    /// Concurrent calls are serialised; exactly one can succeed. Once
    /// initialized, every call fails with
    /// [`AlreadyInitialized`](RuntimeError::AlreadyInitialized) without
    /// reading `body`. A failed init leaves the runtime uninitialized and
    /// removes any archive it extracted.
    ///
    /// Dropping the returned future does not abandon the load: the blocking
    /// task keeps the init lock and records the action itself, so later
    /// calls see its outcome.
    pub async fn init<B>(&self, body: B) -> Result<(), RuntimeError>
    where
        B: Read + Send + 'static,
    {
        tracing::info!("initialize");
        let result = self.try_init(body).await;
        match &result {
            Ok(()) => tracing::info!("initialization finished"),
            Err(error) => tracing::error!(error = ?error, "error during initialization: {error}"),
        }
        result
    }

    async fn try_init<B>(&self, body: B) -> Result<(), RuntimeError>
    where
        B: Read + Send + 'static,
    {
        let serial = Arc::clone(&self.init_lock).lock_owned().await;
        if self.action.get().is_some() {
            return Err(RuntimeError::AlreadyInitialized);
        }

        let loader = Arc::clone(&self.loader);
        let slot = Arc::clone(&self.action);
        let spill_dir = self.spill_dir.clone();
        tokio::task::spawn_blocking(move || -> Result<(), RuntimeError> {
            let _serial = serial;
            let parser = Parser::new(body).with_matcher(CodeArchive);
            let parser = match spill_dir {
                Some(dir) => parser.spill_to(dir),
                None => parser,
            };
            let request = InitRequest::try_from(parser.parse()?)?;
            tracing::debug!(
                entry_point = %request.entry_point,
                archive = %request.code.path().display(),
                "init document accepted"
            );
            let action = loader.load(request.code, &request.entry_point)?;
            slot.set(Arc::new(action)).map_err(|_| RuntimeError::AlreadyInitialized)
        })
        .await
        .map_err(lost_task)?
    }

    /// Invoke the loaded action with the run document in `body`.
    ///
    /// The end-of-activation signal is sent exactly once per call, whatever
    /// the outcome.
    pub async fn run<B>(&self, body: B) -> Result<Object, RuntimeError>
    where
        B: Read + Send + 'static,
    {
        let _boundary = ActivationBoundary::open(Arc::clone(&self.activation_log));
        tracing::info!("running");
        let result = self.try_run(body).await;
        match &result {
            Ok(_) => tracing::info!("run finished"),
            Err(error) if error.is_lifecycle() => tracing::warn!("{error}"),
            Err(error) => tracing::error!(error = ?error, "error during run: {error}"),
        }
        result
    }

    async fn try_run<B>(&self, body: B) -> Result<Object, RuntimeError>
    where
        B: Read + Send + 'static,
    {
        let action = self
            .action
            .get()
            .map(Arc::clone)
            .ok_or(RuntimeError::Uninitialized)?;

        tokio::task::spawn_blocking(move || -> Result<Object, RuntimeError> {
            let RunRequest { input, env } = RunRequest::try_from(cirrus_json::from_reader(body)?)?;
            action.invoke(input, env).map_err(RuntimeError::from)
        })
        .await
        .map_err(lost_task)?
    }
}

impl std::fmt::Debug for ActionRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRuntime")
            .field("state", &self.state())
            .field("spill_dir", &self.spill_dir)
            .finish_non_exhaustive()
    }
}

fn lost_task(error: JoinError) -> RuntimeError {
    RuntimeError::Internal(format!("blocking task failed: {error}"))
}
