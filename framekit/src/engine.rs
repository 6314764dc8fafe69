/// Framekit Engine - Global state for the current graphics context
///
/// This module holds the process-wide pieces of state: the pluggable logger,
/// the minimum log level, the current graphics context, and the per-context
/// cached mirror of the platform-provided render target. It uses thread-safe
/// static storage with RwLock for safe concurrent access.

use std::sync::{OnceLock, RwLock, Arc, Mutex};
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::SystemTime;
use rustc_hash::FxHashMap;
use crate::error::{Result, Error};
use crate::graphics_context::{ContextId, SharedContext};
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
use crate::target::RenderTarget;

// ===== INTERNAL STATE =====

/// Global engine state storage
static ENGINE_STATE: OnceLock<EngineState> = OnceLock::new();

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Minimum severity forwarded to the logger
static LOG_LEVEL: AtomicU8 = AtomicU8::new(0);

/// Shared mirror of a context's platform target
pub(crate) type DefaultTargetMirror = Arc<Mutex<RenderTarget>>;

/// Internal state structure holding all engine singletons
struct EngineState {
    /// Context the default render target resolves against
    current_context: RwLock<Option<SharedContext>>,
    /// Cached platform-target mirror, one per context
    default_targets: Mutex<FxHashMap<ContextId, DefaultTargetMirror>>,
}

impl EngineState {
    /// Create a new empty engine state
    fn new() -> Self {
        Self {
            current_context: RwLock::new(None),
            default_targets: Mutex::new(FxHashMap::default()),
        }
    }
}

// ===== PUBLIC API =====

/// Main engine singleton manager
///
/// # Example
///
/// ```no_run
/// use framekit::framekit::Engine;
/// use framekit_renderer_soft::framekit::SoftwareContext;
///
/// Engine::initialize()?;
/// let context = SoftwareContext::new_shared(Default::default());
/// Engine::make_current(context)?;
///
/// // The default render target now resolves against this context
///
/// Engine::shutdown();
/// # Ok::<(), framekit::framekit::Error>(())
/// ```
pub struct Engine;

impl Engine {
    /// Helper to log errors before returning them (internal use)
    fn log_and_return_error(error: Error) -> Error {
        match &error {
            Error::InitializationFailed(msg) => {
                crate::engine_error!("framekit::Engine", "Initialization failed: {}", msg);
            }
            Error::BackendError(msg) => {
                crate::engine_error!("framekit::Engine", "Backend error: {}", msg);
            }
            _ => {
                crate::engine_error!("framekit::Engine", "Engine error: {}", error);
            }
        }
        error
    }

    fn state() -> Result<&'static EngineState> {
        ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
            ))
    }

    /// Initialize the engine
    ///
    /// Idempotent. Must be called before any context is made current.
    pub fn initialize() -> Result<()> {
        ENGINE_STATE.get_or_init(EngineState::new);
        Ok(())
    }

    /// Drop the current context and every cached default-target mirror
    ///
    /// After calling this, render targets still holding a context keep working;
    /// only the default render target loses its context.
    pub fn shutdown() {
        if let Some(state) = ENGINE_STATE.get() {
            // Mirrors first, they hold context references
            if let Ok(mut mirrors) = state.default_targets.lock() {
                mirrors.clear();
            }
            if let Ok(mut current) = state.current_context.write() {
                *current = None;
            }
        }
    }

    // ===== CONTEXT API =====

    /// Make `context` the current graphics context
    ///
    /// The default render target resolves against the current context.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized or a lock is poisoned.
    pub fn make_current(context: SharedContext) -> Result<()> {
        let state = Self::state()?;

        let id = context.lock()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Graphics context lock poisoned".to_string())
            ))?
            .context_id();

        let mut lock = state.current_context.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Current context lock poisoned".to_string())
            ))?;
        *lock = Some(context);

        crate::engine_info!("framekit::Engine", "Context {} made current", id.0);
        Ok(())
    }

    /// Get the current graphics context
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized or no context is current.
    pub fn current_context() -> Result<SharedContext> {
        let state = Self::state()?;

        let lock = state.current_context.read()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Current context lock poisoned".to_string())
            ))?;

        lock.clone()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("No current graphics context. Call Engine::make_current() first.".to_string())
            ))
    }

    /// True if a context is current (never logs)
    pub fn has_current_context() -> bool {
        ENGINE_STATE.get()
            .and_then(|state| state.current_context.read().ok().map(|lock| lock.is_some()))
            .unwrap_or(false)
    }

    /// Forget the current context; cached mirrors are kept
    pub fn clear_current() -> Result<()> {
        let state = Self::state()?;
        let mut lock = state.current_context.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Current context lock poisoned".to_string())
            ))?;
        *lock = None;
        Ok(())
    }

    /// Drop the cached default-target mirror of a context
    ///
    /// Also clears the current context if it is the released one.
    pub fn release_context(id: ContextId) -> Result<()> {
        let state = Self::state()?;

        let removed = state.default_targets.lock()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Default target cache lock poisoned".to_string())
            ))?
            .remove(&id);

        let mut current = state.current_context.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Current context lock poisoned".to_string())
            ))?;
        let is_current = match current.as_ref() {
            Some(context) => context.lock().map(|ctx| ctx.context_id() == id).unwrap_or(false),
            None => false,
        };
        if is_current {
            *current = None;
        }

        if removed.is_some() || is_current {
            crate::engine_info!("framekit::Engine", "Context {} released", id.0);
        }
        Ok(())
    }

    /// Cached mirror of the platform target of `context`, created on first use
    ///
    /// `context` must not be locked by the caller.
    pub(crate) fn default_target(context: &SharedContext) -> Result<DefaultTargetMirror> {
        let state = Self::state()?;

        let id = context.lock()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Graphics context lock poisoned".to_string())
            ))?
            .context_id();

        let mut mirrors = state.default_targets.lock()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Default target cache lock poisoned".to_string())
            ))?;

        if let Some(mirror) = mirrors.get(&id) {
            return Ok(mirror.clone());
        }

        let mirror = Arc::new(Mutex::new(RenderTarget::for_default(context.clone())?));
        mirrors.insert(id, mirror.clone());
        crate::engine_debug!("framekit::Engine", "Default render target cached for context {}", id.0);
        Ok(mirror)
    }

    /// Number of cached default-target mirrors
    pub fn cached_default_target_count() -> usize {
        ENGINE_STATE.get()
            .and_then(|state| state.default_targets.lock().ok().map(|mirrors| mirrors.len()))
            .unwrap_or(0)
    }

    /// Reset all state for testing (only available in test builds)
    #[cfg(test)]
    pub fn reset_for_testing() {
        Self::shutdown();
        LOG_LEVEL.store(LogSeverity::Trace.to_u8(), Ordering::Relaxed);
    }

    // ===== LOGGING API =====

    /// Set a custom logger
    ///
    /// # Example
    ///
    /// ```no_run
    /// use framekit::framekit::{Engine, log::{Logger, LogEntry}};
    ///
    /// struct FileLogger;
    /// impl Logger for FileLogger {
    ///     fn log(&self, entry: &LogEntry) {
    ///         // Write to file...
    ///     }
    /// }
    ///
    /// Engine::set_logger(FileLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Drop every entry below `level`
    pub fn set_log_level(level: LogSeverity) {
        LOG_LEVEL.store(level.to_u8(), Ordering::Relaxed);
    }

    /// Current minimum severity
    pub fn log_level() -> LogSeverity {
        LogSeverity::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like engine_info!, engine_warn!, etc.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        Self::dispatch(severity, source, message, None, None);
    }

    /// Internal logging method with file:line information (for ERROR logs)
    ///
    /// Used by engine_error! macro to include source location.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        Self::dispatch(severity, source, message, Some(file), Some(line));
    }

    fn dispatch(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: Option<&'static str>,
        line: Option<u32>,
    ) {
        if severity < Self::log_level() {
            return;
        }
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file,
                line,
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
