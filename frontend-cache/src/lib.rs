//! Frontend Cache
//!
//! Startup sequencing for client-side caches. Each cache registers an async
//! initializer; `initialize` runs them one after another and only then marks
//! the application cache as ready.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;

pub type InitError = Box<dyn std::error::Error>;

type Initializer = Rc<dyn Fn() -> LocalBoxFuture<'static, Result<(), InitError>>>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache has already been initialized")]
    AlreadyInitialized,
    #[error("cache is already initializing")]
    AlreadyInitializing,
    #[error("cache initializer #{index} failed: {message}")]
    InitializerFailed { index: usize, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheState {
    Pending,
    Initializing,
    Initialized,
}

pub struct FrontendCacheService {
    state: Cell<CacheState>,
    initializers: RefCell<Vec<Initializer>>,
}

impl Default for FrontendCacheService {
    fn default() -> Self {
        Self::new()
    }
}

impl FrontendCacheService {
    pub fn new() -> Self {
        FrontendCacheService {
            state: Cell::new(CacheState::Pending),
            initializers: RefCell::new(Vec::new()),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.get() == CacheState::Initialized
    }

    pub fn initializer_count(&self) -> usize {
        self.initializers.borrow().len()
    }

    pub fn register_initializer<F, Fut>(&self, initializer: F) -> Result<(), CacheError>
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<(), InitError>> + 'static,
    {
        self.ensure_pending()?;
        let initializer: Initializer = Rc::new(move || initializer().boxed_local());
        self.initializers.borrow_mut().push(initializer);
        Ok(())
    }

    /// Runs every initializer in registration order, each awaited before the
    /// next one starts. A failure stops the run and leaves the service
    /// uninitialized so the caller can try again.
    pub async fn initialize(&self) -> Result<(), CacheError> {
        self.ensure_pending()?;
        self.state.set(CacheState::Initializing);

        // Snapshot so no borrow is held across an await
        let initializers = self.initializers.borrow().clone();
        tracing::debug!(target: "frontend_cache", "Initializing {} caches", initializers.len());

        for (index, initializer) in initializers.iter().enumerate() {
            if let Err(e) = initializer().await {
                tracing::error!(target: "frontend_cache", "Cache initializer #{} failed: {}", index, e);
                self.state.set(CacheState::Pending);
                return Err(CacheError::InitializerFailed {
                    index,
                    message: e.to_string(),
                });
            }
        }

        self.state.set(CacheState::Initialized);
        tracing::info!(target: "frontend_cache", "Cache initialized");
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), CacheError> {
        match self.state.get() {
            CacheState::Pending => Ok(()),
            CacheState::Initializing => Err(CacheError::AlreadyInitializing),
            CacheState::Initialized => Err(CacheError::AlreadyInitialized),
        }
    }
}

impl std::fmt::Debug for FrontendCacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrontendCacheService")
            .field("state", &self.state.get())
            .field("initializers", &self.initializer_count())
            .finish()
    }
}
