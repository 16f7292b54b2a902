pub mod context;

use std::sync::{Arc, PoisonError, RwLock};

use crate::binder::SessionHolder;
use crate::core::Result;
use crate::session::SessionFactory;

pub use context::TransactionContext;

/// Completion order for the binder's session cleanup callbacks. Lower orders
/// run first, so sessions are torn down before generic completion callbacks
/// that may still observe the registry.
pub const SESSION_CLEANUP_ORDER: i32 = 800;

/// Completion order for callbacks with no ordering requirement.
pub const DEFAULT_COMPLETION_ORDER: i32 = 1000;

/// How the unit of work ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    Committed,
    RolledBack,
    Unknown,
}

/// Callback invoked at most once, when the owning unit of work completes.
pub type CompletionCallback = Box<dyn FnOnce(&dyn TransactionRegistry, TransactionOutcome) + Send>;

/// Identity of a session factory, used as the resource binding key.
///
/// Derived from the factory's allocation, so two clones of the same
/// `Arc<dyn SessionFactory>` produce the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingKey(usize);

impl BindingKey {
    pub fn of_factory(factory: &Arc<dyn SessionFactory>) -> Self {
        Self(Arc::as_ptr(factory) as *const () as usize)
    }
}

/// The transaction authority capability the binder runs against.
///
/// One instance represents one unit of work. The binder never assumes more
/// than this surface, so an authority adapter can substitute its own
/// implementation for [`TransactionContext`].
pub trait TransactionRegistry: Send + Sync {
    /// Whether the unit of work is still running.
    fn is_active(&self) -> bool;

    fn get_resource(&self, key: BindingKey) -> Option<Arc<SessionHolder>>;

    /// Binds `holder` under `key`. Fails when the key is already occupied,
    /// which makes the lookup-then-create decision in the binder atomic:
    /// a losing racer gets an error instead of silently shadowing the
    /// winner's session.
    fn bind_resource(&self, key: BindingKey, holder: Arc<SessionHolder>) -> Result<()>;

    fn unbind_resource(&self, key: BindingKey) -> Option<Arc<SessionHolder>>;

    /// Schedules `callback` to run at completion. Fails once the unit of
    /// work is no longer active.
    fn register_completion(&self, order: i32, callback: CompletionCallback) -> Result<()>;
}

/// Hands the facade the registry for the calling task's current unit of
/// work, if any.
pub trait ScopeProvider: Send + Sync {
    fn current(&self) -> Option<Arc<dyn TransactionRegistry>>;
}

/// Provider for callers operating outside any unit of work. Every call made
/// through a facade built on this provider runs on its own auto-committed
/// session.
pub struct NoTransaction;

impl ScopeProvider for NoTransaction {
    fn current(&self) -> Option<Arc<dyn TransactionRegistry>> {
        None
    }
}

/// Provider pinned to one explicit context.
pub struct ContextScope {
    context: Arc<TransactionContext>,
}

impl ContextScope {
    pub fn new(context: Arc<TransactionContext>) -> Self {
        Self { context }
    }
}

impl ScopeProvider for ContextScope {
    fn current(&self) -> Option<Arc<dyn TransactionRegistry>> {
        Some(Arc::clone(&self.context) as Arc<dyn TransactionRegistry>)
    }
}

/// Switchable slot an authority adapter installs the current context into
/// around unit-of-work boundaries. Shared between the adapter and every
/// facade built on it.
#[derive(Default)]
pub struct SharedScope {
    slot: RwLock<Option<Arc<TransactionContext>>>,
}

impl SharedScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `context` as current, returning the previously installed one.
    pub fn enter(&self, context: Arc<TransactionContext>) -> Option<Arc<TransactionContext>> {
        self.slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(context)
    }

    /// Clears the current context.
    pub fn leave(&self) -> Option<Arc<TransactionContext>> {
        self.slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl ScopeProvider for SharedScope {
    fn current(&self) -> Option<Arc<dyn TransactionRegistry>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|context| Arc::clone(context) as Arc<dyn TransactionRegistry>)
    }
}
