// ============================================================================
// SessionBind Library
// ============================================================================

pub mod accessor;
pub mod binder;
pub mod core;
pub mod facade;
pub mod scope;
pub mod session;

pub mod prelude;

// Re-export main types for convenience
pub use core::{ErrorTranslator, Result, SessionError};
pub use facade::BoundSession;
pub use session::{
    BatchResult, Configuration, ExecutorType, Param, RawConnection, Row, RowBounds, RowCursor,
    RowHandler, Session, SessionFactory,
};

// Re-export the binding API
pub use binder::SessionHolder;
pub use scope::{
    BindingKey, CompletionCallback, ContextScope, DEFAULT_COMPLETION_ORDER, NoTransaction,
    SESSION_CLEANUP_ORDER, ScopeProvider, SharedScope, TransactionContext, TransactionOutcome,
    TransactionRegistry,
};

// Re-export the accessor registry API
pub use accessor::{
    AccessorBinding, AccessorConstructor, AccessorDescriptor, AccessorScanner, BindingRegistry,
    DescriptorKind, SessionSource, SourceResolver,
};
