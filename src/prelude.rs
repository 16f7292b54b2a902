//! Recommended API entrypoints grouped by abstraction level.
//!
//! `dx` covers the surface most applications touch: the facade, the scope
//! providers, and the error types. `advanced` is an explicit escape hatch
//! for authority adapters and container integrations that drive the binder
//! or synthesize accessor registries themselves.

pub mod dx {
    //! Stable high-level surface for application code.
    pub use crate::{
        BoundSession, ContextScope, ErrorTranslator, ExecutorType, NoTransaction, Param, Result,
        Row, RowBounds, RowHandler, ScopeProvider, Session, SessionError, SessionFactory,
        SharedScope, TransactionContext, TransactionOutcome,
    };
}

pub mod advanced {
    //! Escape hatch for authority adapters and container integrations.
    //!
    //! App-level product code should normally stay on `prelude::dx`.
    pub use crate::binder;
    pub use crate::{
        AccessorBinding, AccessorDescriptor, AccessorScanner, BindingKey, BindingRegistry,
        CompletionCallback, DEFAULT_COMPLETION_ORDER, DescriptorKind, SESSION_CLEANUP_ORDER,
        SessionHolder, SessionSource, SourceResolver, TransactionRegistry,
    };
}
