use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    /// Invalid use of the resource binder: a double bind, a mismatched
    /// release, or an executor-type change inside an active unit of work.
    #[error("resource binding error: {0}")]
    Binding(String),

    #[error("manual {0} is not allowed on a delegated session")]
    UnsupportedOperation(&'static str),

    /// Accessor registration or lookup failed against the session
    /// configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An accessor interface could not be registered with the configuration
    /// on first use. Preserves the underlying cause.
    #[error("failed to register accessor '{accessor}' with the configuration")]
    BindingConfiguration {
        accessor: String,
        #[source]
        source: Box<SessionError>,
    },

    /// Engine failure recognized as a persistence failure. This is the only
    /// class the translation policy applies to.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Replacement produced by an [`ErrorTranslator`]. Preserves the
    /// original persistence failure as its cause.
    #[error("{message}")]
    Translated {
        message: String,
        #[source]
        source: Box<SessionError>,
    },

    /// Engine failure outside the persistence class. Never translated.
    #[error("execution error: {0}")]
    Execution(String),

    /// Failure surfaced through a generated accessor shim. The facade peels
    /// this wrapper off to recover the original cause.
    #[error("delegated invocation failed")]
    Invocation(#[source] Box<SessionError>),
}

pub type Result<T> = std::result::Result<T, SessionError>;

impl SessionError {
    /// True for failures eligible for the translation policy.
    pub fn is_persistence(&self) -> bool {
        matches!(self, SessionError::Persistence(_))
    }

    /// Recovers the original cause from any number of invocation wrappers.
    pub fn unwrap_invocation(self) -> SessionError {
        let mut err = self;
        while let SessionError::Invocation(inner) = err {
            err = *inner;
        }
        err
    }
}

/// Policy hook mapping recognized persistence failures onto caller-facing
/// errors. Returning `None` keeps the original failure.
pub trait ErrorTranslator: Send + Sync {
    fn translate(&self, failure: &SessionError) -> Option<SessionError>;
}
