use std::any::Any;
use std::sync::Arc;

use log::warn;

use crate::binder;
use crate::core::{ErrorTranslator, Result, SessionError};
use crate::scope::ScopeProvider;
use crate::session::{
    BatchResult, Configuration, ExecutorType, Param, RawConnection, Row, RowBounds, RowCursor,
    RowHandler, Session, SessionFactory,
};

/// Delegating [`Session`] that always executes against the session bound to
/// the calling task's current unit of work.
///
/// Every data-touching call acquires the correctly scoped session from the
/// binder, runs the real operation, commits when (and only when) the session
/// is not owned by an ambient transaction, and releases the session again.
/// The facade itself holds no mutable per-call state, so one instance can be
/// shared by every accessor in the program across any number of concurrent
/// units of work.
///
/// Transaction boundaries belong to the surrounding authority: calling
/// `commit`, `rollback`, or `close` on a facade is always an error.
pub struct BoundSession {
    factory: Arc<dyn SessionFactory>,
    executor: ExecutorType,
    translator: Option<Arc<dyn ErrorTranslator>>,
    scope: Arc<dyn ScopeProvider>,
}

impl BoundSession {
    /// Facade over `factory` using the factory's default executor type.
    pub fn new(factory: Arc<dyn SessionFactory>, scope: Arc<dyn ScopeProvider>) -> Self {
        let executor = factory.configuration().default_executor_type();
        Self::with_executor(factory, executor, scope)
    }

    pub fn with_executor(
        factory: Arc<dyn SessionFactory>,
        executor: ExecutorType,
        scope: Arc<dyn ScopeProvider>,
    ) -> Self {
        Self {
            factory,
            executor,
            translator: None,
            scope,
        }
    }

    pub fn with_translator(
        factory: Arc<dyn SessionFactory>,
        executor: ExecutorType,
        translator: Arc<dyn ErrorTranslator>,
        scope: Arc<dyn ScopeProvider>,
    ) -> Self {
        Self {
            factory,
            executor,
            translator: Some(translator),
            scope,
        }
    }

    pub fn factory(&self) -> &Arc<dyn SessionFactory> {
        &self.factory
    }

    pub fn executor_type(&self) -> ExecutorType {
        self.executor
    }

    pub fn translator(&self) -> Option<&Arc<dyn ErrorTranslator>> {
        self.translator.as_ref()
    }

    /// Builds the accessor registered for `T`, bound to this facade so that
    /// every call the accessor makes re-enters the interception path.
    pub fn accessor<T: Any + Send + Sync>(self: &Arc<Self>) -> Result<Box<T>> {
        let session = Arc::clone(self) as Arc<dyn Session>;
        self.factory.configuration().accessor_instance::<T>(session)
    }

    /// One intercepted call: acquire, execute, apply commit and translation
    /// policy, release.
    fn invoke<T>(&self, op: impl FnOnce(&dyn Session) -> Result<T>) -> Result<T> {
        let scope = self.scope.current();
        let scope = scope.as_deref();

        let session = binder::acquire(scope, &self.factory, self.executor)?;
        let mut held = Some(Arc::clone(&session));

        let outcome = op(session.as_ref()).and_then(|value| {
            if !binder::is_transactional(scope, &session, &self.factory) {
                // some engines insist on an explicit commit or rollback
                // before a session is released, even when nothing was
                // written, so this commit is unconditional
                session.commit(true)?;
            }
            Ok(value)
        });

        let outcome = outcome.map_err(|err| {
            let cause = err.unwrap_invocation();
            match &self.translator {
                Some(translator) if cause.is_persistence() => {
                    // hand the connection back before translating so the
                    // translator cannot hold it across its own lookups
                    if let Some(session) = held.take() {
                        if let Err(release_err) =
                            binder::release(scope, session, &self.factory)
                        {
                            warn!(
                                "failed to release session after a persistence failure: {release_err}"
                            );
                        }
                    }
                    translator.translate(&cause).unwrap_or(cause)
                }
                _ => cause,
            }
        });

        match held.take() {
            None => outcome,
            Some(session) => match (outcome, binder::release(scope, session, &self.factory)) {
                (Ok(value), Ok(())) => Ok(value),
                (Ok(_), Err(release_err)) => Err(release_err),
                (Err(err), Ok(())) => Err(err),
                (Err(err), Err(release_err)) => {
                    warn!("failed to release session after a failed call: {release_err}");
                    Err(err)
                }
            },
        }
    }
}

impl Session for BoundSession {
    fn select_one(&self, statement: &str, param: Option<Param>) -> Result<Option<Row>> {
        self.invoke(move |session| session.select_one(statement, param))
    }

    fn select_list(
        &self,
        statement: &str,
        param: Option<Param>,
        bounds: Option<RowBounds>,
    ) -> Result<Vec<Row>> {
        self.invoke(move |session| session.select_list(statement, param, bounds))
    }

    fn select_cursor(&self, statement: &str, param: Option<Param>) -> Result<RowCursor> {
        self.invoke(move |session| session.select_cursor(statement, param))
    }

    fn select_each(
        &self,
        statement: &str,
        param: Option<Param>,
        handler: &mut dyn RowHandler,
    ) -> Result<()> {
        self.invoke(move |session| session.select_each(statement, param, handler))
    }

    fn insert(&self, statement: &str, param: Option<Param>) -> Result<u64> {
        self.invoke(move |session| session.insert(statement, param))
    }

    fn update(&self, statement: &str, param: Option<Param>) -> Result<u64> {
        self.invoke(move |session| session.update(statement, param))
    }

    fn delete(&self, statement: &str, param: Option<Param>) -> Result<u64> {
        self.invoke(move |session| session.delete(statement, param))
    }

    fn flush_statements(&self) -> Result<Vec<BatchResult>> {
        self.invoke(|session| session.flush_statements())
    }

    fn clear_cache(&self) -> Result<()> {
        self.invoke(|session| session.clear_cache())
    }

    fn connection(&self) -> Result<RawConnection> {
        self.invoke(|session| session.connection())
    }

    /// Pass-through to the factory's configuration; never touches the binder.
    fn configuration(&self) -> Arc<Configuration> {
        self.factory.configuration()
    }

    fn commit(&self, _force: bool) -> Result<()> {
        Err(SessionError::UnsupportedOperation("commit"))
    }

    fn rollback(&self, _force: bool) -> Result<()> {
        Err(SessionError::UnsupportedOperation("rollback"))
    }

    fn close(&self) -> Result<()> {
        Err(SessionError::UnsupportedOperation("close"))
    }
}
