pub mod holder;

use std::sync::Arc;

use log::{debug, warn};

use crate::core::{Result, SessionError};
use crate::scope::{BindingKey, SESSION_CLEANUP_ORDER, TransactionOutcome, TransactionRegistry};
use crate::session::{ExecutorType, Session, SessionFactory};

pub use holder::SessionHolder;

/// Returns the session to use for the current call.
///
/// Without an active unit of work the factory opens a fresh session owned
/// outright by the caller, who must close it after the call. Inside a unit
/// of work the session bound for `factory` is reused; the first acquisition
/// opens it, binds it, and schedules its teardown for completion.
pub fn acquire(
    scope: Option<&dyn TransactionRegistry>,
    factory: &Arc<dyn SessionFactory>,
    executor: ExecutorType,
) -> Result<Arc<dyn Session>> {
    let Some(scope) = scope.filter(|scope| scope.is_active()) else {
        debug!("no active unit of work, opening an unmanaged session");
        return factory.open_session(executor);
    };

    let key = BindingKey::of_factory(factory);
    if let Some(holder) = scope.get_resource(key) {
        if holder.is_synchronized() {
            if holder.executor_type() != executor {
                return Err(SessionError::Binding(format!(
                    "cannot change the executor type from {:?} to {:?} inside an active unit of work",
                    holder.executor_type(),
                    executor
                )));
            }
            holder.requested();
            return Ok(holder.session());
        }
    }

    let session = factory.open_session(executor)?;
    let holder = Arc::new(SessionHolder::created(Arc::clone(&session), executor));
    scope.bind_resource(key, Arc::clone(&holder))?;

    let cleanup_holder = Arc::clone(&holder);
    let registered = scope.register_completion(
        SESSION_CLEANUP_ORDER,
        Box::new(move |registry, outcome| cleanup(registry, key, &cleanup_holder, outcome)),
    );
    if let Err(err) = registered {
        // do not leave a holder bound without a teardown path
        scope.unbind_resource(key);
        return Err(err);
    }

    holder.mark_synchronized();
    holder.requested();
    debug!("bound a new session for the current unit of work");
    Ok(session)
}

/// True iff `session` is the one bound for `factory` in the active unit of
/// work. A transactional session must not be committed by the caller; the
/// transaction authority owns that decision.
pub fn is_transactional(
    scope: Option<&dyn TransactionRegistry>,
    session: &Arc<dyn Session>,
    factory: &Arc<dyn SessionFactory>,
) -> bool {
    let Some(scope) = scope.filter(|scope| scope.is_active()) else {
        return false;
    };
    scope
        .get_resource(BindingKey::of_factory(factory))
        .is_some_and(|holder| holder.holds(session))
}

/// Hands a session back after one call.
///
/// A bound session only has its reference count decremented; its actual
/// close is deferred to the completion callback even at count zero, because
/// later calls in the same unit of work may still acquire it. Anything else
/// is unmanaged and is closed on the spot.
pub fn release(
    scope: Option<&dyn TransactionRegistry>,
    session: Arc<dyn Session>,
    factory: &Arc<dyn SessionFactory>,
) -> Result<()> {
    let holder = scope.and_then(|scope| scope.get_resource(BindingKey::of_factory(factory)));
    match holder {
        Some(holder) if holder.holds(&session) => {
            holder.released();
            Ok(())
        }
        _ => {
            debug!("closing unmanaged session");
            session.close()
        }
    }
}

fn cleanup(
    registry: &dyn TransactionRegistry,
    key: BindingKey,
    holder: &SessionHolder,
    outcome: TransactionOutcome,
) {
    registry.unbind_resource(key);
    if !holder.created_here() {
        return;
    }
    debug!("closing bound session after {:?} completion", outcome);
    if let Err(err) = holder.session().close() {
        // cleanup must finish for the remaining holders no matter what
        warn!("failed to close session at unit-of-work completion: {err}");
    }
}
