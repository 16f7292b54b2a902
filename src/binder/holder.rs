use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::warn;

use crate::session::{ExecutorType, Session};

/// Per-unit-of-work record for one bound physical session.
///
/// The reference count tracks outstanding acquisitions. Reaching zero does
/// not close the session: later calls in the same unit of work may
/// re-acquire it, so closing is deferred to the completion callback.
pub struct SessionHolder {
    session: Arc<dyn Session>,
    executor: ExecutorType,
    ref_count: AtomicUsize,
    synchronized: AtomicBool,
    rollback_only: AtomicBool,
    created_here: bool,
}

impl SessionHolder {
    /// Holder for a session the binder opened itself. The binder closes it
    /// at unit-of-work completion.
    pub fn created(session: Arc<dyn Session>, executor: ExecutorType) -> Self {
        Self::build(session, executor, true)
    }

    /// Holder for a caller-supplied session. The binder never closes it;
    /// its lifecycle belongs to whoever bound it.
    pub fn external(session: Arc<dyn Session>, executor: ExecutorType) -> Self {
        Self::build(session, executor, false)
    }

    fn build(session: Arc<dyn Session>, executor: ExecutorType, created_here: bool) -> Self {
        Self {
            session,
            executor,
            ref_count: AtomicUsize::new(0),
            synchronized: AtomicBool::new(false),
            rollback_only: AtomicBool::new(false),
            created_here,
        }
    }

    pub fn session(&self) -> Arc<dyn Session> {
        Arc::clone(&self.session)
    }

    pub fn executor_type(&self) -> ExecutorType {
        self.executor
    }

    pub fn created_here(&self) -> bool {
        self.created_here
    }

    /// True when `session` is the exact session this holder wraps.
    pub fn holds(&self, session: &Arc<dyn Session>) -> bool {
        Arc::ptr_eq(&self.session, session)
    }

    pub fn requested(&self) {
        self.ref_count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn released(&self) {
        let result = self
            .ref_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                count.checked_sub(1)
            });
        if result.is_err() {
            warn!("session holder released more times than it was requested");
        }
    }

    pub fn ref_count(&self) -> usize {
        self.ref_count.load(Ordering::SeqCst)
    }

    /// Marks the holder as owned by the current unit of work. Only
    /// synchronized holders are eligible for reuse by the binder.
    pub fn mark_synchronized(&self) {
        self.synchronized.store(true, Ordering::SeqCst);
    }

    pub fn is_synchronized(&self) -> bool {
        self.synchronized.load(Ordering::SeqCst)
    }

    /// Flags the session as dirty beyond repair. The transaction authority
    /// consults this when deciding the unit-of-work outcome.
    pub fn set_rollback_only(&self) {
        self.rollback_only.store(true, Ordering::SeqCst);
    }

    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::tests_support::null_session;

    #[test]
    fn test_reference_counting() {
        let holder = SessionHolder::created(null_session(), ExecutorType::Simple);
        assert_eq!(holder.ref_count(), 0);

        holder.requested();
        holder.requested();
        holder.released();
        assert_eq!(holder.ref_count(), 1);
    }

    #[test]
    fn test_release_never_underflows() {
        let holder = SessionHolder::created(null_session(), ExecutorType::Simple);
        holder.released();
        assert_eq!(holder.ref_count(), 0);
    }

    #[test]
    fn test_rollback_only_round_trips() {
        let holder = SessionHolder::external(null_session(), ExecutorType::Batch);
        assert!(!holder.is_rollback_only());
        holder.set_rollback_only();
        assert!(holder.is_rollback_only());
        assert!(!holder.created_here());
    }

    #[test]
    fn test_holds_compares_identity_not_content() {
        let session = null_session();
        let holder = SessionHolder::created(Arc::clone(&session), ExecutorType::Simple);
        assert!(holder.holds(&session));
        assert!(!holder.holds(&null_session()));
    }
}
