use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};
use uuid::Uuid;

use crate::binder::SessionHolder;
use crate::core::{Result, SessionError};

use super::{BindingKey, CompletionCallback, TransactionOutcome, TransactionRegistry};

/// One unit of work.
///
/// Created by the transaction authority when a logical transaction begins,
/// shared (behind an `Arc`) with every binder call made underneath it, and
/// completed exactly once when the transaction ends. All holder state lives
/// here, which is what keeps concurrent units of work from ever seeing each
/// other's sessions.
pub struct TransactionContext {
    id: Uuid,
    inner: Mutex<Inner>,
}

struct Inner {
    active: bool,
    resources: HashMap<BindingKey, Arc<SessionHolder>>,
    completions: Vec<Registration>,
    next_seq: u64,
}

struct Registration {
    order: i32,
    seq: u64,
    callback: CompletionCallback,
}

impl TransactionContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            inner: Mutex::new(Inner {
                active: true,
                resources: HashMap::new(),
                completions: Vec::new(),
                next_seq: 0,
            }),
        }
    }

    /// Correlation id for log output.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Ends the unit of work: runs every registered completion callback
    /// sorted by order (registration order breaks ties), then reports
    /// holders that were never unbound. Completing twice is a no-op.
    ///
    /// Sessions bound by the binder are closed here, by the binder's own
    /// cleanup callback. Holders still bound afterwards were bound by
    /// someone else, and their sessions are that someone's to close.
    pub fn complete(&self, outcome: TransactionOutcome) {
        let callbacks = {
            let mut inner = self.lock();
            if !inner.active {
                debug!("unit of work {} already completed", self.id);
                return;
            }
            inner.active = false;
            let mut pending = std::mem::take(&mut inner.completions);
            pending.sort_by_key(|registration| (registration.order, registration.seq));
            pending
        };

        debug!(
            "completing unit of work {} as {:?} ({} callbacks)",
            self.id,
            outcome,
            callbacks.len()
        );
        for registration in callbacks {
            (registration.callback)(self, outcome);
        }

        let leftover = {
            let mut inner = self.lock();
            let count = inner.resources.len();
            inner.resources.clear();
            count
        };
        if leftover > 0 {
            warn!(
                "unit of work {} completed with {} resource(s) still bound",
                self.id, leftover
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TransactionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionRegistry for TransactionContext {
    fn is_active(&self) -> bool {
        self.lock().active
    }

    fn get_resource(&self, key: BindingKey) -> Option<Arc<SessionHolder>> {
        self.lock().resources.get(&key).cloned()
    }

    fn bind_resource(&self, key: BindingKey, holder: Arc<SessionHolder>) -> Result<()> {
        let mut inner = self.lock();
        if inner.resources.contains_key(&key) {
            return Err(SessionError::Binding(format!(
                "a session is already bound for this factory in unit of work {}",
                self.id
            )));
        }
        inner.resources.insert(key, holder);
        Ok(())
    }

    fn unbind_resource(&self, key: BindingKey) -> Option<Arc<SessionHolder>> {
        self.lock().resources.remove(&key)
    }

    fn register_completion(&self, order: i32, callback: CompletionCallback) -> Result<()> {
        let mut inner = self.lock();
        if !inner.active {
            return Err(SessionError::Binding(format!(
                "unit of work {} is no longer active",
                self.id
            )));
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.completions.push(Registration {
            order,
            seq,
            callback,
        });
        Ok(())
    }
}
