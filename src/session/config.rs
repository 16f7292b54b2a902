use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::accessor::AccessorDescriptor;
use crate::core::{Result, SessionError};

use super::{ExecutorType, Session};

/// Engine-facing configuration: the default executor strategy plus the
/// registry of accessor interfaces known to the engine.
///
/// Shared behind an `Arc` by the factory and every session it opens.
pub struct Configuration {
    default_executor: ExecutorType,
    accessors: RwLock<HashMap<TypeId, AccessorDescriptor>>,
}

impl Configuration {
    pub fn new(default_executor: ExecutorType) -> Self {
        Self {
            default_executor,
            accessors: RwLock::new(HashMap::new()),
        }
    }

    pub fn default_executor_type(&self) -> ExecutorType {
        self.default_executor
    }

    pub fn has_accessor(&self, type_id: TypeId) -> bool {
        self.read().contains_key(&type_id)
    }

    /// Names of every registered accessor, sorted for stable output.
    pub fn accessor_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .read()
            .values()
            .map(|descriptor| descriptor.name().to_string())
            .collect();
        names.sort();
        names
    }

    /// Registers `descriptor`, validating its structure first. Registering a
    /// type that is already known is an error; use [`ensure_accessor`] for
    /// idempotent registration.
    ///
    /// [`ensure_accessor`]: Configuration::ensure_accessor
    pub fn register_accessor(&self, descriptor: AccessorDescriptor) -> Result<()> {
        descriptor.validate()?;
        let mut accessors = self.write();
        if accessors.contains_key(&descriptor.type_id()) {
            return Err(SessionError::Configuration(format!(
                "accessor '{}' is already registered",
                descriptor.name()
            )));
        }
        accessors.insert(descriptor.type_id(), descriptor);
        Ok(())
    }

    /// Registers `descriptor` unless its type is already known. The check
    /// and the insert happen under one lock, so concurrent first uses of the
    /// same accessor cannot race each other into an error.
    pub fn ensure_accessor(&self, descriptor: AccessorDescriptor) -> Result<()> {
        descriptor.validate()?;
        let mut accessors = self.write();
        accessors.entry(descriptor.type_id()).or_insert(descriptor);
        Ok(())
    }

    /// Builds the accessor proxy registered under `type_id`, bound to
    /// `session`.
    pub fn instantiate(
        &self,
        type_id: TypeId,
        session: Arc<dyn Session>,
    ) -> Result<Box<dyn Any + Send + Sync>> {
        let constructor = {
            let accessors = self.read();
            let descriptor = accessors.get(&type_id).ok_or_else(|| {
                SessionError::Configuration(
                    "no accessor is registered for the requested type".into(),
                )
            })?;
            descriptor.constructor_fn().ok_or_else(|| {
                SessionError::Configuration(format!(
                    "accessor '{}' has no constructor",
                    descriptor.name()
                ))
            })?
        };
        Ok(constructor(session))
    }

    /// Typed variant of [`instantiate`](Configuration::instantiate).
    pub fn accessor_instance<T: Any + Send + Sync>(
        &self,
        session: Arc<dyn Session>,
    ) -> Result<Box<T>> {
        let instance = self.instantiate(TypeId::of::<T>(), session)?;
        instance.downcast::<T>().map_err(|_| {
            SessionError::Configuration(
                "the registered accessor constructor produced an unexpected type".into(),
            )
        })
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<TypeId, AccessorDescriptor>> {
        self.accessors.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<TypeId, AccessorDescriptor>> {
        self.accessors.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new(ExecutorType::Simple)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Result;
    use crate::session::{BatchResult, Param, RawConnection, Row, RowBounds, RowCursor, RowHandler};

    struct NullSession {
        configuration: Arc<Configuration>,
    }

    impl Session for NullSession {
        fn select_one(&self, _statement: &str, _param: Option<Param>) -> Result<Option<Row>> {
            Ok(None)
        }
        fn select_list(
            &self,
            _statement: &str,
            _param: Option<Param>,
            _bounds: Option<RowBounds>,
        ) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }
        fn select_cursor(&self, _statement: &str, _param: Option<Param>) -> Result<RowCursor> {
            Ok(Box::new(std::iter::empty()))
        }
        fn select_each(
            &self,
            _statement: &str,
            _param: Option<Param>,
            _handler: &mut dyn RowHandler,
        ) -> Result<()> {
            Ok(())
        }
        fn insert(&self, _statement: &str, _param: Option<Param>) -> Result<u64> {
            Ok(0)
        }
        fn update(&self, _statement: &str, _param: Option<Param>) -> Result<u64> {
            Ok(0)
        }
        fn delete(&self, _statement: &str, _param: Option<Param>) -> Result<u64> {
            Ok(0)
        }
        fn flush_statements(&self) -> Result<Vec<BatchResult>> {
            Ok(Vec::new())
        }
        fn clear_cache(&self) -> Result<()> {
            Ok(())
        }
        fn connection(&self) -> Result<RawConnection> {
            Ok(Arc::new(()))
        }
        fn configuration(&self) -> Arc<Configuration> {
            Arc::clone(&self.configuration)
        }
        fn commit(&self, _force: bool) -> Result<()> {
            Ok(())
        }
        fn rollback(&self, _force: bool) -> Result<()> {
            Ok(())
        }
        fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    struct Orders {
        #[allow(dead_code)]
        session: Arc<dyn Session>,
    }

    fn orders_descriptor() -> AccessorDescriptor {
        AccessorDescriptor::interface::<Orders>("app::dao::Orders")
            .operations(2)
            .constructor(|session| Box::new(Orders { session }))
    }

    fn null_session(configuration: &Arc<Configuration>) -> Arc<dyn Session> {
        Arc::new(NullSession {
            configuration: Arc::clone(configuration),
        })
    }

    #[test]
    fn test_register_and_instantiate() {
        let configuration = Arc::new(Configuration::default());
        configuration.register_accessor(orders_descriptor()).unwrap();
        assert!(configuration.has_accessor(TypeId::of::<Orders>()));

        let accessor = configuration
            .accessor_instance::<Orders>(null_session(&configuration))
            .unwrap();
        drop(accessor);
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let configuration = Configuration::default();
        configuration.register_accessor(orders_descriptor()).unwrap();

        let err = configuration.register_accessor(orders_descriptor()).unwrap_err();
        assert!(matches!(err, SessionError::Configuration(_)));
    }

    #[test]
    fn test_ensure_accessor_is_idempotent() {
        let configuration = Configuration::default();
        configuration.ensure_accessor(orders_descriptor()).unwrap();
        configuration.ensure_accessor(orders_descriptor()).unwrap();
        assert_eq!(configuration.accessor_names(), vec!["app::dao::Orders"]);
    }

    #[test]
    fn test_descriptor_without_operations_is_malformed() {
        let configuration = Configuration::default();
        let descriptor = AccessorDescriptor::interface::<Orders>("app::dao::Orders")
            .constructor(|session| Box::new(Orders { session }));

        let err = configuration.register_accessor(descriptor).unwrap_err();
        assert!(matches!(err, SessionError::Configuration(_)));
    }

    #[test]
    fn test_unregistered_accessor_lookup_fails() {
        let configuration = Arc::new(Configuration::default());
        let err = configuration
            .accessor_instance::<Orders>(null_session(&configuration))
            .unwrap_err();
        assert!(matches!(err, SessionError::Configuration(_)));
    }
}
