pub mod registry;
pub mod scanner;

use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::core::{Result, SessionError};
use crate::facade::BoundSession;
use crate::scope::ScopeProvider;
use crate::session::{Session, SessionFactory};

pub use registry::BindingRegistry;
pub use scanner::AccessorScanner;

/// Builds the concrete accessor proxy for one descriptor.
pub type AccessorConstructor =
    Arc<dyn Fn(Arc<dyn Session>) -> Box<dyn Any + Send + Sync> + Send + Sync>;

/// What a candidate descriptor denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    /// An interface-shaped accessor contract. The only registrable kind.
    Trait,
    /// A concrete type.
    Struct,
    /// A package-metadata placeholder.
    Module,
}

/// One candidate accessor contract, described as plain data.
///
/// The scanning mechanism that discovers candidates is outside this crate;
/// whatever it is, it reports each candidate as a descriptor carrying the
/// facts the scanner filters on plus the constructor that builds the proxy.
#[derive(Clone)]
pub struct AccessorDescriptor {
    pub(crate) name: String,
    pub(crate) type_id: TypeId,
    pub(crate) kind: DescriptorKind,
    pub(crate) independent: bool,
    pub(crate) operations: usize,
    pub(crate) markers: Vec<String>,
    pub(crate) supertypes: Vec<String>,
    pub(crate) constructor: Option<AccessorConstructor>,
}

impl AccessorDescriptor {
    /// Descriptor for an interface-shaped contract whose proxy is retrieved
    /// as `T`. `name` is the module path the contract lives under.
    pub fn interface<T: Any + Send + Sync>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_id: TypeId::of::<T>(),
            kind: DescriptorKind::Trait,
            independent: true,
            operations: 0,
            markers: Vec::new(),
            supertypes: Vec::new(),
            constructor: None,
        }
    }

    pub fn with_kind(mut self, kind: DescriptorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Marks the descriptor as depending on an enclosing generic context,
    /// which disqualifies it from registration.
    pub fn dependent(mut self) -> Self {
        self.independent = false;
        self
    }

    pub fn operations(mut self, operations: usize) -> Self {
        self.operations = operations;
        self
    }

    /// Attaches a marker-annotation label.
    pub fn marked(mut self, marker: impl Into<String>) -> Self {
        self.markers.push(marker.into());
        self
    }

    /// Records a supertype the contract is assignable to.
    pub fn extends(mut self, supertype: impl Into<String>) -> Self {
        self.supertypes.push(supertype.into());
        self
    }

    pub fn constructor(
        mut self,
        constructor: impl Fn(Arc<dyn Session>) -> Box<dyn Any + Send + Sync> + Send + Sync + 'static,
    ) -> Self {
        self.constructor = Some(Arc::new(constructor));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn kind(&self) -> DescriptorKind {
        self.kind
    }

    pub(crate) fn constructor_fn(&self) -> Option<AccessorConstructor> {
        self.constructor.clone()
    }

    pub(crate) fn in_package(&self, root: &str) -> bool {
        self.name
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with("::"))
    }

    /// Structural validation performed when the descriptor is registered
    /// with a configuration.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.kind != DescriptorKind::Trait {
            return Err(SessionError::Configuration(format!(
                "accessor '{}' does not denote an interface",
                self.name
            )));
        }
        if !self.independent {
            return Err(SessionError::Configuration(format!(
                "accessor '{}' depends on an enclosing generic context",
                self.name
            )));
        }
        if self.operations == 0 {
            return Err(SessionError::Configuration(format!(
                "accessor '{}' declares no operations",
                self.name
            )));
        }
        if self.constructor.is_none() {
            return Err(SessionError::Configuration(format!(
                "accessor '{}' has no constructor",
                self.name
            )));
        }
        Ok(())
    }
}

/// Where a binding's session comes from, in resolution precedence order.
/// Explicit references win over supplied instances, and facades win over
/// factories.
#[derive(Clone)]
pub enum SessionSource {
    FacadeRef(String),
    Facade(Arc<BoundSession>),
    FactoryRef(String),
    Factory(Arc<dyn SessionFactory>),
    /// Left for the host container to resolve by capability type.
    Autowire,
}

/// Container seam consulted when a binding resolves named or autowired
/// session sources.
pub trait SourceResolver {
    fn facade(&self, name: &str) -> Option<Arc<BoundSession>>;

    fn factory(&self, name: &str) -> Option<Arc<dyn SessionFactory>>;

    fn autowired_facade(&self) -> Option<Arc<BoundSession>> {
        None
    }

    fn autowired_factory(&self) -> Option<Arc<dyn SessionFactory>> {
        None
    }

    /// Scope used when the binding has to wrap a bare factory in a facade.
    fn scope(&self) -> Arc<dyn ScopeProvider>;
}

/// One synthesized binding definition: an accessor contract plus the recipe
/// for producing live proxies of it.
#[derive(Clone)]
pub struct AccessorBinding {
    descriptor: AccessorDescriptor,
    source: SessionSource,
    add_to_config: bool,
}

impl AccessorBinding {
    pub fn new(descriptor: AccessorDescriptor, source: SessionSource, add_to_config: bool) -> Self {
        Self {
            descriptor,
            source,
            add_to_config,
        }
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn descriptor(&self) -> &AccessorDescriptor {
        &self.descriptor
    }

    pub fn source(&self) -> &SessionSource {
        &self.source
    }

    pub fn add_to_config(&self) -> bool {
        self.add_to_config
    }

    /// Equivalent bindings describe the same contract, so re-registering one
    /// is a no-op rather than a conflict.
    pub fn is_equivalent(&self, other: &AccessorBinding) -> bool {
        self.descriptor.type_id() == other.descriptor.type_id()
    }

    /// Produces a live proxy instance.
    ///
    /// Resolves the session source, registers the contract with the resolved
    /// configuration on first use (when `add_to_config`), and invokes the
    /// descriptor's constructor. Registration failures wrap their cause in
    /// [`SessionError::BindingConfiguration`].
    pub fn build(&self, resolver: &dyn SourceResolver) -> Result<Box<dyn Any + Send + Sync>> {
        let session = self.resolve_session(resolver)?;
        let configuration = session.configuration();
        if self.add_to_config && !configuration.has_accessor(self.descriptor.type_id()) {
            configuration
                .ensure_accessor(self.descriptor.clone())
                .map_err(|err| SessionError::BindingConfiguration {
                    accessor: self.descriptor.name().to_string(),
                    source: Box::new(err),
                })?;
        }
        configuration.instantiate(self.descriptor.type_id(), session)
    }

    fn resolve_session(&self, resolver: &dyn SourceResolver) -> Result<Arc<dyn Session>> {
        match &self.source {
            SessionSource::FacadeRef(name) => resolver
                .facade(name)
                .map(|facade| facade as Arc<dyn Session>)
                .ok_or_else(|| {
                    SessionError::Binding(format!("no session facade is named '{name}'"))
                }),
            SessionSource::Facade(facade) => Ok(Arc::clone(facade) as Arc<dyn Session>),
            SessionSource::FactoryRef(name) => {
                let factory = resolver.factory(name).ok_or_else(|| {
                    SessionError::Binding(format!("no session factory is named '{name}'"))
                })?;
                Ok(Arc::new(BoundSession::new(factory, resolver.scope())) as Arc<dyn Session>)
            }
            SessionSource::Factory(factory) => Ok(Arc::new(BoundSession::new(
                Arc::clone(factory),
                resolver.scope(),
            )) as Arc<dyn Session>),
            SessionSource::Autowire => {
                if let Some(facade) = resolver.autowired_facade() {
                    return Ok(facade as Arc<dyn Session>);
                }
                let factory = resolver.autowired_factory().ok_or_else(|| {
                    SessionError::Binding(
                        "no session facade or factory is available for autowiring".into(),
                    )
                })?;
                Ok(Arc::new(BoundSession::new(factory, resolver.scope())) as Arc<dyn Session>)
            }
        }
    }
}
