use std::sync::Arc;

use log::{debug, warn};

use crate::facade::BoundSession;
use crate::session::SessionFactory;

use super::{AccessorBinding, AccessorDescriptor, BindingRegistry, DescriptorKind, SessionSource};

/// Filters candidate accessor descriptors and populates a
/// [`BindingRegistry`] with one binding per accepted descriptor.
///
/// With neither marker configured, every independent interface with at
/// least one operation under the scanned roots is accepted. Configuring a
/// marker annotation and/or a marker supertype restricts acceptance to
/// descriptors matching either one; the marker supertype itself never
/// qualifies, only its proper subtypes do.
pub struct AccessorScanner {
    base_packages: Vec<String>,
    annotation: Option<String>,
    marker_supertype: Option<String>,
    facade_ref: Option<String>,
    facade: Option<Arc<BoundSession>>,
    factory_ref: Option<String>,
    factory: Option<Arc<dyn SessionFactory>>,
    add_to_config: bool,
}

impl AccessorScanner {
    /// `base_packages` holds one or more package roots separated by commas
    /// or semicolons.
    pub fn new(base_packages: &str) -> Self {
        let base_packages = base_packages
            .split([',', ';'])
            .map(str::trim)
            .filter(|root| !root.is_empty())
            .map(String::from)
            .collect();
        Self {
            base_packages,
            annotation: None,
            marker_supertype: None,
            facade_ref: None,
            facade: None,
            factory_ref: None,
            factory: None,
            add_to_config: true,
        }
    }

    pub fn annotation(mut self, marker: impl Into<String>) -> Self {
        self.annotation = Some(marker.into());
        self
    }

    pub fn marker_supertype(mut self, supertype: impl Into<String>) -> Self {
        self.marker_supertype = Some(supertype.into());
        self
    }

    pub fn facade_ref(mut self, name: impl Into<String>) -> Self {
        self.facade_ref = Some(name.into());
        self
    }

    pub fn facade(mut self, facade: Arc<BoundSession>) -> Self {
        self.facade = Some(facade);
        self
    }

    pub fn factory_ref(mut self, name: impl Into<String>) -> Self {
        self.factory_ref = Some(name.into());
        self
    }

    pub fn factory(mut self, factory: Arc<dyn SessionFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Whether synthesized bindings register their contract with the session
    /// configuration on first use. Defaults to true.
    pub fn add_to_config(mut self, add_to_config: bool) -> Self {
        self.add_to_config = add_to_config;
        self
    }

    /// Runs one scan over `candidates`, inserting a binding per accepted
    /// descriptor. Returns how many bindings were actually inserted;
    /// rescanning the same candidates is a no-op.
    pub fn scan(&self, candidates: &[AccessorDescriptor], registry: &mut BindingRegistry) -> usize {
        let source = self.session_source();
        let mut inserted = 0;
        for root in &self.base_packages {
            let mut accepted = 0;
            for descriptor in candidates.iter().filter(|d| d.in_package(root)) {
                if !self.accepts(descriptor) {
                    continue;
                }
                accepted += 1;
                debug!("accepted accessor interface '{}'", descriptor.name());
                let binding =
                    AccessorBinding::new(descriptor.clone(), source.clone(), self.add_to_config);
                if registry.try_insert(binding) {
                    inserted += 1;
                }
            }
            if accepted == 0 {
                warn!("no accessor interfaces were found under '{root}'; check the scan configuration");
            }
        }
        inserted
    }

    fn accepts(&self, descriptor: &AccessorDescriptor) -> bool {
        if descriptor.kind != DescriptorKind::Trait
            || !descriptor.independent
            || descriptor.operations == 0
        {
            return false;
        }
        if self.annotation.is_none() && self.marker_supertype.is_none() {
            return true;
        }
        let annotated = self
            .annotation
            .as_ref()
            .is_some_and(|marker| descriptor.markers.iter().any(|m| m == marker));
        let proper_subtype = self.marker_supertype.as_ref().is_some_and(|supertype| {
            descriptor.name() != supertype
                && descriptor.supertypes.iter().any(|s| s == supertype)
        });
        annotated || proper_subtype
    }

    /// Collapses the configured session sources into one, honouring the
    /// resolution precedence. A factory configured alongside a facade is
    /// ignored.
    fn session_source(&self) -> SessionSource {
        let facade_source = self
            .facade_ref
            .as_ref()
            .map(|name| SessionSource::FacadeRef(name.clone()))
            .or_else(|| {
                self.facade
                    .as_ref()
                    .map(|facade| SessionSource::Facade(Arc::clone(facade)))
            });
        let factory_source = self
            .factory_ref
            .as_ref()
            .map(|name| SessionSource::FactoryRef(name.clone()))
            .or_else(|| {
                self.factory
                    .as_ref()
                    .map(|factory| SessionSource::Factory(Arc::clone(factory)))
            });

        match (facade_source, factory_source) {
            (Some(facade), Some(_)) => {
                warn!("cannot use both a session facade and a session factory; the factory is ignored");
                facade
            }
            (Some(facade), None) => facade,
            (None, Some(factory)) => factory,
            (None, None) => SessionSource::Autowire,
        }
    }
}
