//! Library system adapter registry.
//!
//! The [`AdapterRegistry`] maps each [`LibrarySystem`] to its
//! [`LibraryAdapter`]. Adding a system means registering another adapter
//! here; callers only ever go through [`AdapterRegistry::resolve`].

use std::collections::HashMap;

use tracing::{debug, warn};

use super::nwpl::{NwplCatalogClient, NwplEndpoints, NwplSessionAcquirer};
use super::{LibraryAdapter, LibraryError, LibrarySystem};

/// Builds the registry used by sync and CLI flows.
///
/// A system whose adapter cannot be constructed is left out with a warning;
/// cards on that system then fail individually with `UnsupportedSystem`.
#[must_use]
pub fn build_default_adapter_registry(nwpl: &NwplEndpoints) -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();

    let nwpl_adapter = NwplSessionAcquirer::with_endpoints(nwpl.clone()).and_then(|acquirer| {
        let catalog = NwplCatalogClient::with_endpoints(nwpl.clone())?;
        Ok(LibraryAdapter::new(
            LibrarySystem::Nwpl,
            Box::new(acquirer),
            Box::new(catalog),
        ))
    });
    match nwpl_adapter {
        Ok(adapter) => registry.register(adapter),
        Err(error) => warn!(
            error = %error,
            "NWPL adapter unavailable; continuing without it"
        ),
    }

    registry
}

/// Lookup table from library system to adapter.
pub struct AdapterRegistry {
    adapters: HashMap<LibrarySystem, LibraryAdapter>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Registers an adapter, replacing any previous one for the same system.
    #[tracing::instrument(skip(self, adapter), fields(system = %adapter.system()))]
    pub fn register(&mut self, adapter: LibraryAdapter) {
        debug!("Registering library adapter");
        self.adapters.insert(adapter.system(), adapter);
    }

    /// Returns the adapter for a symbolic system identifier.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::UnsupportedSystem`] for an unknown identifier
    /// or a known system with no registered adapter.
    pub fn resolve(&self, system_id: &str) -> Result<&LibraryAdapter, LibraryError> {
        let system: LibrarySystem = system_id.parse()?;
        self.resolve_system(system)
    }

    /// Returns the adapter for a parsed system.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::UnsupportedSystem`] if no adapter is registered.
    pub fn resolve_system(&self, system: LibrarySystem) -> Result<&LibraryAdapter, LibraryError> {
        self.adapters.get(&system).ok_or_else(|| {
            LibraryError::unsupported_system(system.as_str(), &self.registered_ids())
        })
    }

    /// Number of registered adapters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    fn registered_ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = self.adapters.keys().map(LibrarySystem::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("systems", &self.registered_ids())
            .finish()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
