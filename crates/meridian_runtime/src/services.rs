//! Named service capabilities.
//!
//! Services are the only door to the outside world for resolvers: databases,
//! RNGs, clocks, remote APIs. Handlers never see them directly; anything a
//! handler needs from a service must flow through a resolver output so it is
//! recorded.

use indexmap::IndexMap;
use std::any::Any;
use std::sync::Arc;

/// Named `Arc<dyn Any>` capabilities with typed lookup
#[derive(Default)]
pub struct ServiceRegistry {
    services: IndexMap<String, Arc<dyn Any + Send + Sync>>,
}

impl ServiceRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service under a name, replacing any previous binding
    pub fn register<T: Any + Send + Sync>(&mut self, name: impl Into<String>, service: Arc<T>) {
        self.services.insert(name.into(), service);
    }

    /// Look up a service by name and concrete type
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.services
            .get(name)
            .cloned()
            .and_then(|service| service.downcast::<T>().ok())
    }

    /// Whether a name is bound
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Registered names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("names", &self.services.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CounterService {
        start: u64,
    }

    #[test]
    fn test_typed_lookup() {
        let mut registry = ServiceRegistry::new();
        registry.register("counter", Arc::new(CounterService { start: 7 }));

        let service = registry.get::<CounterService>("counter").unwrap();
        assert_eq!(service.start, 7);
        assert!(registry.contains("counter"));
    }

    #[test]
    fn test_wrong_type_is_none() {
        let mut registry = ServiceRegistry::new();
        registry.register("counter", Arc::new(CounterService { start: 0 }));
        assert!(registry.get::<String>("counter").is_none());
    }

    #[test]
    fn test_missing_name_is_none() {
        let registry = ServiceRegistry::new();
        assert!(registry.get::<CounterService>("counter").is_none());
    }
}
