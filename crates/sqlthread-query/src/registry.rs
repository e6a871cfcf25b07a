// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry of compiled-in drivers, keyed by [`Driver::name`].

use std::collections::HashMap;
use std::sync::Arc;

use sqlthread_core::{Driver, QueryError};

/// Maps driver names from a [`ConnectionSpec`](sqlthread_core::ConnectionSpec)
/// to driver instances.
#[derive(Default, Clone)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a driver under its own name, replacing any previous one.
    pub fn register(&mut self, driver: Arc<dyn Driver>) {
        self.drivers.insert(driver.name().to_string(), driver);
    }

    /// Looks a driver up by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Driver>, QueryError> {
        self.drivers.get(name).cloned().ok_or_else(|| {
            let mut known: Vec<_> = self.drivers.keys().map(String::as_str).collect();
            known.sort_unstable();
            QueryError::Config(format!(
                "unknown driver `{name}` (registered: {})",
                known.join(", ")
            ))
        })
    }

    /// Registered driver names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.drivers.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use sqlthread_test_utils::MockDriver;

    use super::*;

    #[test]
    fn lookup_by_name() {
        let mut registry = DriverRegistry::new();
        registry.register(Arc::new(MockDriver::new()));

        assert_eq!(registry.names(), vec!["mock".to_string()]);
        assert_eq!(registry.get("mock").unwrap().name(), "mock");
    }

    #[test]
    fn unknown_driver_lists_known_ones() {
        let mut registry = DriverRegistry::new();
        registry.register(Arc::new(MockDriver::new()));

        let err = registry.get("oracle").err().unwrap();
        let message = err.to_string();
        assert!(message.contains("oracle"));
        assert!(message.contains("mock"));
    }
}
