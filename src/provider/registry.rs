use crate::error::{PaymentError, PaymentResult};
use crate::provider::adapter::ProviderAdapter;
use std::collections::HashMap;
use std::sync::Arc;

/// Explicitly constructed name-to-adapter registry, injected into the
/// engine. Replaces the source's module-level provider class map; an
/// unknown name is a configuration error, fatal and not retried.
#[derive(Default)]
pub struct ProviderRegistry {
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) -> &mut Self {
        self.adapters.insert(adapter.name().to_string(), adapter);
        self
    }

    pub fn get(&self, name: &str) -> PaymentResult<Arc<dyn ProviderAdapter>> {
        self.adapters
            .get(name)
            .cloned()
            .ok_or_else(|| PaymentError::Configuration {
                message: format!("not found payment provider '{name}'"),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::manual::ManualAdapter;

    #[test]
    fn unknown_provider_is_a_configuration_error() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(ManualAdapter::new(
            "https://pay.example/manual".to_string(),
        )));

        assert!(registry.get("manual").is_ok());
        assert!(matches!(
            registry.get("ghost"),
            Err(PaymentError::Configuration { .. })
        ));
        assert_eq!(registry.names(), ["manual"]);
    }
}
