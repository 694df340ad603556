use serde::Serialize;

/// Default number of consecutive failures a service may accumulate.
///
/// A service whose counter goes past this value is evicted.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Registry configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Consecutive failures tolerated before eviction (evicted when exceeded)
    pub failure_threshold: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }
}

/// A registered backend and its recent health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceEntry {
    pub address: String,
    pub consecutive_failures: u32,
}

impl ServiceEntry {
    pub fn new(address: String) -> Self {
        Self {
            address,
            consecutive_failures: 0,
        }
    }
}

/// Known backend services, kept in registration order.
///
/// The registry itself is not synchronized; the router wraps it in an async
/// `RwLock` and every operation below runs inside one critical section.
/// Iteration always happens over an [`addresses`](Self::addresses) snapshot.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: Vec<ServiceEntry>,
    config: RegistryConfig,
}

impl ServiceRegistry {
    /// Create an empty registry
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            services: Vec::new(),
            config,
        }
    }

    /// Create a registry pre-populated with `addresses` (duplicates collapse)
    pub fn with_services(addresses: Vec<String>, config: RegistryConfig) -> Self {
        let mut registry = Self::new(config);
        for address in addresses {
            registry.register(address);
        }
        registry
    }

    /// Register a service, or reset the failure count of a known one.
    ///
    /// Returns `true` if the address was not registered before.
    pub fn register(&mut self, address: String) -> bool {
        match self.find_mut(&address) {
            Some(entry) => {
                entry.consecutive_failures = 0;
                false
            }
            None => {
                self.services.push(ServiceEntry::new(address));
                true
            }
        }
    }

    /// Remove a service. Returns `false` if it was not registered.
    pub fn unregister(&mut self, address: &str) -> bool {
        let before = self.services.len();
        self.services.retain(|s| s.address != address);
        self.services.len() != before
    }

    /// Snapshot of the registered addresses in registration order
    pub fn addresses(&self) -> Vec<String> {
        self.services.iter().map(|s| s.address.clone()).collect()
    }

    /// Snapshot of every entry with its failure count
    pub fn entries(&self) -> Vec<ServiceEntry> {
        self.services.clone()
    }

    /// Look up one entry
    pub fn get(&self, address: &str) -> Option<&ServiceEntry> {
        self.services.iter().find(|s| s.address == address)
    }

    /// Record a failed call against `address`.
    ///
    /// Returns `true` if the failure pushed the counter past the threshold and
    /// the service was evicted. Unknown addresses are ignored.
    pub fn record_failure(&mut self, address: &str) -> bool {
        let threshold = self.config.failure_threshold;
        let exceeded = match self.find_mut(address) {
            Some(entry) => {
                entry.consecutive_failures = entry.consecutive_failures.saturating_add(1);
                entry.consecutive_failures > threshold
            }
            None => return false,
        };

        if exceeded {
            self.unregister(address);
        }
        exceeded
    }

    /// Record a successful call against `address`, restoring full trust.
    pub fn record_success(&mut self, address: &str) {
        if let Some(entry) = self.find_mut(address) {
            entry.consecutive_failures = 0;
        }
    }

    /// Get the number of services
    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn failure_threshold(&self) -> u32 {
        self.config.failure_threshold
    }

    fn find_mut(&mut self, address: &str) -> Option<&mut ServiceEntry> {
        self.services.iter_mut().find(|s| s.address == address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(addresses: &[&str]) -> ServiceRegistry {
        ServiceRegistry::with_services(
            addresses.iter().map(|a| a.to_string()).collect(),
            RegistryConfig::default(),
        )
    }

    #[test]
    fn test_registry_creation() {
        let reg = registry(&["localhost:51000", "localhost:51001"]);
        assert_eq!(reg.len(), 2);
        assert!(!reg.is_empty());
        assert_eq!(reg.failure_threshold(), 5);
    }

    #[test]
    fn test_addresses_keep_registration_order() {
        let mut reg = registry(&["n3", "n1"]);
        reg.register("n2".to_string());
        assert_eq!(reg.addresses(), vec!["n3", "n1", "n2"]);
    }

    #[test]
    fn test_register_is_idempotent_and_resets() {
        let mut reg = registry(&[]);
        assert!(reg.register("n1".to_string()));
        reg.record_failure("n1");
        reg.record_failure("n1");
        assert_eq!(reg.get("n1").unwrap().consecutive_failures, 2);

        assert!(!reg.register("n1".to_string()));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("n1").unwrap().consecutive_failures, 0);
    }

    #[test]
    fn test_unregister() {
        let mut reg = registry(&["n1", "n2", "n3"]);
        assert!(reg.unregister("n2"));
        assert_eq!(reg.addresses(), vec!["n1", "n3"]);
        // absent address is a no-op
        assert!(!reg.unregister("n2"));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_evicted_after_six_failures() {
        let mut reg = registry(&["n1", "n2"]);
        for _ in 0..5 {
            assert!(!reg.record_failure("n1"));
        }
        assert_eq!(reg.get("n1").unwrap().consecutive_failures, 5);
        assert!(reg.addresses().contains(&"n1".to_string()));

        assert!(reg.record_failure("n1"));
        assert_eq!(reg.addresses(), vec!["n2"]);
        assert!(reg.get("n1").is_none());
    }

    #[test]
    fn test_success_resets_counter() {
        let mut reg = registry(&["n1"]);
        for _ in 0..5 {
            reg.record_failure("n1");
        }
        reg.record_success("n1");
        assert_eq!(reg.get("n1").unwrap().consecutive_failures, 0);

        // trust restored: five more failures are tolerated again
        for _ in 0..5 {
            assert!(!reg.record_failure("n1"));
        }
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_failure_on_unknown_address_is_ignored() {
        let mut reg = registry(&["n1"]);
        assert!(!reg.record_failure("ghost"));
        reg.record_success("ghost");
        assert_eq!(reg.addresses(), vec!["n1"]);
    }

    #[test]
    fn test_custom_threshold() {
        let mut reg = ServiceRegistry::new(RegistryConfig { failure_threshold: 0 });
        reg.register("n1".to_string());
        assert!(reg.record_failure("n1"));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_reregister_after_eviction() {
        let mut reg = registry(&["n1"]);
        for _ in 0..6 {
            reg.record_failure("n1");
        }
        assert!(reg.is_empty());

        assert!(reg.register("n1".to_string()));
        assert_eq!(reg.entries(), vec![ServiceEntry::new("n1".to_string())]);
    }

    #[test]
    fn test_duplicate_addresses_collapse() {
        let reg = registry(&["n1", "n1", "n2"]);
        assert_eq!(reg.len(), 2);
    }
}
