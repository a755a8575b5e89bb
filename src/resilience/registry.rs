//! Circuit breaker registry
//!
//! Breakers are created on first use and shared afterwards. A name with a
//! configured override gets that configuration; the well-known service names
//! get their presets; anything else gets the defaults.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use super::circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerSnapshot,
};

/// Breaker name for the chat platform API
pub const MESSAGING_API: &str = "messaging_api";
/// Breaker name for the payment processor
pub const PAYMENT_API: &str = "payment_api";
/// Breaker name for the persistence layer
pub const DATABASE: &str = "database";

/// Registry of named circuit breakers
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
    overrides: HashMap<String, CircuitBreakerConfig>,
}

impl CircuitBreakerRegistry {
    /// Create an empty registry with no overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry whose breakers use the given per-service configurations
    pub fn with_overrides(overrides: HashMap<String, CircuitBreakerConfig>) -> Self {
        Self {
            breakers: Mutex::new(HashMap::new()),
            overrides,
        }
    }

    /// Configuration a breaker with this name would be created with
    pub fn config_for(&self, name: &str) -> CircuitBreakerConfig {
        if let Some(config) = self.overrides.get(name) {
            return config.clone();
        }
        match name {
            MESSAGING_API => CircuitBreakerConfig::messaging(),
            PAYMENT_API => CircuitBreakerConfig::payments(),
            DATABASE => CircuitBreakerConfig::database(),
            _ => CircuitBreakerConfig::default(),
        }
    }

    /// Get the breaker for `name`, creating it on first use
    pub fn get(&self, name: &str) -> Arc<CircuitBreaker> {
        let config = self.config_for(name);
        self.get_or_create(name, config)
    }

    /// Get the breaker for `name`, creating it with `config` on first use
    ///
    /// `config` is ignored if the breaker already exists.
    pub fn get_or_create(&self, name: &str, config: CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        let mut breakers = self.lock();
        if let Some(existing) = breakers.get(name) {
            return Arc::clone(existing);
        }

        debug!("Creating circuit breaker '{}' ({:?})", name, config);
        let breaker = Arc::new(CircuitBreaker::new(name, config));
        breakers.insert(name.to_string(), Arc::clone(&breaker));
        breaker
    }

    /// Breaker for the chat platform API
    pub fn messaging(&self) -> Arc<CircuitBreaker> {
        self.get(MESSAGING_API)
    }

    /// Breaker for the payment processor
    pub fn payments(&self) -> Arc<CircuitBreaker> {
        self.get(PAYMENT_API)
    }

    /// Breaker for the persistence layer
    pub fn database(&self) -> Arc<CircuitBreaker> {
        self.get(DATABASE)
    }

    /// Run `operation` through the named breaker
    pub async fn call<F, Fut, T, E>(
        &self,
        name: &str,
        operation: F,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let breaker = self.get(name);
        breaker.call(operation).await
    }

    /// Names of the breakers created so far
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshots of every breaker created so far, by name
    pub fn all_states(&self) -> BTreeMap<String, CircuitBreakerSnapshot> {
        let breakers: Vec<Arc<CircuitBreaker>> = self.lock().values().cloned().collect();
        breakers
            .into_iter()
            .map(|b| (b.name().to_string(), b.get_state()))
            .collect()
    }

    /// Reset every breaker to Closed
    pub fn reset_all(&self) {
        let breakers: Vec<Arc<CircuitBreaker>> = self.lock().values().cloned().collect();
        for breaker in &breakers {
            breaker.reset();
        }
        info!("Reset {} circuit breakers", breakers.len());
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<CircuitBreaker>>> {
        self.breakers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
