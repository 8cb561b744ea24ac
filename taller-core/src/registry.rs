use std::collections::HashMap;
use std::sync::Arc;

use crate::TallerService;

/// Maps service names (`"clientes"`, `"citas"`, ...) to service instances.
pub struct TallerServiceRegistry<R, P = ()> {
    services: HashMap<String, Arc<dyn TallerService<R, P>>>,
}

impl<R, P> TallerServiceRegistry<R, P> {
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    pub fn register<S>(&mut self, name: S, service: Arc<dyn TallerService<R, P>>)
    where
        S: Into<String>,
    {
        let name = name.into();
        if self.services.insert(name.clone(), service).is_some() {
            tracing::warn!(service = %name, "service re-registered, previous instance replaced");
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn TallerService<R, P>>> {
        self.services.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.keys().cloned().collect();
        names.sort();
        names
    }
}

impl<R, P> Default for TallerServiceRegistry<R, P> {
    fn default() -> Self {
        Self::new()
    }
}
