//! Fixed endpoint list taken straight from configuration.

use async_trait::async_trait;

use crate::discovery::{DiscoveryError, Resolver};

#[derive(Debug, Clone)]
pub struct StaticResolver {
    endpoints: Vec<String>,
}

impl StaticResolver {
    pub fn new(endpoints: Vec<String>) -> Self {
        Self { endpoints }
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve(&self, _key: &str) -> Result<Vec<String>, DiscoveryError> {
        Ok(self.endpoints.clone())
    }
}
