//! Handler-name to provider resolution.
//!
//! # Responsibilities
//! - Keep the ordered list of provider types
//! - Find the first provider declaring a handler name
//! - Fall back to the default provider, which is always consulted last

use std::sync::Arc;

use crate::provider::ProviderType;

/// Ordered provider types plus the default (minimal) provider.
#[derive(Debug, Clone)]
pub struct ProviderResolver {
    providers: Vec<Arc<ProviderType>>,
    default: Arc<ProviderType>,
}

impl ProviderResolver {
    pub fn new(providers: Vec<ProviderType>, default: ProviderType) -> Self {
        Self {
            providers: providers.into_iter().map(Arc::new).collect(),
            default: Arc::new(default),
        }
    }

    /// First provider, in declaration order, that declares `handler`.
    pub fn find(&self, handler: &str) -> Option<&Arc<ProviderType>> {
        self.providers
            .iter()
            .chain(std::iter::once(&self.default))
            .find(|p| p.exposes(handler))
    }

    pub fn default_provider(&self) -> &Arc<ProviderType> {
        &self.default
    }
}
