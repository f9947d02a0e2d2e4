//! Curator configuration.

use crate::dispatch::{DispatcherConfig, RefreshPolicy};

/// Default page size of admin lists.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Configuration for a ranking loop against a CMS.
#[derive(Clone)]
pub struct CuratorConfig {
    /// CMS base URL.
    pub cms_url: String,

    /// Bearer token for CMS writes.
    /// If None, requests are sent unauthenticated.
    pub api_token: Option<String>,

    /// Items per page.
    pub page_size: u32,

    /// Maximum rank writes in flight per save.
    /// None = the whole changeset at once.
    pub max_concurrent_writes: Option<usize>,

    /// Whether to refetch after a failed save.
    pub refresh_policy: RefreshPolicy,
}

impl CuratorConfig {
    /// Config for the given CMS with defaults elsewhere.
    pub fn new(cms_url: impl Into<String>) -> Self {
        Self {
            cms_url: cms_url.into(),
            ..Default::default()
        }
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Set page size (at least 1).
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_max_concurrent_writes(mut self, max: Option<usize>) -> Self {
        self.max_concurrent_writes = max.map(|m| m.max(1));
        self
    }

    pub fn with_refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }

    /// Dispatcher settings derived from this config.
    pub fn dispatcher(&self) -> DispatcherConfig {
        DispatcherConfig {
            max_concurrent: self.max_concurrent_writes,
            refresh: self.refresh_policy,
        }
    }
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            cms_url: "http://localhost:8080".to_string(),
            api_token: None,
            page_size: DEFAULT_PAGE_SIZE,
            max_concurrent_writes: None,
            refresh_policy: RefreshPolicy::OnSuccess,
        }
    }
}

impl std::fmt::Debug for CuratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CuratorConfig")
            .field("cms_url", &self.cms_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("page_size", &self.page_size)
            .field("max_concurrent_writes", &self.max_concurrent_writes)
            .field("refresh_policy", &self.refresh_policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CuratorConfig::default();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert!(config.max_concurrent_writes.is_none());
        assert_eq!(config.refresh_policy, RefreshPolicy::OnSuccess);
    }

    #[test]
    fn test_builders_clamp() {
        let config = CuratorConfig::new("http://cms")
            .with_page_size(0)
            .with_max_concurrent_writes(Some(0));
        assert_eq!(config.cms_url, "http://cms");
        assert_eq!(config.page_size, 1);
        assert_eq!(config.dispatcher().max_concurrent, Some(1));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = CuratorConfig::default().with_api_token("s3cret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("redacted"));
    }
}
