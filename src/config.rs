use serde::Deserialize;

/// Number of secondary lookups issued concurrently per enrichment batch.
pub const LOOKUP_BATCH_SIZE: usize = 5;

/// Well-known name of the persisted credential file.
pub const CREDENTIAL_STORAGE_KEY: &str = "access_token";

/// Default base URL of the task/analytics backend.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Top-level configuration for the dashboard client.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the task/analytics backend, without a trailing slash.
    pub base_url: String,
    /// Directory used for persisted client state (the credential file).
    pub state_dir: String,
    /// Secondary lookups issued concurrently per enrichment batch.
    pub lookup_batch_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            state_dir: String::new(),
            lookup_batch_size: LOOKUP_BATCH_SIZE,
        }
    }
}
