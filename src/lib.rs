// Client core for the taskboard dashboard: session store, credentialed
// request pipeline, task/analytics surfaces, and the batched report fanout.

use std::sync::Once;

use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod auth;
pub mod client;
pub mod config;
pub mod report;
pub mod tasks;

static INIT_TRACING: Once = Once::new();

/// Initialize tracing once for the embedding application. Safe to call from
/// multiple entry points.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();

        info!("taskboard client tracing initialized");
    });
}
