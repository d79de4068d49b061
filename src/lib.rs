use std::sync::Arc;

pub mod aggregate;
pub mod bucket;
pub mod cache;
pub mod config;
pub mod dates;
pub mod error;
pub mod models;
pub mod present;
pub mod routes;
pub mod snapshot;
pub mod upstream;
pub mod view_state;
pub mod weeks;

use config::Config;
use upstream::UpstreamClient;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let upstream = UpstreamClient::new(config.upstream_base_url.clone(), config.retry, config.cache);
        Self {
            config: Arc::new(config),
            upstream,
        }
    }
}
