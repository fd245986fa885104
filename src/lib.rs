pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod storage;

use std::sync::Arc;

use config::AppConfig;
use database::HealthStore;
use storage::ObjectStorage;

/// Shared per-process state handed to every handler through `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn HealthStore>,
    pub storage: Arc<dyn ObjectStorage>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn HealthStore>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            storage,
        }
    }
}
