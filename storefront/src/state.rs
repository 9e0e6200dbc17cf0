// storefront/src/state.rs

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::pipelines;
use crate::services::gateways::Gateways;
use crate::store::Store;
use shopflow::Registry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  pub flows: Arc<Registry<AppError>>,
  pub config: Arc<AppConfig>,
  pub gateways: Gateways,
}

impl AppState {
  /// Builds the state and registers every order workflow on a fresh registry.
  pub fn new(store: Arc<dyn Store>, config: Arc<AppConfig>, gateways: Gateways) -> Self {
    let state = Self {
      store,
      flows: Arc::new(Registry::new()),
      config,
      gateways,
    };
    pipelines::register_all_pipelines(&state.flows, &state);
    state
  }
}
