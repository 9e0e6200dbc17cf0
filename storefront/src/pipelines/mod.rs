// storefront/src/pipelines/mod.rs

//! Workflow pipelines of the storefront. Each module registers one pipeline
//! keyed by its context type and exposes a `run_*` entry point for handlers.

use crate::errors::AppError;
use crate::state::AppState;
use shopflow::Registry;
use std::sync::Arc;

pub mod contexts;

pub mod cart_pipeline;
pub mod checkout_pipeline;
pub mod order_transition_pipeline;
pub mod payment_pipeline;
pub mod reorder_pipeline;

/// Registers every pipeline. Called once from [`AppState::new`].
pub fn register_all_pipelines(registry: &Arc<Registry<AppError>>, app_state: &AppState) {
  tracing::info!("Registering storefront pipelines...");

  checkout_pipeline::register_checkout_pipeline(registry, app_state);
  order_transition_pipeline::register_order_transition_pipeline(registry, app_state);
  reorder_pipeline::register_reorder_pipeline(registry, app_state);
  payment_pipeline::register_payment_pipeline(registry, app_state);
  cart_pipeline::register_add_to_cart_pipeline(registry, app_state);

  tracing::info!("All storefront pipelines registered.");
}
