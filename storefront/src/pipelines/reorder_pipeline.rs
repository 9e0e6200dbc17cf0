// storefront/src/pipelines/reorder_pipeline.rs

//! Places a fresh direct order from a past order's lines at today's prices.

use crate::errors::AppError;
use crate::inventory::{self, StockChange};
use crate::lifecycle::{self, NewOrder};
use crate::models::{Order, OrderType};
use crate::pipelines::contexts::ReorderCtxData;
use crate::state::AppState;
use crate::store::{CatalogStore, OrderStore, OrderWrite};
use shopflow::{ContextData, Pipeline, PipelineControl, PipelineResult, Registry};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub fn register_reorder_pipeline(registry: &Arc<Registry<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<ReorderCtxData, AppError>::new(&[
    ("load_source_order", false, None),
    ("reprice_lines", false, None),
    ("persist_reorder", false, None),
  ]);

  p.on_root("load_source_order", load_source_order);
  p.on_root("reprice_lines", reprice_lines);
  p.on_root("persist_reorder", persist_reorder);

  registry.register_pipeline(p);
  info!("Reorder pipeline registered.");
}

pub async fn run_reorder(app_state: AppState, user_id: Uuid, source_order_id: Uuid) -> Result<Order, AppError> {
  let flows = app_state.flows.clone();
  let ctx_data = ContextData::new(ReorderCtxData::new(app_state, user_id, source_order_id));

  match flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => ctx_data
      .read()
      .order
      .clone()
      .ok_or_else(|| AppError::Internal("Reorder completed without an order record.".to_string())),
    PipelineResult::Stopped => Err(AppError::Internal("Reorder was halted.".to_string())),
  }
}

#[instrument(name = "reorder::load_source_order", skip(ctx_data), err(Display))]
async fn load_source_order(ctx_data: ContextData<ReorderCtxData>) -> Result<PipelineControl, AppError> {
  let (store, user_id, source_id) = ctx_data.with(|d| (d.app_state.store.clone(), d.user_id, d.source_order_id));

  let source = store
    .order(source_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
  if source.user_id != user_id {
    warn!(order_id = %source_id, %user_id, "Reorder attempted on another user's order.");
    return Err(AppError::Forbidden("You do not have access to this order".to_string()));
  }

  ctx_data.update(|d| d.source = Some(source));
  Ok(PipelineControl::Continue)
}

#[instrument(name = "reorder::reprice_lines", skip(ctx_data), err(Display))]
async fn reprice_lines(ctx_data: ContextData<ReorderCtxData>) -> Result<PipelineControl, AppError> {
  let (store, source_items) = ctx_data.with(|d| {
    (
      d.app_state.store.clone(),
      d.source.as_ref().map(|o| o.items.clone()).unwrap_or_default(),
    )
  });

  let ids: Vec<Uuid> = source_items.iter().map(|i| i.product_id).collect();
  let catalog = store.products_by_ids(&ids).await?;
  inventory::ensure_available(&source_items, &catalog)?;
  let items = inventory::reprice(&source_items, &catalog)?;
  let stock = StockChange::deduct(&items);

  ctx_data.update(|d| {
    d.items = items;
    d.stock = stock;
  });
  Ok(PipelineControl::Continue)
}

#[instrument(name = "reorder::persist", skip(ctx_data), err(Display))]
async fn persist_reorder(ctx_data: ContextData<ReorderCtxData>) -> Result<PipelineControl, AppError> {
  let (store, user_id, source, items, stock) = ctx_data.with(|d| {
    (
      d.app_state.store.clone(),
      d.user_id,
      d.source.clone(),
      d.items.clone(),
      d.stock.clone(),
    )
  });
  let source = source.ok_or_else(|| AppError::Internal("Source order was not loaded.".to_string()))?;

  let order = lifecycle::new_order(NewOrder {
    user_id,
    items,
    shipping_address: source.shipping_address.clone(),
    payment_method: source.payment_method,
    payment_status: lifecycle::initial_payment_status(source.payment_method),
    order_type: OrderType::Direct,
    delivery_fee: 0,
  });
  let stored = store.commit(OrderWrite::Insert(order), &stock).await?;
  info!(
    order_id = %stored.id,
    source_order_id = %source.id,
    total_amount = stored.total_amount,
    "Reorder placed."
  );

  ctx_data.update(|d| d.order = Some(stored));
  Ok(PipelineControl::Continue)
}
