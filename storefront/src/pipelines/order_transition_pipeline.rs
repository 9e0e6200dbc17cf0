// storefront/src/pipelines/order_transition_pipeline.rs

//! Customer-initiated status changes: cancel, resume and soft-delete.

use crate::errors::AppError;
use crate::inventory;
use crate::lifecycle;
use crate::models::Order;
use crate::pipelines::contexts::{OrderTransitionCtxData, TransitionAction};
use crate::state::AppState;
use crate::store::{CatalogStore, OrderStore, OrderWrite};
use shopflow::{ContextData, Pipeline, PipelineControl, PipelineResult, Registry, SkipCondition};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub fn register_order_transition_pipeline(registry: &Arc<Registry<AppError>>, _app_state: &AppState) {
  let not_resuming: SkipCondition<OrderTransitionCtxData> =
    Arc::new(|data: &OrderTransitionCtxData| data.action != TransitionAction::Resume);

  let mut p = Pipeline::<OrderTransitionCtxData, AppError>::new(&[
    ("load_owned_order", false, None),
    ("plan_transition", false, None),
    ("check_stock_for_resume", false, Some(not_resuming)),
    ("commit_transition", false, None),
  ]);

  p.on_root("load_owned_order", load_owned_order);
  p.on_root("plan_transition", plan_transition);
  p.on_root("check_stock_for_resume", check_stock_for_resume);
  p.on_root("commit_transition", commit_transition);

  registry.register_pipeline(p);
  info!("Order transition pipeline registered.");
}

pub async fn run_transition(
  app_state: AppState,
  user_id: Uuid,
  order_id: Uuid,
  action: TransitionAction,
) -> Result<Order, AppError> {
  let flows = app_state.flows.clone();
  let ctx_data = ContextData::new(OrderTransitionCtxData::new(app_state, user_id, order_id, action));

  match flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => ctx_data
      .read()
      .updated
      .clone()
      .ok_or_else(|| AppError::Internal("Transition completed without an updated order.".to_string())),
    PipelineResult::Stopped => Err(AppError::Internal("Order transition was halted.".to_string())),
  }
}

#[instrument(name = "transition::load_owned_order", skip(ctx_data), err(Display))]
async fn load_owned_order(ctx_data: ContextData<OrderTransitionCtxData>) -> Result<PipelineControl, AppError> {
  let (store, user_id, order_id) = ctx_data.with(|d| (d.app_state.store.clone(), d.user_id, d.order_id));

  let order = store
    .order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
  if order.user_id != user_id {
    warn!(%order_id, %user_id, "Transition attempted on another user's order.");
    return Err(AppError::Forbidden("You do not have access to this order".to_string()));
  }

  ctx_data.update(|d| d.current = Some(order));
  Ok(PipelineControl::Continue)
}

#[instrument(name = "transition::plan", skip(ctx_data), err(Display))]
async fn plan_transition(ctx_data: ContextData<OrderTransitionCtxData>) -> Result<PipelineControl, AppError> {
  let planned = {
    let guard = ctx_data.read();
    let order = guard
      .current
      .as_ref()
      .ok_or_else(|| AppError::Internal("Order was not loaded before planning.".to_string()))?;
    match guard.action {
      TransitionAction::Cancel => lifecycle::cancel(order)?,
      TransitionAction::Resume => lifecycle::resume(order)?,
      TransitionAction::SoftDelete => lifecycle::soft_delete(order)?,
    }
  };

  ctx_data.update(|d| d.planned = Some(planned));
  Ok(PipelineControl::Continue)
}

/// Resume takes stock again, so every line must be in stock before the
/// commit. The commit re-checks under its own lock.
#[instrument(name = "transition::check_stock_for_resume", skip(ctx_data), err(Display))]
async fn check_stock_for_resume(ctx_data: ContextData<OrderTransitionCtxData>) -> Result<PipelineControl, AppError> {
  let (store, items) = ctx_data.with(|d| {
    (
      d.app_state.store.clone(),
      d.current.as_ref().map(|o| o.items.clone()).unwrap_or_default(),
    )
  });

  let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
  let catalog = store.products_by_ids(&ids).await?;
  inventory::ensure_available(&items, &catalog)?;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "transition::commit", skip(ctx_data), err(Display))]
async fn commit_transition(ctx_data: ContextData<OrderTransitionCtxData>) -> Result<PipelineControl, AppError> {
  let (store, action, loaded, planned) =
    ctx_data.with(|d| (d.app_state.store.clone(), d.action, d.current.clone(), d.planned.clone()));
  let loaded = loaded.ok_or_else(|| AppError::Internal("Order was not loaded before commit.".to_string()))?;
  let planned = planned.ok_or_else(|| AppError::Internal("No transition planned.".to_string()))?;

  let updated = store
    .commit(OrderWrite::update(&loaded, planned.order), &planned.stock)
    .await?;
  info!(
    order_id = %updated.id,
    ?action,
    status = %updated.status,
    payment_status = ?updated.payment_status,
    stock_changes = planned.stock.len(),
    "Order transition committed."
  );

  ctx_data.update(|d| d.updated = Some(updated));
  Ok(PipelineControl::Continue)
}
