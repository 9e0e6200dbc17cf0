// storefront/src/pipelines/cart_pipeline.rs

use crate::errors::AppError;
use crate::models::CartLine;
use crate::pipelines::contexts::AddToCartCtxData;
use crate::state::AppState;
use crate::store::{CatalogStore, UserStore};
use shopflow::{ContextData, Pipeline, PipelineControl, PipelineResult, Registry};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub fn register_add_to_cart_pipeline(registry: &Arc<Registry<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<AddToCartCtxData, AppError>::new(&[
    ("validate_cart_input", false, None),
    ("fetch_product_for_cart", false, None),
    ("merge_cart_line", false, None),
  ]);

  p.on_root("validate_cart_input", validate_cart_input);
  p.on_root("fetch_product_for_cart", fetch_product_for_cart);
  p.on_root("merge_cart_line", merge_cart_line);

  registry.register_pipeline(p);
  info!("Add to Cart pipeline registered.");
}

/// Adds `line` to the user's cart and returns the whole cart.
pub async fn run_add_to_cart(app_state: AppState, user_id: Uuid, line: CartLine) -> Result<Vec<CartLine>, AppError> {
  let flows = app_state.flows.clone();
  let ctx_data = ContextData::new(AddToCartCtxData::new(app_state, user_id, line));

  match flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => Ok(ctx_data.read().updated_cart.clone().unwrap_or_default()),
    PipelineResult::Stopped => Err(AppError::Internal("Add to cart was halted.".to_string())),
  }
}

#[instrument(name = "cart::validate_input", skip(ctx_data), err(Display))]
async fn validate_cart_input(ctx_data: ContextData<AddToCartCtxData>) -> Result<PipelineControl, AppError> {
  let quantity = ctx_data.with(|d| d.quantity);
  if quantity <= 0 {
    warn!(quantity, "Rejected cart quantity.");
    return Err(AppError::Validation("Quantity must be a positive number.".to_string()));
  }
  Ok(PipelineControl::Continue)
}

/// Loads the product and checks the requested variant exists on it.
#[instrument(name = "cart::fetch_product", skip(ctx_data), err(Display))]
async fn fetch_product_for_cart(ctx_data: ContextData<AddToCartCtxData>) -> Result<PipelineControl, AppError> {
  let (store, product_id, size, color) = ctx_data.with(|d| {
    (
      d.app_state.store.clone(),
      d.product_id,
      d.size.clone(),
      d.color.clone(),
    )
  });

  let product = store
    .product(product_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))?;

  if let Some(size) = size.as_ref() {
    if !product.sizes.is_empty() && !product.sizes.contains(size) {
      return Err(AppError::Validation(format!("Size {} is not offered for {}", size, product.name)));
    }
  }
  if let Some(color) = color.as_ref() {
    if !product.colors.is_empty() && !product.colors.contains(color) {
      return Err(AppError::Validation(format!("Color {} is not offered for {}", color, product.name)));
    }
  }

  ctx_data.update(|d| {
    d.product_name = Some(product.name.clone());
    d.stock_available = product.stock_quantity;
  });
  Ok(PipelineControl::Continue)
}

/// Same product, size and color add up on one line. The merged quantity may
/// not exceed current stock.
#[instrument(name = "cart::merge_line", skip(ctx_data), err(Display))]
async fn merge_cart_line(ctx_data: ContextData<AddToCartCtxData>) -> Result<PipelineControl, AppError> {
  let (store, user_id, product_id, size, color, quantity, product_name, available) = ctx_data.with(|d| {
    (
      d.app_state.store.clone(),
      d.user_id,
      d.product_id,
      d.size.clone(),
      d.color.clone(),
      d.quantity,
      d.product_name.clone().unwrap_or_default(),
      d.stock_available,
    )
  });

  let user = store
    .user(user_id)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
  let mut cart = user.cart;

  let merged_quantity = match cart.iter_mut().find(|l| l.same_variant(product_id, &size, &color)) {
    Some(line) => {
      line.quantity += quantity;
      line.quantity
    }
    None => {
      cart.push(CartLine {
        product_id,
        size,
        color,
        quantity,
      });
      quantity
    }
  };
  if merged_quantity > available {
    return Err(AppError::InsufficientStock {
      product: product_name,
      available,
    });
  }

  store.save_cart(user_id, &cart).await?;
  info!(%user_id, %product_id, merged_quantity, "Cart updated.");

  ctx_data.update(|d| d.updated_cart = Some(cart));
  Ok(PipelineControl::Continue)
}
