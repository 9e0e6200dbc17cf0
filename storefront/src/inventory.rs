// storefront/src/inventory.rs

//! Stock bookkeeping shared by the lifecycle and the stores.

use crate::errors::AppError;
use crate::models::{OrderItem, OrderLineRequest, Product};
use std::collections::HashMap;
use uuid::Uuid;

/// Signed change to one product's `stock_quantity`.
///
/// Negative deltas are conditional when committed: the product must exist and
/// hold at least `-delta` units. Positive deltas for missing products are
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockChange {
  pub product_id: Uuid,
  pub product_name: String,
  pub delta: i32,
}

impl StockChange {
  pub fn restock(items: &[OrderItem]) -> Vec<StockChange> {
    items
      .iter()
      .map(|item| StockChange {
        product_id: item.product_id,
        product_name: item.name.clone(),
        delta: item.quantity,
      })
      .collect()
  }

  pub fn deduct(items: &[OrderItem]) -> Vec<StockChange> {
    items
      .iter()
      .map(|item| StockChange {
        product_id: item.product_id,
        product_name: item.name.clone(),
        delta: -item.quantity,
      })
      .collect()
  }
}

/// Folds changes to the same product into one, keeping first-seen order.
/// Zero net changes are dropped.
pub fn net_changes(changes: &[StockChange]) -> Vec<StockChange> {
  let mut netted: Vec<StockChange> = Vec::with_capacity(changes.len());
  for change in changes {
    match netted.iter_mut().find(|c| c.product_id == change.product_id) {
      Some(existing) => existing.delta += change.delta,
      None => netted.push(change.clone()),
    }
  }
  netted.retain(|c| c.delta != 0);
  netted
}

/// Every item's product must still exist and hold enough stock for the
/// item's quantity. Quantities of repeated products are summed first.
pub fn ensure_available(items: &[OrderItem], catalog: &HashMap<Uuid, Product>) -> Result<(), AppError> {
  for change in net_changes(&StockChange::deduct(items)) {
    let product = catalog
      .get(&change.product_id)
      .ok_or_else(|| AppError::ProductUnavailable(change.product_name.clone()))?;
    if product.stock_quantity < -change.delta {
      return Err(AppError::InsufficientStock {
        product: change.product_name,
        available: product.stock_quantity,
      });
    }
  }
  Ok(())
}

/// Copies each item with the catalog's current price. Names stay as they
/// were on the source order.
pub fn reprice(items: &[OrderItem], catalog: &HashMap<Uuid, Product>) -> Result<Vec<OrderItem>, AppError> {
  items
    .iter()
    .map(|item| {
      let product = catalog
        .get(&item.product_id)
        .ok_or_else(|| AppError::ProductUnavailable(item.name.clone()))?;
      Ok(OrderItem {
        price: product.price,
        ..item.clone()
      })
    })
    .collect()
}

/// Turns requested lines into order items priced from the catalog.
pub fn snapshot(lines: &[OrderLineRequest], catalog: &HashMap<Uuid, Product>) -> Result<Vec<OrderItem>, AppError> {
  lines
    .iter()
    .map(|line| {
      let product = catalog
        .get(&line.product_id)
        .ok_or_else(|| AppError::NotFound(format!("Product {} not found", line.product_id)))?;
      Ok(OrderItem {
        product_id: product.id,
        quantity: line.quantity,
        size: line.size.clone(),
        color: line.color.clone(),
        price: product.price,
        name: product.name.clone(),
      })
    })
    .collect()
}

pub fn total_of(items: &[OrderItem]) -> i64 {
  items.iter().map(OrderItem::line_total).sum()
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  fn product(name: &str, price: i64, stock: i32) -> Product {
    Product {
      id: Uuid::new_v4(),
      name: name.to_string(),
      description: String::new(),
      price,
      original_price: None,
      images: vec![],
      category: "Men".into(),
      sub_category: "Topwear".into(),
      sizes: vec![],
      colors: vec![],
      stock_quantity: stock,
      bestseller: false,
      average_rating: 0.0,
      total_ratings: 0,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  fn item(p: &Product, quantity: i32, price: i64) -> OrderItem {
    OrderItem {
      product_id: p.id,
      quantity,
      size: None,
      color: None,
      price,
      name: p.name.clone(),
    }
  }

  #[test]
  fn repeated_products_are_netted() {
    let shirt = product("Shirt", 100, 10);
    let changes = vec![
      StockChange {
        product_id: shirt.id,
        product_name: "Shirt".into(),
        delta: -2,
      },
      StockChange {
        product_id: shirt.id,
        product_name: "Shirt".into(),
        delta: -3,
      },
    ];
    let netted = net_changes(&changes);
    assert_eq!(netted.len(), 1);
    assert_eq!(netted[0].delta, -5);

    let cancelled = net_changes(&[changes[0].clone(), StockChange { delta: 2, ..changes[0].clone() }]);
    assert!(cancelled.is_empty());
  }

  #[test]
  fn availability_sums_lines_of_the_same_product() {
    let shirt = product("Shirt", 100, 4);
    let catalog = HashMap::from([(shirt.id, shirt.clone())]);

    assert!(ensure_available(&[item(&shirt, 4, 100)], &catalog).is_ok());
    match ensure_available(&[item(&shirt, 3, 100), item(&shirt, 2, 100)], &catalog) {
      Err(AppError::InsufficientStock { product, available }) => {
        assert_eq!(product, "Shirt");
        assert_eq!(available, 4);
      }
      other => panic!("expected insufficient stock, got {:?}", other),
    }
  }

  #[test]
  fn missing_products_are_unavailable() {
    let gone = product("Retired Jacket", 100, 0);
    let err = ensure_available(&[item(&gone, 1, 100)], &HashMap::new()).unwrap_err();
    assert!(matches!(err, AppError::ProductUnavailable(ref name) if name == "Retired Jacket"));
  }

  #[test]
  fn reprice_takes_current_catalog_price() {
    let mut shirt = product("Shirt", 10, 5);
    let original = vec![item(&shirt, 2, 10)];
    shirt.price = 15;
    let catalog = HashMap::from([(shirt.id, shirt)]);

    let repriced = reprice(&original, &catalog).unwrap();
    assert_eq!(repriced[0].price, 15);
    assert_eq!(total_of(&repriced), 30);
  }
}
