// tests/order_flow_tests.rs
mod common;

use common::*;
use serial_test::serial;
use storefront::errors::AppError;
use storefront::models::{CartLine, OrderStatus, OrderType, PaymentMethod, PaymentStatus, UserRole};
use storefront::pipelines::contexts::{CheckoutChannel, TransitionAction};
use storefront::pipelines::order_transition_pipeline::run_transition;
use storefront::pipelines::reorder_pipeline::run_reorder;
use storefront::store::{CatalogStore, OrderStore, UserOrderQuery, UserStore};

#[tokio::test]
#[serial]
async fn direct_order_cancel_resume_moves_stock_both_ways() {
  let state = test_state();
  let shirt = add_product(&state, "Linen Shirt", 10_000, 5).await;
  let user = add_user(&state, "asha@example.com", UserRole::User).await;

  let receipt = checkout(&state, user.id, CheckoutChannel::Direct, PaymentMethod::Cod, vec![line(&shirt, 3)])
    .await
    .unwrap();
  let order = receipt.order;
  assert_eq!(order.status, OrderStatus::Pending);
  assert_eq!(order.payment_status, PaymentStatus::Pending);
  assert_eq!(order.order_type, OrderType::Direct);
  assert_eq!(order.total_amount, 30_000);
  assert_eq!(order.delivery_fee, 0);
  assert_eq!(stock_of(&state, shirt.id).await, 2);

  let cancelled = run_transition(state.clone(), user.id, order.id, TransitionAction::Cancel).await.unwrap();
  assert_eq!(cancelled.status, OrderStatus::Cancelled);
  assert_eq!(stock_of(&state, shirt.id).await, 5);

  let resumed = run_transition(state.clone(), user.id, order.id, TransitionAction::Resume).await.unwrap();
  assert_eq!(resumed.status, OrderStatus::Pending);
  assert_eq!(stock_of(&state, shirt.id).await, 2);

  run_transition(state.clone(), user.id, order.id, TransitionAction::Cancel).await.unwrap();
  assert_eq!(stock_of(&state, shirt.id).await, 5);
}

#[tokio::test]
#[serial]
async fn prepaid_direct_order_is_refunded_on_cancel_and_pending_again_on_resume() {
  let state = test_state();
  let shirt = add_product(&state, "Linen Shirt", 10_000, 5).await;
  let user = add_user(&state, "asha@example.com", UserRole::User).await;

  let order = checkout(&state, user.id, CheckoutChannel::Direct, PaymentMethod::Stripe, vec![line(&shirt, 1)])
    .await
    .unwrap()
    .order;
  assert_eq!(order.payment_status, PaymentStatus::Completed);

  let cancelled = run_transition(state.clone(), user.id, order.id, TransitionAction::Cancel).await.unwrap();
  assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);

  let resumed = run_transition(state.clone(), user.id, order.id, TransitionAction::Resume).await.unwrap();
  assert_eq!(resumed.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
#[serial]
async fn direct_order_beyond_stock_is_refused_without_side_effects() {
  let state = test_state();
  let shirt = add_product(&state, "Linen Shirt", 10_000, 2).await;
  let user = add_user(&state, "asha@example.com", UserRole::User).await;

  let err = checkout(&state, user.id, CheckoutChannel::Direct, PaymentMethod::Cod, vec![line(&shirt, 3)])
    .await
    .unwrap_err();
  match err {
    AppError::InsufficientStock { product, available } => {
      assert_eq!(product, "Linen Shirt");
      assert_eq!(available, 2);
    }
    other => panic!("unexpected error: {other:?}"),
  }
  assert_eq!(stock_of(&state, shirt.id).await, 2);
  assert!(state.store.list_orders().await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn cancel_is_refused_once_shipped_and_status_is_kept() {
  let state = test_state();
  let shirt = add_product(&state, "Linen Shirt", 10_000, 5).await;
  let user = add_user(&state, "asha@example.com", UserRole::User).await;
  let order = checkout(&state, user.id, CheckoutChannel::Direct, PaymentMethod::Cod, vec![line(&shirt, 1)])
    .await
    .unwrap()
    .order;

  let shipped = storefront::lifecycle::override_status(&order, OrderStatus::Shipped);
  state
    .store
    .commit(storefront::store::OrderWrite::update(&order, shipped.order), &shipped.stock)
    .await
    .unwrap();

  let err = run_transition(state.clone(), user.id, order.id, TransitionAction::Cancel)
    .await
    .unwrap_err();
  assert!(matches!(&err, AppError::InvalidTransition(msg) if msg.contains("shipped")));
  let stored = state.store.order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Shipped);
  assert_eq!(stock_of(&state, shirt.id).await, 4);
}

#[tokio::test]
#[serial]
async fn resume_without_stock_keeps_order_cancelled() {
  let state = test_state();
  let shirt = add_product(&state, "Linen Shirt", 10_000, 3).await;
  let user = add_user(&state, "asha@example.com", UserRole::User).await;
  let order = checkout(&state, user.id, CheckoutChannel::Direct, PaymentMethod::Cod, vec![line(&shirt, 3)])
    .await
    .unwrap()
    .order;
  run_transition(state.clone(), user.id, order.id, TransitionAction::Cancel).await.unwrap();

  // Someone else buys most of the restocked units.
  let other = add_user(&state, "ravi@example.com", UserRole::User).await;
  checkout(&state, other.id, CheckoutChannel::Direct, PaymentMethod::Cod, vec![line(&shirt, 2)])
    .await
    .unwrap();

  let err = run_transition(state.clone(), user.id, order.id, TransitionAction::Resume)
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::InsufficientStock { available: 1, .. }));
  let stored = state.store.order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Cancelled);
  assert_eq!(stock_of(&state, shirt.id).await, 1);
}

#[tokio::test]
#[serial]
async fn reorder_uses_current_price_and_takes_stock() {
  let state = test_state();
  let mut shirt = add_product(&state, "Linen Shirt", 10, 10).await;
  let user = add_user(&state, "asha@example.com", UserRole::User).await;
  let first = checkout(&state, user.id, CheckoutChannel::Direct, PaymentMethod::Cod, vec![line(&shirt, 2)])
    .await
    .unwrap()
    .order;

  shirt.price = 15;
  state.store.update_product(&shirt).await.unwrap();

  let again = run_reorder(state.clone(), user.id, first.id).await.unwrap();
  assert_ne!(again.id, first.id);
  assert_eq!(again.items[0].price, 15);
  assert_eq!(again.total_amount, 30);
  assert_eq!(again.order_type, OrderType::Direct);
  assert_eq!(again.shipping_address, first.shipping_address);
  assert_eq!(stock_of(&state, shirt.id).await, 6);

  let original = state.store.order(first.id).await.unwrap().unwrap();
  assert_eq!(original.items[0].price, 10);
}

#[tokio::test]
#[serial]
async fn reorder_of_removed_product_is_unavailable() {
  let state = test_state();
  let shirt = add_product(&state, "Linen Shirt", 10_000, 10).await;
  let user = add_user(&state, "asha@example.com", UserRole::User).await;
  let first = checkout(&state, user.id, CheckoutChannel::Direct, PaymentMethod::Cod, vec![line(&shirt, 1)])
    .await
    .unwrap()
    .order;
  state.store.remove_product(shirt.id).await.unwrap();

  let err = run_reorder(state.clone(), user.id, first.id).await.unwrap_err();
  assert!(matches!(err, AppError::ProductUnavailable(name) if name == "Linen Shirt"));
}

#[tokio::test]
#[serial]
async fn other_users_cannot_touch_an_order() {
  let state = test_state();
  let shirt = add_product(&state, "Linen Shirt", 10_000, 10).await;
  let owner = add_user(&state, "asha@example.com", UserRole::User).await;
  let stranger = add_user(&state, "ravi@example.com", UserRole::User).await;
  let order = checkout(&state, owner.id, CheckoutChannel::Direct, PaymentMethod::Cod, vec![line(&shirt, 1)])
    .await
    .unwrap()
    .order;

  for action in [TransitionAction::Cancel, TransitionAction::Resume, TransitionAction::SoftDelete] {
    let err = run_transition(state.clone(), stranger.id, order.id, action).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "{action:?}");
  }
  assert!(matches!(
    run_reorder(state.clone(), stranger.id, order.id).await,
    Err(AppError::Forbidden(_))
  ));
  assert_eq!(stock_of(&state, shirt.id).await, 9);
}

#[tokio::test]
#[serial]
async fn place_order_adds_fee_keeps_stock_and_clears_cart() {
  let state = test_state();
  let shirt = add_product(&state, "Linen Shirt", 10_000, 10).await;
  let scarf = add_product(&state, "Wool Scarf", 2_500, 10).await;
  let user = add_user(&state, "asha@example.com", UserRole::User).await;
  state
    .store
    .save_cart(
      user.id,
      &[CartLine {
        product_id: shirt.id,
        size: Some("M".into()),
        color: None,
        quantity: 2,
      }],
    )
    .await
    .unwrap();

  let receipt = checkout(
    &state,
    user.id,
    CheckoutChannel::Place,
    PaymentMethod::Cod,
    vec![line(&shirt, 2), line(&scarf, 1)],
  )
  .await
  .unwrap();
  let order = receipt.order;
  assert_eq!(order.total_amount, 22_500);
  assert_eq!(order.delivery_fee, DELIVERY_FEE);
  assert_eq!(order.order_type, OrderType::Cart);
  assert_eq!(order.payment_status, PaymentStatus::Pending);
  assert_eq!(stock_of(&state, shirt.id).await, 10);
  assert!(state.store.user(user.id).await.unwrap().unwrap().cart.is_empty());
}

#[tokio::test]
#[serial]
async fn soft_delete_hides_order_from_customer_only() {
  let state = test_state();
  let shirt = add_product(&state, "Linen Shirt", 10_000, 10).await;
  let user = add_user(&state, "asha@example.com", UserRole::User).await;
  let order = checkout(&state, user.id, CheckoutChannel::Direct, PaymentMethod::Cod, vec![line(&shirt, 1)])
    .await
    .unwrap()
    .order;

  let err = run_transition(state.clone(), user.id, order.id, TransitionAction::SoftDelete)
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::InvalidTransition(_)));

  run_transition(state.clone(), user.id, order.id, TransitionAction::Cancel).await.unwrap();
  let hidden = run_transition(state.clone(), user.id, order.id, TransitionAction::SoftDelete)
    .await
    .unwrap();
  assert!(!hidden.active);

  let page = state
    .store
    .user_orders(&UserOrderQuery {
      user_id: user.id,
      status: None,
      page: 1,
      limit: 10,
    })
    .await
    .unwrap();
  assert_eq!(page.total, 0);
  assert!(state.store.list_orders().await.unwrap().iter().any(|o| o.id == order.id));

  let again = run_transition(state.clone(), user.id, order.id, TransitionAction::SoftDelete)
    .await
    .unwrap_err();
  assert!(matches!(again, AppError::NotFound(_)));
}

#[tokio::test]
#[serial]
async fn stock_never_goes_negative_across_a_mixed_sequence() {
  let state = test_state();
  let shirt = add_product(&state, "Linen Shirt", 10_000, 4).await;
  let user = add_user(&state, "asha@example.com", UserRole::User).await;

  let a = checkout(&state, user.id, CheckoutChannel::Direct, PaymentMethod::Cod, vec![line(&shirt, 3)])
    .await
    .unwrap()
    .order;
  assert!(checkout(&state, user.id, CheckoutChannel::Direct, PaymentMethod::Cod, vec![line(&shirt, 2)])
    .await
    .is_err());
  run_transition(state.clone(), user.id, a.id, TransitionAction::Cancel).await.unwrap();
  let b = run_reorder(state.clone(), user.id, a.id).await.unwrap();
  assert!(run_transition(state.clone(), user.id, a.id, TransitionAction::Resume).await.is_err());
  run_transition(state.clone(), user.id, b.id, TransitionAction::Cancel).await.unwrap();
  run_transition(state.clone(), user.id, a.id, TransitionAction::Resume).await.unwrap();

  let stock = stock_of(&state, shirt.id).await;
  assert_eq!(stock, 1);
  assert!(stock >= 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn concurrent_cancels_restock_exactly_once() {
  let state = test_state();
  let shirt = add_product(&state, "Linen Shirt", 10_000, 5).await;
  let user = add_user(&state, "asha@example.com", UserRole::User).await;

  for _ in 0..25 {
    let order = checkout(&state, user.id, CheckoutChannel::Direct, PaymentMethod::Cod, vec![line(&shirt, 3)])
      .await
      .unwrap()
      .order;
    assert_eq!(stock_of(&state, shirt.id).await, 2);

    let (user_id, order_id) = (user.id, order.id);
    let attempts: Vec<_> = (0..8)
      .map(|_| {
        let state = state.clone();
        tokio::spawn(async move { run_transition(state, user_id, order_id, TransitionAction::Cancel).await })
      })
      .collect();

    let mut cancelled = 0;
    for attempt in attempts {
      match attempt.await.unwrap() {
        Ok(order) => {
          assert_eq!(order.status, OrderStatus::Cancelled);
          cancelled += 1;
        }
        Err(AppError::InvalidTransition(_)) => {}
        Err(other) => panic!("unexpected cancel failure: {other:?}"),
      }
    }
    assert_eq!(cancelled, 1);
    assert_eq!(stock_of(&state, shirt.id).await, 5);
  }
}

#[tokio::test]
#[serial]
async fn stale_plan_does_not_overwrite_a_newer_status() {
  let state = test_state();
  let shirt = add_product(&state, "Linen Shirt", 10_000, 5).await;
  let user = add_user(&state, "asha@example.com", UserRole::User).await;
  let loaded = checkout(&state, user.id, CheckoutChannel::Direct, PaymentMethod::Cod, vec![line(&shirt, 2)])
    .await
    .unwrap()
    .order;

  let shipped_elsewhere = storefront::lifecycle::override_status(&loaded, OrderStatus::Shipped);
  state
    .store
    .commit(storefront::store::OrderWrite::update(&loaded, shipped_elsewhere.order), &[])
    .await
    .unwrap();

  let late_cancel = storefront::lifecycle::cancel(&loaded).unwrap();
  let err = state
    .store
    .commit(storefront::store::OrderWrite::update(&loaded, late_cancel.order), &late_cancel.stock)
    .await
    .unwrap_err();
  assert!(matches!(&err, AppError::InvalidTransition(msg) if msg.contains("shipped")));
  assert_eq!(stock_of(&state, shirt.id).await, 3);
  assert_eq!(
    state.store.order(loaded.id).await.unwrap().unwrap().status,
    OrderStatus::Shipped
  );
}
