// tests/catalog_tests.rs
mod common;

use actix_web::{http::StatusCode, test, web, App};
use common::*;
use serde_json::{json, Value};
use serial_test::serial;
use storefront::models::{CartLine, UserRole};
use storefront::store::{CatalogStore, UserStore};
use storefront::web::configure_app_routes;

macro_rules! init_app {
  ($state:expr) => {
    test::init_service(
      App::new()
        .app_data(web::Data::new($state.clone()))
        .configure(configure_app_routes),
    )
    .await
  };
}

#[actix_rt::test]
#[serial]
async fn reviews_keep_product_rating_in_step() {
  let state = test_state();
  let shirt = add_product(&state, "Linen Shirt", 10_000, 5).await;
  let asha = token_for(&add_user(&state, "asha@example.com", UserRole::User).await);
  let ravi = token_for(&add_user(&state, "ravi@example.com", UserRole::User).await);
  let app = init_app!(state);

  let add = |token: &str, rating: i32| {
    test::TestRequest::post()
      .uri("/api/review")
      .insert_header(("token", token.to_string()))
      .set_json(json!({ "productId": shirt.id, "rating": rating, "comment": "Fits well" }))
      .to_request()
  };

  let resp = test::call_service(&app, add(&asha, 5)).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let body: Value = test::read_body_json(resp).await;
  let asha_review = body["data"]["id"].as_str().unwrap().to_string();

  let resp = test::call_service(&app, add(&asha, 4)).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["message"], json!("You have already reviewed this product"));

  let resp = test::call_service(&app, add(&ravi, 6)).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let resp = test::call_service(&app, add(&ravi, 2)).await;
  assert_eq!(resp.status(), StatusCode::CREATED);

  let product = state.store.product(shirt.id).await.unwrap().unwrap();
  assert_eq!((product.average_rating, product.total_ratings), (3.5, 2));

  let req = test::TestRequest::put()
    .uri(&format!("/api/review/reviews/{}", asha_review))
    .insert_header(("token", asha.clone()))
    .set_json(json!({ "rating": 3 }))
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["data"]["rating"], json!(3));
  assert_eq!(body["data"]["comment"], json!("Fits well"));
  let product = state.store.product(shirt.id).await.unwrap().unwrap();
  assert_eq!((product.average_rating, product.total_ratings), (2.5, 2));

  let delete = |token: &str| {
    test::TestRequest::delete()
      .uri(&format!("/api/review/{}", asha_review))
      .insert_header(("token", token.to_string()))
      .to_request()
  };
  let resp = test::call_service(&app, delete(&ravi)).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  let resp = test::call_service(&app, delete(&asha)).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let product = state.store.product(shirt.id).await.unwrap().unwrap();
  assert_eq!((product.average_rating, product.total_ratings), (2.0, 1));

  let req = test::TestRequest::get()
    .uri(&format!("/api/review/{}", shirt.id))
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["data"].as_array().unwrap().len(), 1);
  assert_eq!(body["data"][0]["rating"], json!(2));
}

#[actix_rt::test]
#[serial]
async fn favorites_toggle_in_and_out() {
  let state = test_state();
  let shirt = add_product(&state, "Linen Shirt", 10_000, 5).await;
  let token = token_for(&add_user(&state, "asha@example.com", UserRole::User).await);
  let app = init_app!(state);

  let toggle = |product_id: uuid::Uuid| {
    test::TestRequest::put()
      .uri("/api/user/favorites")
      .insert_header(("token", token.clone()))
      .set_json(json!({ "productId": product_id }))
      .to_request()
  };
  let list = || {
    test::TestRequest::get()
      .uri("/api/user/favorites")
      .insert_header(("token", token.clone()))
      .to_request()
  };

  let body: Value = test::call_and_read_body_json(&app, toggle(shirt.id)).await;
  assert_eq!(body["message"], json!("Added in Favorites"));
  let body: Value = test::call_and_read_body_json(&app, list()).await;
  assert_eq!(body["favoriteIds"], json!([shirt.id]));
  assert_eq!(body["favorites"][0]["name"], json!("Linen Shirt"));

  let body: Value = test::call_and_read_body_json(&app, toggle(shirt.id)).await;
  assert_eq!(body["message"], json!("Removed from Favorites"));
  let body: Value = test::call_and_read_body_json(&app, list()).await;
  assert_eq!(body["favoriteIds"], json!([]));

  let resp = test::call_service(&app, toggle(uuid::Uuid::new_v4())).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
#[serial]
async fn admin_updates_and_removes_products() {
  let state = test_state();
  let admin = token_for(&add_user(&state, "admin@example.com", UserRole::Admin).await);
  let customer = token_for(&add_user(&state, "asha@example.com", UserRole::User).await);
  let app = init_app!(state);

  let new_product = json!({
    "name": "Wool Scarf",
    "description": "Warm",
    "price": 2_500,
    "category": "Women",
    "subCategory": "Winterwear",
    "sizes": ["Free"],
    "stockQuantity": 4,
  });
  let req = test::TestRequest::post()
    .uri("/api/product/add")
    .insert_header(("token", customer.clone()))
    .set_json(new_product.clone())
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let req = test::TestRequest::post()
    .uri("/api/product/add")
    .insert_header(("token", admin.clone()))
    .set_json(new_product)
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["message"], json!("Product Added"));
  let product_id = body["product"]["id"].as_str().unwrap().to_string();

  let req = test::TestRequest::put()
    .uri(&format!("/api/product/update/{}", product_id))
    .insert_header(("token", admin.clone()))
    .set_json(json!({ "price": 1_999, "bestseller": true }))
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["product"]["price"], json!(1_999));
  assert_eq!(body["product"]["bestseller"], json!(true));
  assert_eq!(body["product"]["name"], json!("Wool Scarf"));
  assert_eq!(body["product"]["stockQuantity"], json!(4));

  let req = test::TestRequest::put()
    .uri(&format!("/api/product/update/{}", product_id))
    .insert_header(("token", admin.clone()))
    .set_json(json!({ "stockQuantity": -1 }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let remove = || {
    test::TestRequest::post()
      .uri("/api/product/remove")
      .insert_header(("token", admin.clone()))
      .set_json(json!({ "id": product_id }))
      .to_request()
  };
  let resp = test::call_service(&app, remove()).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let resp = test::call_service(&app, remove()).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);

  let req = test::TestRequest::get().uri("/api/product/list").to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["products"], json!([]));
}

#[actix_rt::test]
#[serial]
async fn cart_update_sets_quantity_and_zero_removes_the_line() {
  let state = test_state();
  let shirt = add_product(&state, "Linen Shirt", 10_000, 5).await;
  let user = add_user(&state, "asha@example.com", UserRole::User).await;
  state
    .store
    .save_cart(
      user.id,
      &[
        CartLine {
          product_id: shirt.id,
          size: Some("M".into()),
          color: None,
          quantity: 1,
        },
        CartLine {
          product_id: shirt.id,
          size: Some("L".into()),
          color: None,
          quantity: 2,
        },
      ],
    )
    .await
    .unwrap();
  let token = token_for(&user);
  let app = init_app!(state);

  let update = |size: &str, quantity: i32| {
    test::TestRequest::post()
      .uri("/api/cart/update")
      .insert_header(("token", token.clone()))
      .set_json(json!({ "productId": shirt.id, "size": size, "quantity": quantity }))
      .to_request()
  };

  let body: Value = test::call_and_read_body_json(&app, update("M", 3)).await;
  assert_eq!(body["cartData"][0]["quantity"], json!(3));

  let body: Value = test::call_and_read_body_json(&app, update("L", 0)).await;
  assert_eq!(body["cartData"].as_array().unwrap().len(), 1);
  assert_eq!(body["cartData"][0]["size"], json!("M"));

  let resp = test::call_service(&app, update("XL", 1)).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);

  let cart = state.store.user(user.id).await.unwrap().unwrap().cart;
  assert_eq!(cart.len(), 1);
  assert_eq!(cart[0].quantity, 3);
}
