// storefront/src/web/routes.rs

use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::errors::AppError;
use crate::web::handlers::{
  cart_handlers, order_handlers, payment_handlers, product_handlers, review_handlers, user_handlers,
};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Malformed bodies get the same failure shape as every other rejection.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
  AppError::Validation(err.to_string()).into()
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler));

  cfg.service(
    web::scope("/api")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/order")
          // Admin
          .route("/list", web::get().to(order_handlers::list_orders_handler))
          .route("/status", web::post().to(order_handlers::update_status_handler))
          // Creation
          .route("/direct-order", web::post().to(order_handlers::direct_order_handler))
          .route("/place", web::post().to(order_handlers::place_order_handler))
          .route("/stripe", web::post().to(order_handlers::stripe_order_handler))
          .route("/razorpay", web::post().to(order_handlers::razorpay_order_handler))
          // Gateway returns
          .route("/verifyStripe", web::post().to(payment_handlers::verify_stripe_handler))
          .route("/verifyRazorpay", web::post().to(payment_handlers::verify_razorpay_handler))
          // Customer
          .route("/userorders", web::get().to(order_handlers::user_orders_handler))
          .route("/userorders/{id}", web::delete().to(order_handlers::delete_order_handler))
          .route("/{order_id}/cancel", web::put().to(order_handlers::cancel_order_handler))
          .route("/{order_id}/resume", web::put().to(order_handlers::resume_order_handler))
          .route("/{order_id}/reorder", web::post().to(order_handlers::reorder_handler))
          .route(
            "/{order_id}/soft-delete",
            web::delete().to(order_handlers::soft_delete_order_handler),
          ),
      )
      .service(
        web::scope("/product")
          .route("/list", web::get().to(product_handlers::list_products_handler))
          .route("/single", web::post().to(product_handlers::single_product_handler))
          .route("/add", web::post().to(product_handlers::add_product_handler))
          .route("/update/{id}", web::put().to(product_handlers::update_product_handler))
          .route("/remove", web::post().to(product_handlers::remove_product_handler)),
      )
      .service(
        web::scope("/user")
          .route("/register", web::post().to(user_handlers::register_handler))
          .route("/login", web::post().to(user_handlers::login_handler))
          .route("/admin", web::post().to(user_handlers::admin_login_handler))
          .route("/me/{id}", web::get().to(user_handlers::profile_handler))
          .route("/favorites", web::put().to(user_handlers::toggle_favorite_handler))
          .route("/favorites", web::get().to(user_handlers::list_favorites_handler)),
      )
      .service(
        web::scope("/cart")
          .route("/get", web::post().to(cart_handlers::get_cart_handler))
          .route("/add", web::post().to(cart_handlers::add_to_cart_handler))
          .route("/update", web::post().to(cart_handlers::update_cart_handler)),
      )
      .service(
        web::scope("/review")
          .route("", web::post().to(review_handlers::add_review_handler))
          .route("/reviews/{review_id}", web::put().to(review_handlers::update_review_handler))
          .route("/{product_id}", web::get().to(review_handlers::product_reviews_handler))
          .route("/{id}", web::delete().to(review_handlers::delete_review_handler)),
      ),
  );
}
