// storefront/src/models/mod.rs

//! Records persisted by the stores and returned by the API.

pub mod order;
pub mod product;
pub mod review;
pub mod user;

pub use order::{
  Order, OrderItem, OrderLineRequest, OrderStatus, OrderType, PaymentMethod, PaymentStatus, ShippingAddress,
};
pub use product::{NewProduct, Product, ProductPatch};
pub use review::Review;
pub use user::{CartLine, User, UserRole};
