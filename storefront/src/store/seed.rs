// storefront/src/store/seed.rs

//! Demo catalog and optional admin account for `SEED_DB=true`.

use crate::config::AppConfig;
use crate::errors::Result;
use crate::models::{NewProduct, User, UserRole};
use crate::services::auth_service;
use crate::store::{CatalogStore, Store, UserStore};
use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

fn demo_products() -> Vec<NewProduct> {
  let garment = |name: &str, price: i64, category: &str, sub: &str, stock: i32, bestseller: bool| NewProduct {
    name: name.to_string(),
    description: format!("{} from the demo catalog.", name),
    price,
    original_price: None,
    images: vec![],
    category: category.to_string(),
    sub_category: sub.to_string(),
    sizes: vec!["S".into(), "M".into(), "L".into()],
    colors: vec![],
    stock_quantity: stock,
    bestseller,
  };
  vec![
    garment("Cotton Crew Tee", 49_900, "Men", "Topwear", 40, true),
    garment("Slim Fit Chinos", 129_900, "Men", "Bottomwear", 25, false),
    garment("Linen Wrap Dress", 189_900, "Women", "Topwear", 15, true),
    garment("Quilted Puffer Jacket", 349_900, "Women", "Winterwear", 8, false),
    garment("Kids Hoodie", 79_900, "Kids", "Winterwear", 30, false),
  ]
}

/// Inserts the demo catalog when the store has no products yet, and the
/// admin account when both seed credentials are configured.
#[instrument(name = "seed::seed_store", skip_all, err(Display))]
pub async fn seed_store(store: &dyn Store, config: &AppConfig) -> Result<()> {
  if store.list_products().await?.is_empty() {
    let products = demo_products();
    let count = products.len();
    for new_product in products {
      store.insert_product(&new_product.into_product()?).await?;
    }
    info!(count, "Seeded demo catalog.");
  }

  if let (Some(email), Some(password)) = (&config.seed_admin_email, &config.seed_admin_password) {
    if store.user_by_email(email).await?.is_none() {
      let now = Utc::now();
      let admin = User {
        id: Uuid::new_v4(),
        name: "Administrator".to_string(),
        email: email.clone(),
        password_hash: auth_service::hash_password(password)?,
        role: UserRole::Admin,
        cart: vec![],
        favorites: vec![],
        created_at: now,
        updated_at: now,
      };
      store.insert_user(&admin).await?;
      info!(%email, "Seeded admin account.");
    }
  }
  Ok(())
}
