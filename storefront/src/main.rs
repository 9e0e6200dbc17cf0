// storefront/src/main.rs

use storefront::config::AppConfig;
use storefront::services::gateways::Gateways;
use storefront::state::AppState;
use storefront::store::{seed, MemoryStore, PgStore, Store};
use storefront::web::configure_app_routes;

use actix_web::{web as actix_data, App, HttpServer};
use sqlx::PgPool;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let json_output = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  if json_output {
    builder.json().init();
  } else {
    builder.init();
  }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  dotenvy::dotenv().ok();
  init_tracing();

  tracing::info!("Starting storefront server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }
  };

  let store: Arc<dyn Store> = match app_config.database_url.as_deref() {
    Some(url) => {
      let pool = PgPool::connect(url).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to connect to the database.");
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e.to_string())
      })?;
      tracing::info!("Successfully connected to the database.");
      let pg = PgStore::new(pool);
      if app_config.run_migrations {
        pg.migrate().await.map_err(|e| {
          tracing::error!(error = %e, "Database migration failed.");
          std::io::Error::other(e.to_string())
        })?;
      }
      Arc::new(pg)
    }
    None => {
      tracing::warn!("DATABASE_URL not set; running on the in-memory store.");
      Arc::new(MemoryStore::new())
    }
  };

  if app_config.seed_db {
    if let Err(e) = seed::seed_store(store.as_ref(), &app_config).await {
      tracing::error!(error = %e, "Failed to seed the store.");
    }
  }

  let gateways = Gateways::sandbox(&app_config.gateways);
  let app_state = AppState::new(store, app_config.clone(), gateways);

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
