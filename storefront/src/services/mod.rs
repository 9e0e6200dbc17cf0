// storefront/src/services/mod.rs

pub mod auth_service;
pub mod gateways;
pub mod payment_verification;
