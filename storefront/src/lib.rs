// storefront/src/lib.rs

//! Storefront order service: catalog, carts, order lifecycle with inventory
//! accounting, and payment gateway verification over an actix-web API.

pub mod config;
pub mod errors;
pub mod inventory;
pub mod lifecycle;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod store;
pub mod web;
