//! TIDAL API client module.

pub mod api;
pub mod auth;
pub mod catalog;
pub mod models;

pub use api::{ApiClientError, TidalClient};
pub use catalog::{ApiResult, Catalog};
