//! Bedrinth library exports

pub mod catalog;
pub mod config;
pub mod error;

pub use config::BedrinthConfig;
pub use error::CatalogError;
