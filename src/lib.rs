//! catex: explore columnar data catalogs from the terminal.
//!
//! A metacatalog (a parquet index of named datastores) and the datastores
//! themselves are fetched over HTTP, queried through a one-shot embedded SQL
//! engine session, normalized into a canonical cell shape, and cached per
//! datastore name with load deduplication and explicit eviction. The binary
//! in `main.rs` is a thin consumer of the cache API.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod datastore;
pub mod error;
pub mod fetch;
pub mod filters;
pub mod normalize;
pub mod session;
pub mod snippet;
#[cfg(test)]
pub(crate) mod testutil;

pub use catalog::{CatalogEntry, CatalogStore, CATALOG_LIST_FIELDS};
pub use cli::Args;
pub use config::{AppConfig, ConfigManager};
pub use datastore::{DatastoreCache, DatastoreRecord, LoadStatus, RESERVED_INDEX_COLUMN};
pub use error::LoadError;
pub use filters::build_filter_options;
pub use normalize::{CellValue, DataRow};
pub use session::EngineSession;
pub use snippet::build_search_snippet;

/// Application name used for the config directory and other app-specific paths
pub const APP_NAME: &str = "catex";
