//! Batmap Store - durable storage for area graphs.
//!
//! This crate persists one graph (plus room coordinates) per area:
//!
//! - **Storage**: `AreaStore`, the SQLite-backed area tables
//! - **Legacy**: reader/writer for the old whole-graph `.batmap` files
//! - **Migration**: one-time import of legacy files into the store
//! - **Persister**: `AreaPersister`, the startup entry point that degrades to
//!   legacy file listing when the store cannot be opened
//!
//! # Example
//!
//! ```ignore
//! use batmap_store::{AreaPersister, MapperPaths, StoreConfig};
//!
//! let paths = MapperPaths::from_env();
//! let config = StoreConfig::load(&paths.config_path)?;
//! let persister = AreaPersister::initialize(&paths, &config).await;
//!
//! for name in persister.list_area_names().await? {
//!     println!("{}", name);
//! }
//! ```

pub mod config;
pub mod error;
pub mod legacy;
pub mod migration;
pub mod paths;
pub mod persister;
pub mod storage;

// Re-export commonly used types
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use migration::{migrate_legacy_areas, MigrationReport};
pub use paths::MapperPaths;
pub use persister::AreaPersister;
pub use storage::{AreaStore, SearchResult};
