//! Startup entry point for area persistence.
//!
//! `AreaPersister` owns the store when it could be opened. Otherwise it runs
//! degraded: area names come from the legacy files on disk, saves are
//! written as legacy files, and loads report the store as unavailable.

use std::path::{Path, PathBuf};

use batmap_graph::AreaSnapshot;
use tracing::{info, instrument, warn};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::legacy::{list_legacy_area_names, relocate_legacy_dir, save_legacy_area};
use crate::migration::migrate_legacy_areas;
use crate::paths::MapperPaths;
use crate::storage::{AreaStore, SearchResult};

pub struct AreaPersister {
    store: Option<AreaStore>,
    areas_dir: PathBuf,
    degraded_reason: Option<String>,
}

impl AreaPersister {
    /// Back up, open and migrate the store. Never fails: a store that cannot
    /// be opened leaves the persister degraded.
    #[instrument(skip_all, fields(db = %paths.db_path.display()))]
    pub async fn initialize(paths: &MapperPaths, config: &StoreConfig) -> Self {
        if let Err(err) = relocate_legacy_dir(&paths.old_areas_dir, &paths.areas_dir) {
            warn!("Failed to move legacy area files: {}", describe(&err));
        }

        let had_prior_store = std::fs::metadata(&paths.db_path)
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false);

        let store = match AreaStore::open(&paths.db_path, config).await {
            Ok(store) => store,
            Err(err) => {
                let reason = describe(&err);
                warn!("Area store unavailable, falling back to legacy area files: {}", reason);
                return Self {
                    store: None,
                    areas_dir: paths.areas_dir.clone(),
                    degraded_reason: Some(reason),
                };
            }
        };

        if had_prior_store && config.backup_on_startup {
            if let Err(err) = store.backup_to(&paths.backup_path).await {
                warn!("Failed to back up area store: {}", describe(&err));
            }
        }

        if config.migrate_legacy {
            match migrate_legacy_areas(&store, &paths.areas_dir).await {
                Ok(report) if !report.failed.is_empty() => {
                    warn!("{} legacy areas will be retried next start", report.failed.len());
                }
                Ok(_) => {}
                Err(err) => warn!("Legacy migration skipped: {}", describe(&err)),
            }
        }

        info!("Area persistence ready");
        Self {
            store: Some(store),
            areas_dir: paths.areas_dir.clone(),
            degraded_reason: None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.store.is_none()
    }

    /// The open store, unless degraded.
    pub fn store(&self) -> Option<&AreaStore> {
        self.store.as_ref()
    }

    pub fn areas_dir(&self) -> &Path {
        &self.areas_dir
    }

    fn available(&self) -> Result<&AreaStore> {
        self.store.as_ref().ok_or_else(|| StoreError::StorageUnavailable {
            reason: self.degraded_reason.clone().unwrap_or_default(),
        })
    }

    /// Save to the store, or to a legacy file when degraded.
    pub async fn save_area(&self, name: &str, snapshot: &AreaSnapshot) -> Result<()> {
        match &self.store {
            Some(store) => store.save_area(name, snapshot).await,
            None => {
                let path = save_legacy_area(&self.areas_dir, name, snapshot)?;
                info!("Area store unavailable, saved {} to {}", name, path.display());
                Ok(())
            }
        }
    }

    pub async fn load_area(&self, name: &str) -> Result<Option<AreaSnapshot>> {
        self.available()?.load_area(name).await
    }

    /// Stored area names, or the legacy file stems when degraded.
    pub async fn list_area_names(&self) -> Result<Vec<String>> {
        match &self.store {
            Some(store) => store.list_area_names().await,
            None => list_legacy_area_names(&self.areas_dir),
        }
    }

    /// Search all stored rooms. Degraded persisters find nothing.
    pub async fn search_rooms(&self, term: &str) -> Result<Vec<SearchResult>> {
        match &self.store {
            Some(store) => store.search_rooms(term).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn close(&self) {
        if let Some(store) = &self.store {
            store.close().await;
        }
    }
}

fn describe(err: &StoreError) -> String {
    match std::error::Error::source(err) {
        Some(source) => format!("{}: {}", err, source),
        None => err.to_string(),
    }
}
