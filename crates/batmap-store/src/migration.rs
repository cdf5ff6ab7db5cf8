//! One-time import of legacy `.batmap` files into the store.

use std::path::Path;

use batmap_graph::Area;
use tracing::{info, instrument, warn};

use crate::error::{Result, StoreError};
use crate::legacy::{list_legacy_area_names, migrated_path, read_legacy_file, LEGACY_EXTENSION};
use crate::storage::AreaStore;

/// Area names by what migration did with their legacy file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Imported into the store and marked.
    pub migrated: Vec<String>,
    /// Already stored; the file was only marked.
    pub already_present: Vec<String>,
    /// Left unmarked so the next startup retries them.
    pub failed: Vec<String>,
}

impl MigrationReport {
    pub fn is_empty(&self) -> bool {
        self.migrated.is_empty() && self.already_present.is_empty() && self.failed.is_empty()
    }
}

/// Import every unmigrated legacy file in `areas_dir`.
///
/// A file that cannot be read or imported is logged and skipped; the rest
/// of the batch still runs.
#[instrument(skip_all, fields(dir = %areas_dir.display()))]
pub async fn migrate_legacy_areas(store: &AreaStore, areas_dir: &Path) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();

    for name in list_legacy_area_names(areas_dir)? {
        let path = areas_dir.join(format!("{}.{}", name, LEGACY_EXTENSION));
        match migrate_one(store, &name, &path).await {
            Ok(true) => report.migrated.push(name),
            Ok(false) => report.already_present.push(name),
            Err(err) => {
                warn!("Legacy area {} not migrated: {}", name, err);
                report.failed.push(name);
            }
        }
    }

    if !report.is_empty() {
        info!(
            "Legacy migration: {} imported, {} already present, {} failed",
            report.migrated.len(),
            report.already_present.len(),
            report.failed.len()
        );
    }
    Ok(report)
}

/// Returns true if the area was imported, false if it was already stored.
async fn migrate_one(store: &AreaStore, name: &str, path: &Path) -> Result<bool> {
    let imported = if store.area_exists(name).await? {
        false
    } else {
        let mut snapshot = read_legacy_file(path)?;
        // The file name is the area's identity from here on
        snapshot.area = Area::new(name);
        store.save_area(name, &snapshot).await?;
        true
    };

    let target = migrated_path(path);
    std::fs::rename(path, &target).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legacy::{legacy_file_path, write_legacy_file};
    use batmap_graph::{AreaSnapshot, Exit, Room};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_store() -> AreaStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        AreaStore::init_schema(&pool).await.unwrap();
        AreaStore::new(pool)
    }

    fn legacy_area(dir: &Path, name: &str, rooms: &[(&str, &str)]) {
        let mut snapshot = AreaSnapshot::new(Area::new(name));
        for (id, short) in rooms {
            let mut room = Room::new(*id);
            room.short_desc = Some(short.to_string());
            room.long_desc = Some(format!("You stand in the {}.", short.to_lowercase()));
            snapshot.graph.add_room(room);
        }
        for pair in rooms.windows(2) {
            snapshot
                .graph
                .add_edge(pair[0].0, pair[1].0, Exit::new("east"))
                .unwrap();
        }
        write_legacy_file(&legacy_file_path(dir, name), &snapshot).unwrap();
    }

    #[tokio::test]
    async fn test_migrates_every_file() {
        let dir = tempfile::tempdir().unwrap();
        legacy_area(dir.path(), "sunderland", &[("s1", "Market"), ("s2", "Harbor")]);
        legacy_area(dir.path(), "batcity", &[("b1", "Plaza")]);
        legacy_area(dir.path(), "mistyvale", &[("m1", "Meadow"), ("m2", "Forest"), ("m3", "Cave")]);

        let store = setup_store().await;
        let report = migrate_legacy_areas(&store, dir.path()).await.unwrap();

        assert_eq!(report.migrated, vec!["batcity", "mistyvale", "sunderland"]);
        assert!(report.failed.is_empty());
        assert_eq!(
            store.list_area_names().await.unwrap(),
            vec!["batcity", "mistyvale", "sunderland"]
        );
        assert!(dir.path().join("sunderland.batmap.migrated").exists());
        assert!(!dir.path().join("sunderland.batmap").exists());

        let misty = store.load_area("mistyvale").await.unwrap().unwrap();
        assert_eq!(misty.graph.vertex_count(), 3);
        assert_eq!(misty.graph.edge_count(), 2);
    }

    #[tokio::test]
    async fn test_migration_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        legacy_area(dir.path(), "sunderland", &[("s1", "Market"), ("s2", "Harbor")]);

        let store = setup_store().await;
        migrate_legacy_areas(&store, dir.path()).await.unwrap();
        let second = migrate_legacy_areas(&store, dir.path()).await.unwrap();
        assert!(second.is_empty());

        // A stale file for a stored area is marked but never re-imported
        legacy_area(dir.path(), "sunderland", &[("x1", "Ruins")]);
        let third = migrate_legacy_areas(&store, dir.path()).await.unwrap();
        assert_eq!(third.already_present, vec!["sunderland"]);
        assert!(!dir.path().join("sunderland.batmap").exists());

        let stored = store.load_area("sunderland").await.unwrap().unwrap();
        assert_eq!(stored.graph.vertex_count(), 2);
        assert!(!stored.graph.contains_room("x1"));
        assert_eq!(store.room_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_file_left_for_retry() {
        let dir = tempfile::tempdir().unwrap();
        legacy_area(dir.path(), "sunderland", &[("s1", "Market")]);
        std::fs::write(dir.path().join("broken.batmap"), b"garbage").unwrap();

        let store = setup_store().await;
        let report = migrate_legacy_areas(&store, dir.path()).await.unwrap();

        assert_eq!(report.migrated, vec!["sunderland"]);
        assert_eq!(report.failed, vec!["broken"]);
        assert!(dir.path().join("broken.batmap").exists());
        assert!(!store.area_exists("broken").await.unwrap());
    }

    #[tokio::test]
    async fn test_search_across_migrated_areas() {
        let dir = tempfile::tempdir().unwrap();
        legacy_area(dir.path(), "sunderland", &[("s1", "Old Harbor"), ("s2", "Market")]);
        legacy_area(dir.path(), "batcity", &[("b1", "Harbor Gate"), ("b2", "Plaza")]);

        let store = setup_store().await;
        migrate_legacy_areas(&store, dir.path()).await.unwrap();

        let results = store.search_rooms("harbor").await.unwrap();
        let found: Vec<_> = results
            .iter()
            .map(|r| (r.area_name.as_str(), r.room_id.as_str()))
            .collect();
        assert_eq!(found, vec![("batcity", "b1"), ("sunderland", "s1")]);
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let store = setup_store().await;
        let report = migrate_legacy_areas(&store, &dir.path().join("batMapAreas"))
            .await
            .unwrap();
        assert!(report.is_empty());
    }
}
