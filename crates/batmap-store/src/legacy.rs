//! Legacy `.batmap` area files.
//!
//! Before the SQLite store, every area was written as one JSON blob holding
//! the whole graph object. Vertices and edge endpoints embed complete room
//! objects, so the same room appears many times. Reading normalizes the blob
//! back onto one vertex per room id.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use batmap_graph::{Area, AreaSnapshot, Exit, Location, Room};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};

/// Extension of legacy area files.
pub const LEGACY_EXTENSION: &str = "batmap";

/// Suffix appended to a legacy file once it has been migrated.
pub const MIGRATED_SUFFIX: &str = ".migrated";

/// Number of `.N.bk` copies kept of a legacy file that is overwritten.
pub const LEGACY_BACKUP_SLOTS: usize = 5;

#[derive(Debug, Serialize, Deserialize)]
struct LegacyAreaFile {
    area: Area,
    graph: LegacyGraph,
    #[serde(default)]
    locations: Vec<LegacyLocation>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LegacyGraph {
    #[serde(default)]
    vertices: Vec<Room>,
    #[serde(default)]
    edges: Vec<LegacyEdge>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LegacyEdge {
    exit: Exit,
    source: Room,
    target: Room,
}

#[derive(Debug, Serialize, Deserialize)]
struct LegacyLocation {
    room: Room,
    x: f64,
    y: f64,
}

/// File name for an area: `'` and `/` removed, `.batmap` appended.
pub fn legacy_file_name(area_name: &str) -> String {
    let stem: String = area_name.chars().filter(|c| *c != '\'' && *c != '/').collect();
    format!("{}.{}", stem, LEGACY_EXTENSION)
}

pub fn legacy_file_path(dir: &Path, area_name: &str) -> PathBuf {
    dir.join(legacy_file_name(area_name))
}

/// Path a migrated legacy file is renamed to.
pub fn migrated_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(MIGRATED_SUFFIX);
    PathBuf::from(name)
}

/// Area names of the unmigrated legacy files in `dir`, sorted.
///
/// A missing directory holds no areas.
pub fn list_legacy_area_names(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let io_err = |source: std::io::Error| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some(LEGACY_EXTENSION) {
            continue;
        }
        match path.file_stem().and_then(|stem| stem.to_str()) {
            Some(stem) => names.push(stem.to_string()),
            None => warn!("Skipping legacy file with non UTF-8 name: {}", path.display()),
        }
    }
    names.sort();
    Ok(names)
}

/// Read a legacy file into a normalized snapshot.
pub fn read_legacy_file(path: &Path) -> Result<AreaSnapshot> {
    let bytes = fs::read(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: LegacyAreaFile =
        serde_json::from_slice(&bytes).map_err(|source| StoreError::CorruptLegacyInput {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(normalize(file, path))
}

/// Write `snapshot` in the legacy layout.
pub fn write_legacy_file(path: &Path, snapshot: &AreaSnapshot) -> Result<()> {
    let file = denormalize(snapshot);
    let bytes = serde_json::to_vec(&file).map_err(|source| StoreError::LegacyEncoding {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, bytes).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Save an area as a legacy file in `dir`, the fallback when the store is
/// unavailable.
///
/// An existing file is first renamed into a free `.0.bk`..`.4.bk` slot, or
/// over the least recently modified one when all slots are taken.
pub fn save_legacy_area(dir: &Path, area_name: &str, snapshot: &AreaSnapshot) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = legacy_file_path(dir, area_name);

    if path.is_file() {
        let slot = backup_slot(&path);
        fs::rename(&path, &slot).map_err(|source| StoreError::Io {
            path: slot.clone(),
            source,
        })?;
        debug!("Rotated {} to {}", path.display(), slot.display());
    }

    write_legacy_file(&path, snapshot)?;
    Ok(path)
}

fn backup_path(path: &Path, slot: usize) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}.bk", slot));
    PathBuf::from(name)
}

fn backup_slot(path: &Path) -> PathBuf {
    let mut oldest: Option<(SystemTime, PathBuf)> = None;
    for slot in 0..LEGACY_BACKUP_SLOTS {
        let candidate = backup_path(path, slot);
        let modified = match fs::metadata(&candidate) {
            Ok(meta) => meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            Err(_) => return candidate,
        };
        if oldest.as_ref().map_or(true, |(time, _)| modified < *time) {
            oldest = Some((modified, candidate));
        }
    }
    oldest.map_or_else(|| backup_path(path, 0), |(_, candidate)| candidate)
}

/// Move area files left in a pre-`conf/` areas directory into `new_dir`.
///
/// Files already present in `new_dir` are left where they are. The old
/// directory is removed once it holds no files. Returns how many were moved.
pub fn relocate_legacy_dir(old_dir: &Path, new_dir: &Path) -> Result<usize> {
    if !old_dir.is_dir() {
        return Ok(0);
    }
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| StoreError::Io { path, source }
    };

    let files = files_in(old_dir)?;
    if !files.is_empty() {
        fs::create_dir_all(new_dir).map_err(io_err(new_dir))?;
    }

    let mut moved = 0;
    for file in &files {
        let Some(name) = file.file_name() else {
            continue;
        };
        let target = new_dir.join(name);
        if target.exists() {
            debug!("Keeping {}, {} already exists", file.display(), target.display());
            continue;
        }
        fs::rename(file, &target).map_err(io_err(file))?;
        moved += 1;
    }

    if files_in(old_dir)?.is_empty() {
        if let Err(err) = fs::remove_dir(old_dir) {
            debug!("Leaving {} in place: {}", old_dir.display(), err);
        }
    }
    if moved > 0 {
        info!("Moved {} legacy area files to {}", moved, new_dir.display());
    }
    Ok(moved)
}

fn files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let io_err = |source: std::io::Error| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

fn normalize(file: LegacyAreaFile, path: &Path) -> AreaSnapshot {
    let mut snapshot = AreaSnapshot::new(file.area);

    for room in file.graph.vertices {
        let id = room.id.clone();
        if !snapshot.graph.add_room(room) {
            debug!("Dropping repeated copy of room {} in {}", id, path.display());
        }
    }

    // Endpoints are copies; only their ids tie them to the vertices
    for edge in file.graph.edges {
        if let Err(err) = snapshot
            .graph
            .restore_edge(&edge.source.id, &edge.target.id, edge.exit)
        {
            warn!("Skipping legacy edge in {}: {}", path.display(), err);
        }
    }

    for location in file.locations {
        if snapshot.graph.contains_room(&location.room.id) {
            snapshot
                .locations
                .insert(location.room.id, Location::new(location.x, location.y));
        } else {
            warn!(
                "Skipping location of unknown room {} in {}",
                location.room.id,
                path.display()
            );
        }
    }

    snapshot
}

fn denormalize(snapshot: &AreaSnapshot) -> LegacyAreaFile {
    let graph = &snapshot.graph;
    let edges = graph
        .edges()
        .filter_map(|edge| {
            let source = graph.room(&edge.source)?.clone();
            let target = graph.room(&edge.target)?.clone();
            Some(LegacyEdge {
                exit: edge.exit.clone(),
                source,
                target,
            })
        })
        .collect();
    let locations = snapshot
        .locations
        .iter()
        .filter_map(|(id, location)| {
            graph.room(id).map(|room| LegacyLocation {
                room: room.clone(),
                x: location.x,
                y: location.y,
            })
        })
        .collect();

    LegacyAreaFile {
        area: snapshot.area.clone(),
        graph: LegacyGraph {
            vertices: graph.rooms().cloned().collect(),
            edges,
        },
        locations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn room_json(id: &str, short: &str) -> serde_json::Value {
        json!({
            "id": id,
            "area": { "name": "sunderland" },
            "short_desc": short,
            "long_desc": null,
            "notes": null,
            "label": null,
            "area_entrance": id == "r1",
            "indoors": false,
            "color": null,
            "exits": ["north", "south"],
            "used_exits": []
        })
    }

    #[test]
    fn test_legacy_file_name_strips_quotes_and_slashes() {
        assert_eq!(legacy_file_name("sunderland"), "sunderland.batmap");
        assert_eq!(legacy_file_name("dragon's lair/upper"), "dragons lairupper.batmap");
        assert_eq!(
            migrated_path(Path::new("/maps/sunderland.batmap")),
            PathBuf::from("/maps/sunderland.batmap.migrated")
        );
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let mut snapshot = AreaSnapshot::new(Area::new("sunderland"));
        let mut gate = Room::new("r2");
        gate.short_desc = Some("City gate".to_string());
        gate.add_exits(["south", "north"]);
        snapshot.graph.add_room(Room::new("r1"));
        snapshot.graph.add_room(gate);
        snapshot.graph.add_edge("r1", "r2", Exit::new("north")).unwrap();
        snapshot.graph.add_edge("r2", "r1", Exit::new("south")).unwrap();
        snapshot.locations.insert("r2".to_string(), Location::new(1.0, 2.0));

        let path = legacy_file_path(dir.path(), "sunderland");
        write_legacy_file(&path, &snapshot).unwrap();
        let read = read_legacy_file(&path).unwrap();

        assert_eq!(read.area, Area::new("sunderland"));
        assert_eq!(read.graph.vertex_count(), 2);
        assert_eq!(read.graph.edge_count(), 2);
        assert_eq!(read.graph.room("r2").unwrap().exits.len(), 2);
        assert_eq!(read.locations.get("r2"), Some(&Location::new(1.0, 2.0)));
    }

    #[test]
    fn test_read_normalizes_repeated_room_copies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sunderland.batmap");
        let blob = json!({
            "area": { "name": "sunderland" },
            "graph": {
                "vertices": [room_json("r1", "Road"), room_json("r2", "Gate"), room_json("r1", "Stale copy")],
                "edges": [
                    { "exit": { "exit": "north" }, "source": room_json("r1", "Road"), "target": room_json("r2", "Gate") },
                    { "exit": { "exit": "south" }, "source": room_json("r2", "Gate"), "target": room_json("r1", "Road") },
                    { "exit": { "exit": "down" }, "source": room_json("r2", "Gate"), "target": room_json("r9", "Nowhere") }
                ]
            },
            "locations": [
                { "room": room_json("r2", "Gate"), "x": 3.5, "y": 4.0 },
                { "room": room_json("r9", "Nowhere"), "x": 0.0, "y": 0.0 }
            ]
        });
        fs::write(&path, serde_json::to_vec(&blob).unwrap()).unwrap();

        let snapshot = read_legacy_file(&path).unwrap();
        assert_eq!(snapshot.graph.vertex_count(), 2);
        assert_eq!(
            snapshot.graph.room("r1").unwrap().short_desc.as_deref(),
            Some("Road")
        );
        assert_eq!(snapshot.graph.edge_count(), 2);
        assert_eq!(snapshot.locations.len(), 1);
        assert_eq!(snapshot.locations.get("r2"), Some(&Location::new(3.5, 4.0)));
    }

    #[test]
    fn test_read_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.batmap");
        fs::write(&path, b"\xac\xed\x00\x05not json").unwrap();

        let err = read_legacy_file(&path).unwrap_err();
        assert!(matches!(err, StoreError::CorruptLegacyInput { .. }));
    }

    #[test]
    fn test_list_legacy_area_names() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["sunderland.batmap", "batcity.batmap", "old.batmap.migrated", "notes.txt"] {
            fs::write(dir.path().join(name), b"{}").unwrap();
        }
        fs::create_dir(dir.path().join("nested.batmap")).unwrap();

        assert_eq!(
            list_legacy_area_names(dir.path()).unwrap(),
            vec!["batcity", "sunderland"]
        );
        assert!(list_legacy_area_names(&dir.path().join("missing"))
            .unwrap()
            .is_empty());
    }

    fn one_room(name: &str, id: &str) -> AreaSnapshot {
        let mut snapshot = AreaSnapshot::new(Area::new(name));
        snapshot.graph.add_room(Room::new(id));
        snapshot
    }

    #[cfg(unix)]
    #[test]
    fn test_list_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sunderland.batmap"), b"{}").unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"bad\xff.batmap")), b"{}").unwrap();

        assert_eq!(list_legacy_area_names(dir.path()).unwrap(), vec!["sunderland"]);
    }

    #[test]
    fn test_save_legacy_area_creates_dir_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let areas_dir = dir.path().join("conf").join("batMapAreas");

        let path = save_legacy_area(&areas_dir, "dragon's lair", &one_room("dragon's lair", "d1")).unwrap();
        assert_eq!(path, areas_dir.join("dragons lair.batmap"));
        assert!(read_legacy_file(&path).unwrap().graph.contains_room("d1"));
        assert_eq!(list_legacy_area_names(&areas_dir).unwrap(), vec!["dragons lair"]);
        assert!(!backup_path(&path, 0).exists());
    }

    #[test]
    fn test_save_legacy_area_rotates_backups() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..7 {
            save_legacy_area(dir.path(), "sunderland", &one_room("sunderland", &format!("r{}", i))).unwrap();
        }

        let path = legacy_file_path(dir.path(), "sunderland");
        assert!(read_legacy_file(&path).unwrap().graph.contains_room("r6"));
        for slot in 0..LEGACY_BACKUP_SLOTS {
            assert!(backup_path(&path, slot).is_file(), "slot {}", slot);
        }
        assert!(!backup_path(&path, LEGACY_BACKUP_SLOTS).exists());
        assert_eq!(list_legacy_area_names(dir.path()).unwrap(), vec!["sunderland"]);
    }

    #[test]
    fn test_save_legacy_area_replaces_oldest_backup() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..6 {
            save_legacy_area(dir.path(), "sunderland", &one_room("sunderland", &format!("r{}", i))).unwrap();
        }
        let path = legacy_file_path(dir.path(), "sunderland");

        // Make slot 3 the oldest copy
        let now = SystemTime::now();
        for slot in 0..LEGACY_BACKUP_SLOTS {
            let age = if slot == 3 { 3600 } else { 60 };
            fs::File::options()
                .write(true)
                .open(backup_path(&path, slot))
                .unwrap()
                .set_modified(now - std::time::Duration::from_secs(age))
                .unwrap();
        }

        save_legacy_area(dir.path(), "sunderland", &one_room("sunderland", "r6")).unwrap();
        let replaced = read_legacy_file(&backup_path(&path, 3)).unwrap();
        assert!(replaced.graph.contains_room("r5"));
        assert!(read_legacy_file(&path).unwrap().graph.contains_room("r6"));
    }

    #[test]
    fn test_relocate_legacy_dir() {
        let dir = tempfile::tempdir().unwrap();
        let old_dir = dir.path().join("batMapAreas");
        let new_dir = dir.path().join("conf").join("batMapAreas");
        fs::create_dir_all(&old_dir).unwrap();
        fs::create_dir_all(&new_dir).unwrap();
        fs::write(old_dir.join("sunderland.batmap"), b"old sunderland").unwrap();
        fs::write(old_dir.join("batcity.batmap"), b"old batcity").unwrap();
        fs::write(new_dir.join("batcity.batmap"), b"new batcity").unwrap();

        assert_eq!(relocate_legacy_dir(&old_dir, &new_dir).unwrap(), 1);
        assert_eq!(fs::read(new_dir.join("sunderland.batmap")).unwrap(), b"old sunderland");
        assert_eq!(fs::read(new_dir.join("batcity.batmap")).unwrap(), b"new batcity");
        // The clashing file stays behind, so does the directory
        assert!(old_dir.join("batcity.batmap").exists());

        fs::remove_file(old_dir.join("batcity.batmap")).unwrap();
        assert_eq!(relocate_legacy_dir(&old_dir, &new_dir).unwrap(), 0);
        assert!(!old_dir.exists());
        assert_eq!(relocate_legacy_dir(&old_dir, &new_dir).unwrap(), 0);
    }
}
