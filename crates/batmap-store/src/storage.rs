//! Area storage operations for SQLite.
//!
//! This module provides the `AreaStore` struct for persisting and querying
//! area graphs. Each area is stored as tabular rows: rooms, their declared
//! and used exits, and one row per graph edge keyed by room ids.

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use batmap_graph::{Area, AreaGraph, AreaSnapshot, Color, Exit, Location, Room};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, instrument, warn};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};

/// A room matching a search, without its graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub room_id: String,
    pub area_name: String,
    pub short_desc: Option<String>,
    pub long_desc: Option<String>,
}

type RoomRow = (
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    i64,
    i64,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<f64>,
    Option<f64>,
);

/// Area storage backed by SQLite.
#[derive(Clone)]
pub struct AreaStore {
    pool: SqlitePool,
}

impl AreaStore {
    /// Create a new AreaStore with an existing connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the store file at `db_path`.
    pub async fn open(db_path: &Path, config: &StoreConfig) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let options = SqliteConnectOptions::from_str("sqlite:")?
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout());
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.busy_timeout())
            .connect_with(options)
            .await?;
        Self::init_schema(&pool).await?;
        info!("Area store opened at {}", db_path.display());
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the area schema.
    #[instrument(skip_all)]
    pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS areas (
                name TEXT NOT NULL PRIMARY KEY
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rooms (
                id            TEXT NOT NULL,
                area_name     TEXT NOT NULL REFERENCES areas(name) ON DELETE CASCADE,
                short_desc    TEXT,
                long_desc     TEXT,
                notes         TEXT,
                label         TEXT,
                area_entrance INTEGER NOT NULL DEFAULT 0,
                indoors       INTEGER NOT NULL DEFAULT 0,
                color_r       INTEGER,
                color_g       INTEGER,
                color_b       INTEGER,
                color_a       INTEGER,
                loc_x         REAL,
                loc_y         REAL,
                PRIMARY KEY (id, area_name)
            )",
        )
        .execute(pool)
        .await?;

        // Declared and used exits share a shape
        for table in ["room_exits", "room_used_exits"] {
            sqlx::query(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    room_id   TEXT NOT NULL,
                    area_name TEXT NOT NULL,
                    exit_name TEXT NOT NULL,
                    PRIMARY KEY (room_id, area_name, exit_name),
                    FOREIGN KEY (room_id, area_name) REFERENCES rooms(id, area_name) ON DELETE CASCADE
                )"
            ))
            .execute(pool)
            .await?;
        }

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS graph_edges (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                area_name   TEXT NOT NULL,
                exit_name   TEXT NOT NULL,
                compass_dir TEXT,
                source_room TEXT NOT NULL,
                target_room TEXT NOT NULL,
                FOREIGN KEY (source_room, area_name) REFERENCES rooms(id, area_name) ON DELETE CASCADE,
                FOREIGN KEY (target_room, area_name) REFERENCES rooms(id, area_name) ON DELETE CASCADE
            )",
        )
        .execute(pool)
        .await?;

        // Indexes for per-area reads
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_rooms_area ON rooms(area_name)")
            .execute(pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_edges_area ON graph_edges(area_name)")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Replace everything stored for `name` with `snapshot`.
    ///
    /// Runs as one transaction: on failure nothing changes.
    #[instrument(skip(self, snapshot), fields(rooms = snapshot.graph.vertex_count(), edges = snapshot.graph.edge_count()))]
    pub async fn save_area(&self, name: &str, snapshot: &AreaSnapshot) -> Result<()> {
        let result = async {
            let mut tx = self.pool.begin().await?;
            write_area(&mut tx, name, snapshot).await?;
            tx.commit().await
        }
        .await;

        result.map_err(|source| {
            warn!("Rolled back save of area {}: {}", name, source);
            StoreError::TransactionFailure {
                area: name.to_string(),
                source,
            }
        })
    }

    /// Load an area's graph and room locations, or `None` if it was never saved.
    #[instrument(skip(self))]
    pub async fn load_area(&self, name: &str) -> Result<Option<AreaSnapshot>> {
        // One read transaction so a concurrent save is seen entirely or not at all
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, i64>("SELECT 1 FROM areas WHERE name = ?1")
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let area = Area::new(name);
        let mut snapshot = AreaSnapshot::new(area.clone());

        let rows = sqlx::query_as::<_, RoomRow>(
            "SELECT id, short_desc, long_desc, notes, label, area_entrance, indoors,
                    color_r, color_g, color_b, color_a, loc_x, loc_y
             FROM rooms WHERE area_name = ?1 ORDER BY rowid",
        )
        .bind(name)
        .fetch_all(&mut *tx)
        .await?;

        for (id, short_desc, long_desc, notes, label, area_entrance, indoors, r, g, b, a, loc_x, loc_y) in rows {
            let mut room = Room::in_area(id, &area);
            room.short_desc = short_desc;
            room.long_desc = long_desc;
            room.notes = notes;
            room.label = label;
            room.area_entrance = area_entrance == 1;
            room.indoors = indoors == 1;
            room.color = r.map(|r| {
                Color::rgba(
                    channel(r),
                    channel(g.unwrap_or(0)),
                    channel(b.unwrap_or(0)),
                    channel(a.unwrap_or(255)),
                )
            });
            if let Some(x) = loc_x {
                snapshot
                    .locations
                    .insert(room.id.clone(), Location::new(x, loc_y.unwrap_or(0.0)));
            }
            snapshot.graph.add_room(room);
        }

        let exits = sqlx::query_as::<_, (String, String)>(
            "SELECT room_id, exit_name FROM room_exits WHERE area_name = ?1",
        )
        .bind(name)
        .fetch_all(&mut *tx)
        .await?;
        for (room_id, exit_name) in exits {
            if let Some(room) = snapshot.graph.room_mut(&room_id) {
                room.add_exit(exit_name);
            }
        }

        let used = sqlx::query_as::<_, (String, String)>(
            "SELECT room_id, exit_name FROM room_used_exits WHERE area_name = ?1",
        )
        .bind(name)
        .fetch_all(&mut *tx)
        .await?;
        for (room_id, exit_name) in used {
            if let Some(room) = snapshot.graph.room_mut(&room_id) {
                room.use_exit(exit_name);
            }
        }

        let edges = sqlx::query_as::<_, (String, String, String)>(
            "SELECT exit_name, source_room, target_room FROM graph_edges
             WHERE area_name = ?1 ORDER BY id",
        )
        .bind(name)
        .fetch_all(&mut *tx)
        .await?;
        for (exit_name, source, target) in edges {
            if let Err(err) = snapshot.graph.restore_edge(&source, &target, Exit::new(exit_name)) {
                debug!("Skipping edge with missing endpoint in {}: {}", name, err);
            }
        }

        tx.commit().await?;
        Ok(Some(snapshot))
    }

    /// All stored area names, sorted.
    pub async fn list_area_names(&self) -> Result<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>("SELECT name FROM areas ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    pub async fn area_exists(&self, name: &str) -> Result<bool> {
        let row = sqlx::query_scalar::<_, i64>("SELECT 1 FROM areas WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Delete an area and everything that belongs to it.
    #[instrument(skip(self))]
    pub async fn delete_area(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM areas WHERE name = ?1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Search rooms of all areas by short or long description.
    ///
    /// Matching is a case-insensitive substring test. Each room appears once.
    #[instrument(skip(self))]
    pub async fn search_rooms(&self, term: &str) -> Result<Vec<SearchResult>> {
        // SQLite LOWER() folds ASCII only
        let needle = term.to_lowercase();
        let rows = sqlx::query_as::<_, (String, String, Option<String>, Option<String>)>(
            "SELECT id, area_name, short_desc, long_desc FROM rooms
             WHERE short_desc IS NOT NULL OR long_desc IS NOT NULL
             ORDER BY area_name, id",
        )
        .fetch_all(&self.pool)
        .await?;

        let matches = |desc: &Option<String>| {
            desc.as_deref()
                .is_some_and(|text| text.to_lowercase().contains(&needle))
        };
        Ok(rows
            .into_iter()
            .filter(|(_, _, short_desc, long_desc)| matches(short_desc) || matches(long_desc))
            .map(|(room_id, area_name, short_desc, long_desc)| SearchResult {
                room_id,
                area_name,
                short_desc,
                long_desc,
            })
            .collect())
    }

    /// Write a full copy of the store to `path`, replacing any file there.
    #[instrument(skip(self))]
    pub async fn backup_to(&self, path: &Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path).map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let target = path.to_string_lossy().replace('\'', "''");
        let sql = format!("VACUUM INTO '{}'", target);
        sqlx::query(&sql).execute(&self.pool).await?;
        info!("Area store backed up to {}", path.display());
        Ok(())
    }

    /// Get total room count across all areas.
    pub async fn room_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rooms")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Get total edge count across all areas.
    pub async fn edge_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM graph_edges")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Delete and re-insert every row of one area inside `tx`.
async fn write_area(
    tx: &mut Transaction<'_, Sqlite>,
    name: &str,
    snapshot: &AreaSnapshot,
) -> std::result::Result<(), sqlx::Error> {
    // Cascades to rooms, their exits and the edges between them
    sqlx::query("DELETE FROM areas WHERE name = ?1")
        .bind(name)
        .execute(&mut **tx)
        .await?;
    sqlx::query("INSERT INTO areas (name) VALUES (?1)")
        .bind(name)
        .execute(&mut **tx)
        .await?;

    let graph: &AreaGraph = &snapshot.graph;
    let mut inserted: HashSet<&str> = HashSet::new();
    for room in graph.rooms() {
        let color = room.color;
        let location = snapshot.locations.get(&room.id);
        let result = sqlx::query(
            "INSERT OR IGNORE INTO rooms (id, area_name, short_desc, long_desc, notes, label,
                area_entrance, indoors, color_r, color_g, color_b, color_a, loc_x, loc_y)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .bind(&room.id)
        .bind(name)
        .bind(room.short_desc.as_deref())
        .bind(room.long_desc.as_deref())
        .bind(room.notes.as_deref())
        .bind(room.label.as_deref())
        .bind(i64::from(room.area_entrance))
        .bind(i64::from(room.indoors))
        .bind(color.map(|c| i64::from(c.r)))
        .bind(color.map(|c| i64::from(c.g)))
        .bind(color.map(|c| i64::from(c.b)))
        .bind(color.map(|c| i64::from(c.a)))
        .bind(location.map(|loc| loc.x))
        .bind(location.map(|loc| loc.y))
        .execute(&mut **tx)
        .await?;
        if result.rows_affected() > 0 {
            inserted.insert(room.id.as_str());
        }
    }

    for room in graph.rooms().filter(|room| inserted.contains(room.id.as_str())) {
        for exit_name in &room.exits {
            sqlx::query("INSERT OR IGNORE INTO room_exits (room_id, area_name, exit_name) VALUES (?1, ?2, ?3)")
                .bind(&room.id)
                .bind(name)
                .bind(exit_name)
                .execute(&mut **tx)
                .await?;
        }
        for exit_name in &room.used_exits {
            sqlx::query("INSERT OR IGNORE INTO room_used_exits (room_id, area_name, exit_name) VALUES (?1, ?2, ?3)")
                .bind(&room.id)
                .bind(name)
                .bind(exit_name)
                .execute(&mut **tx)
                .await?;
        }
    }

    for edge in graph.edges() {
        sqlx::query(
            "INSERT INTO graph_edges (area_name, exit_name, compass_dir, source_room, target_room)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(name)
        .bind(&edge.exit.exit)
        .bind(edge.exit.compass_dir())
        .bind(&edge.source)
        .bind(&edge.target)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

fn channel(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}
