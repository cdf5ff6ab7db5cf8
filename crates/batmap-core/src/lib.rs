use anyhow::{Context, Result};
use tracing::{info, warn};

pub use batmap_graph::{
    Area, AreaGraph, AreaSnapshot, CommandOutcome, Compass, Exit, GraphError, Location,
    MapperCommand, MapperEngine, MapperMode, Room, TELEPORT_EXIT,
};
pub use batmap_store::{
    AreaPersister, AreaStore, MapperPaths, MigrationReport, SearchResult, StoreConfig, StoreError,
};

/// One mapping session: the engine for the area the player is in, plus
/// the persister every area is loaded from and saved to.
pub struct Mapper {
    paths: MapperPaths,
    persister: AreaPersister,
    engine: Option<MapperEngine>,
}

impl Mapper {
    pub async fn init(paths: &MapperPaths) -> Result<Self> {
        info!("Initializing batmap...");
        paths.ensure_dirs()?;
        let config = StoreConfig::load(&paths.config_path)
            .with_context(|| format!("loading {}", paths.config_path.display()))?;
        let persister = AreaPersister::initialize(paths, &config).await;
        if persister.is_degraded() {
            warn!("Running without area store; maps are saved as legacy files and start empty");
        }
        Ok(Self {
            paths: paths.clone(),
            persister,
            engine: None,
        })
    }

    pub fn paths(&self) -> &MapperPaths {
        &self.paths
    }

    pub fn persister(&self) -> &AreaPersister {
        &self.persister
    }

    pub fn is_degraded(&self) -> bool {
        self.persister.is_degraded()
    }

    pub fn current_area(&self) -> Option<&Area> {
        self.engine.as_ref().map(MapperEngine::area)
    }

    /// Switch mapping to `name`.
    ///
    /// The area being left is saved first. The new area resumes from its
    /// stored graph, or starts empty. Navigation modes carry over.
    pub async fn enter_area(&mut self, name: &str) -> Result<()> {
        if self.current_area().map(|area| area.name.as_str()) == Some(name) {
            return Ok(());
        }

        self.save_current_area().await?;

        let stored = match self.persister.load_area(name).await {
            Ok(stored) => stored,
            Err(StoreError::StorageUnavailable { .. }) => None,
            Err(err) => return Err(err).with_context(|| format!("loading area {}", name)),
        };

        let mut engine = match stored {
            Some(snapshot) => MapperEngine::from_snapshot(snapshot),
            None => MapperEngine::new(Area::new(name)),
        };
        if let Some(previous) = &self.engine {
            engine.set_maze_mode(previous.maze_mode());
            engine.set_reversable_dirs_mode(previous.reversable_dirs_mode());
        }

        info!(
            "Entered area {} ({} rooms, {} exits)",
            name,
            engine.graph().vertex_count(),
            engine.graph().edge_count()
        );
        self.engine = Some(engine);
        Ok(())
    }

    /// Apply a command to the current area's engine.
    pub fn handle(&mut self, command: MapperCommand) -> Result<CommandOutcome> {
        let engine = self
            .engine
            .as_mut()
            .context("no area entered yet")?;
        if let MapperCommand::ModeToggled { mode, enabled } = &command {
            info!(
                "{} mode {} in {}",
                mode.as_str(),
                if *enabled { "on" } else { "off" },
                engine.area().name
            );
        }
        Ok(engine.apply(command)?)
    }

    /// Save the current area. Returns false when there was nothing to save.
    pub async fn save_current_area(&self) -> Result<bool> {
        let Some(engine) = &self.engine else {
            return Ok(false);
        };
        if engine.graph().is_empty() {
            return Ok(false);
        }
        let name = &engine.area().name;
        self.persister
            .save_area(name, &engine.snapshot())
            .await
            .with_context(|| format!("saving area {}", name))?;
        Ok(true)
    }

    pub async fn list_area_names(&self) -> Result<Vec<String>> {
        Ok(self.persister.list_area_names().await?)
    }

    pub async fn search_rooms(&self, term: &str) -> Result<Vec<SearchResult>> {
        Ok(self.persister.search_rooms(term).await?)
    }

    pub fn engine(&self) -> Option<&MapperEngine> {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut MapperEngine> {
        self.engine.as_mut()
    }

    /// Save the current area and close the store.
    pub async fn shutdown(self) -> Result<()> {
        let saved = self.save_current_area().await;
        self.persister.close().await;
        saved.map(|_| ())
    }
}
