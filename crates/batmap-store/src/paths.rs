//! On-disk layout of a mapper installation.

use std::path::PathBuf;

use anyhow::Result;

const CONF_DIR: &str = "conf";
const DB_FILE: &str = "batmapper.db";
const BACKUP_FILE: &str = "batmapper.db.bk";
const AREAS_DIR: &str = "batMapAreas";
const CONFIG_FILE: &str = "batmapper.toml";

#[derive(Debug, Clone)]
pub struct MapperPaths {
    pub base_dir: PathBuf,
    pub conf_dir: PathBuf,
    pub db_path: PathBuf,
    pub backup_path: PathBuf,
    pub areas_dir: PathBuf,     // legacy *.batmap files
    pub old_areas_dir: PathBuf, // pre-conf/ location of areas_dir
    pub config_path: PathBuf,
}

impl MapperPaths {
    pub fn from_env() -> Self {
        if let Some(dir) = std::env::var_os("BATMAP_DATA_DIR") {
            return Self::from_base(PathBuf::from(dir));
        }
        if let Some(home) = std::env::var_os("HOME") {
            return Self::from_base(PathBuf::from(home).join(".batmap"));
        }
        Self::from_base(PathBuf::from(".batmap"))
    }

    pub fn from_base(base_dir: PathBuf) -> Self {
        let conf_dir = base_dir.join(CONF_DIR);
        let db_path = conf_dir.join(DB_FILE);
        let backup_path = conf_dir.join(BACKUP_FILE);
        let areas_dir = conf_dir.join(AREAS_DIR);
        let config_path = conf_dir.join(CONFIG_FILE);
        let old_areas_dir = base_dir.join(AREAS_DIR);
        Self {
            base_dir,
            conf_dir,
            db_path,
            backup_path,
            areas_dir,
            old_areas_dir,
            config_path,
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.conf_dir)?;
        Ok(())
    }
}
