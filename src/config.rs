use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use log::warn;
use serde::Deserialize;

use crate::error::{StoreError, StoreResult};

pub const DEFAULT_CONFIG_PATH: &str = "curio.toml";

/// A storage tier the selector may try, in the order given by `driver_priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// MySQL over TCP (primary driver)
    Mysql,
    /// MySQL over the local Unix socket (secondary protocol, same engine)
    MysqlSocket,
    /// Embedded single-file SQLite database
    Sqlite,
    /// Flat JSON files, one per collection
    Json,
}

impl DriverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverKind::Mysql => "mysql",
            DriverKind::MysqlSocket => "mysql_socket",
            DriverKind::Sqlite => "sqlite",
            DriverKind::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub socket: Option<PathBuf>,
    pub embedded_path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 3306,
            user: "curio".to_string(),
            password: String::new(),
            name: "curio".to_string(),
            socket: None,
            embedded_path: PathBuf::from("data/curio.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Number of `.bak_*` copies kept per collection file; 0 keeps every backup.
    pub backup_keep: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig { backup_keep: 10 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionConfig {
    pub file: PathBuf,
    pub table: String,
    #[serde(default)]
    pub public_read: bool,
}

impl CollectionConfig {
    fn new(file: &str, table: &str) -> Self {
        CollectionConfig {
            file: PathBuf::from(file),
            table: table.to_string(),
            public_read: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub driver_priority: Vec<DriverKind>,
    pub admin_token: Option<String>,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub collections: BTreeMap<String, CollectionConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let mut collections = BTreeMap::new();
        collections.insert(
            "items".to_string(),
            CollectionConfig::new("data/stuff.json", "items"),
        );
        collections.insert(
            "videos".to_string(),
            CollectionConfig::new("data/videos.json", "videos"),
        );
        collections.insert(
            "photos".to_string(),
            CollectionConfig::new("data/photography.json", "photos"),
        );
        Config {
            driver_priority: vec![
                DriverKind::Mysql,
                DriverKind::MysqlSocket,
                DriverKind::Sqlite,
                DriverKind::Json,
            ],
            admin_token: None,
            database: DatabaseConfig::default(),
            storage: StorageConfig::default(),
            collections,
        }
    }
}

impl Config {
    /// Read and validate the TOML config. A missing file yields the defaults.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("{} not found, using default configuration", path.display());
                return Ok(Config::default());
            }
            Err(e) => return Err(StoreError::Config(format!("{}: {}", path.display(), e))),
        };
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> StoreResult<Self> {
        let config: Config =
            toml::from_str(raw).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.collections.is_empty() {
            return Err(StoreError::Config("no collections configured".to_string()));
        }
        let mut tables = HashSet::new();
        let mut files = HashSet::new();
        for (name, c) in &self.collections {
            if !is_sql_identifier(&c.table) {
                return Err(StoreError::Config(format!(
                    "collection '{}': '{}' is not a valid table name",
                    name, c.table
                )));
            }
            if !tables.insert(c.table.to_ascii_lowercase()) {
                return Err(StoreError::Config(format!(
                    "table '{}' is used by more than one collection",
                    c.table
                )));
            }
            if !files.insert(c.file.clone()) {
                return Err(StoreError::Config(format!(
                    "file '{}' is used by more than one collection",
                    c.file.display()
                )));
            }
        }
        Ok(())
    }

    pub fn collection(&self, name: &str) -> StoreResult<&CollectionConfig> {
        self.collections
            .get(name)
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.collections.values().map(|c| c.table.as_str())
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub fn is_sql_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    s.len() <= 64 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
