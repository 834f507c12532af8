use std::sync::Arc;

use log::{info, warn};

use crate::config::{Config, DriverKind};
use crate::error::{StoreError, StoreResult};
use crate::store::json::JsonStore;
use crate::store::sqlite::SqliteStore;
use crate::store::SqlStore;

/// The one storage backend serving every collection for the life of the process.
pub enum Backend {
    Relational(Arc<dyn SqlStore>),
    File(JsonStore),
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Relational(store) => store.engine(),
            Backend::File(_) => "json",
        }
    }

    pub fn is_relational(&self) -> bool {
        matches!(self, Backend::Relational(_))
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Backend({})", self.name())
    }
}

/// Try each tier of `driver_priority` in order and keep the first that connects and
/// accepts the schema. The file backend is the terminal fallback even when unlisted.
pub fn select_backend(config: &Config) -> StoreResult<Backend> {
    for driver in &config.driver_priority {
        if *driver == DriverKind::Json {
            break;
        }
        info!("Trying storage tier: {}", driver.as_str());
        match connect(config, *driver) {
            Ok(Some(store)) => match ensure_all(config, store.as_ref()) {
                Ok(()) => {
                    info!("Using {} backend", store.engine());
                    return Ok(Backend::Relational(store));
                }
                Err(e) => warn!("{} connected but schema setup failed: {}", driver.as_str(), e),
            },
            Ok(None) => info!("{} driver not available in this build", driver.as_str()),
            Err(e) => warn!("{} unavailable: {}", driver.as_str(), e),
        }
    }

    file_fallback(config)
}

fn connect(config: &Config, driver: DriverKind) -> StoreResult<Option<Arc<dyn SqlStore>>> {
    match driver {
        DriverKind::Mysql => connect_mysql(config, MysqlTier::Tcp),
        DriverKind::MysqlSocket => connect_mysql(config, MysqlTier::Socket),
        DriverKind::Sqlite => {
            let store = SqliteStore::new_at(&config.database.embedded_path)?;
            Ok(Some(Arc::new(store)))
        }
        DriverKind::Json => Ok(None),
    }
}

enum MysqlTier {
    Tcp,
    Socket,
}

#[cfg(feature = "mysql")]
fn connect_mysql(config: &Config, tier: MysqlTier) -> StoreResult<Option<Arc<dyn SqlStore>>> {
    use crate::store::mysql::{MysqlStore, Transport};
    let transport = match tier {
        MysqlTier::Tcp => Transport::Tcp,
        MysqlTier::Socket => Transport::Socket,
    };
    let store = MysqlStore::connect(&config.database, transport)?;
    Ok(Some(Arc::new(store)))
}

#[cfg(not(feature = "mysql"))]
fn connect_mysql(_config: &Config, _tier: MysqlTier) -> StoreResult<Option<Arc<dyn SqlStore>>> {
    Ok(None)
}

fn ensure_all(config: &Config, store: &dyn SqlStore) -> StoreResult<()> {
    for table in config.tables() {
        store.ensure_schema(table)?;
    }
    Ok(())
}

/// The file backend needs every collection's directory to exist.
fn file_fallback(config: &Config) -> StoreResult<Backend> {
    for (name, c) in &config.collections {
        if let Some(dir) = c.file.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    StoreError::Config(format!(
                        "no relational backend and collection '{}' cannot use {}: {}",
                        name,
                        dir.display(),
                        e
                    ))
                })?;
            }
        }
    }
    warn!("No relational backend available, serving collections from JSON files");
    Ok(Backend::File(JsonStore::new(config.storage.backup_keep)))
}
