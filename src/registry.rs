use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::backend::{select_backend, Backend};
use crate::config::{CollectionConfig, Config};
use crate::error::{StoreError, StoreResult};
use crate::migrate::{self, MigrationReport};
use crate::models::record::{Record, RecordForm};

/// Maps collection names to their storage and routes CRUD to the active backend.
///
/// The backend is chosen on first use and then fixed for the life of the registry.
pub struct Registry {
    config: Config,
    backend: OnceCell<Backend>,
}

#[derive(Debug, Serialize)]
pub struct CollectionStatus {
    pub name: String,
    pub table: String,
    pub file: String,
    pub records: i64,
}

#[derive(Debug, Serialize)]
pub struct Status {
    pub backend: &'static str,
    pub collections: Vec<CollectionStatus>,
}

impl Registry {
    pub fn new(config: Config) -> Self {
        Registry {
            config,
            backend: OnceCell::new(),
        }
    }

    /// Use an already-selected backend instead of probing.
    pub fn with_backend(config: Config, backend: Backend) -> Self {
        Registry {
            config,
            backend: OnceCell::with_value(backend),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Select the backend at most once; concurrent first callers wait for the same result.
    pub fn backend(&self) -> StoreResult<&Backend> {
        self.backend.get_or_try_init(|| select_backend(&self.config))
    }

    pub fn for_name<'a>(&'a self, name: &'a str) -> StoreResult<CollectionHandle<'a>> {
        let collection = self.config.collection(name)?;
        Ok(CollectionHandle {
            name,
            collection,
            backend: self.backend()?,
        })
    }

    pub fn list(&self, name: &str) -> StoreResult<Vec<Record>> {
        self.for_name(name)?.list()
    }

    pub fn get(&self, name: &str, id: i64) -> StoreResult<Record> {
        self.for_name(name)?.get(id)
    }

    pub fn insert(&self, name: &str, form: &RecordForm) -> StoreResult<Record> {
        self.for_name(name)?.insert(form)
    }

    pub fn update(&self, name: &str, id: i64, form: &RecordForm) -> StoreResult<Record> {
        self.for_name(name)?.update(id, form)
    }

    pub fn delete(&self, name: &str, id: i64) -> StoreResult<()> {
        self.for_name(name)?.delete(id)
    }

    pub fn migrate(&self, name: &str) -> StoreResult<MigrationReport> {
        let collection = self.config.collection(name)?;
        migrate::migrate(self.backend()?, collection)
    }

    pub fn status(&self) -> StoreResult<Status> {
        let backend = self.backend()?;
        let mut collections = Vec::with_capacity(self.config.collections.len());
        for name in self.config.collections.keys() {
            let handle = self.for_name(name)?;
            collections.push(CollectionStatus {
                name: name.clone(),
                table: handle.collection.table.clone(),
                file: handle.collection.file.display().to_string(),
                records: handle.count()?,
            });
        }
        Ok(Status {
            backend: backend.name(),
            collections,
        })
    }
}

/// A collection bound to the active backend.
pub struct CollectionHandle<'a> {
    name: &'a str,
    collection: &'a CollectionConfig,
    backend: &'a Backend,
}

impl<'a> CollectionHandle<'a> {
    pub fn is_public(&self) -> bool {
        self.collection.public_read
    }

    pub fn list(&self) -> StoreResult<Vec<Record>> {
        match self.backend {
            Backend::Relational(store) => store.list(&self.collection.table),
            Backend::File(files) => Ok(files.list(&self.collection.file)),
        }
    }

    pub fn get(&self, id: i64) -> StoreResult<Record> {
        let found = match self.backend {
            Backend::Relational(store) => store.get(&self.collection.table, id)?,
            Backend::File(files) => files.get(&self.collection.file, id),
        };
        found.ok_or_else(|| StoreError::not_found(self.name, id))
    }

    /// Validates before touching storage, then returns the stored record.
    pub fn insert(&self, form: &RecordForm) -> StoreResult<Record> {
        let form = form.checked()?;
        match self.backend {
            Backend::Relational(store) => {
                let id = store.insert(&self.collection.table, &form)?;
                self.get(id)
            }
            Backend::File(files) => files.insert(&self.collection.file, &form),
        }
    }

    pub fn update(&self, id: i64, form: &RecordForm) -> StoreResult<Record> {
        let form = form.checked()?;
        match self.backend {
            Backend::Relational(store) => {
                // Zero touched rows is either a missing id or an unchanged row; get() tells them apart
                store.update(&self.collection.table, id, &form)?;
                self.get(id)
            }
            Backend::File(files) => files
                .update(&self.collection.file, id, &form)?
                .ok_or_else(|| StoreError::not_found(self.name, id)),
        }
    }

    pub fn delete(&self, id: i64) -> StoreResult<()> {
        let deleted = match self.backend {
            Backend::Relational(store) => store.delete(&self.collection.table, id)?,
            Backend::File(files) => files.delete(&self.collection.file, id)?,
        };
        if deleted {
            Ok(())
        } else {
            Err(StoreError::not_found(self.name, id))
        }
    }

    pub fn count(&self) -> StoreResult<i64> {
        match self.backend {
            Backend::Relational(store) => store.count(&self.collection.table),
            Backend::File(files) => Ok(files.count(&self.collection.file)),
        }
    }
}
