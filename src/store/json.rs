use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use log::{debug, warn};
use serde_json::Value;

use crate::error::StoreResult;
use crate::models::record::{Record, RecordForm};

/// Flat-file backend: one pretty-printed JSON array per collection.
///
/// Identity is positional: a record's id is its 1-based index in the array as last written,
/// so deleting id `k` renumbers every record after it.
pub struct JsonStore {
    backup_keep: usize,
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl JsonStore {
    pub fn new(backup_keep: usize) -> Self {
        Self {
            backup_keep,
            locks: DashMap::new(),
        }
    }

    /// Every record in file order. Absent files, and files whose top level is not a JSON
    /// array, read as empty; malformed entries inside an array keep their position.
    pub fn list(&self, path: &Path) -> Vec<Record> {
        let raw = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(values) => values
                .iter()
                .enumerate()
                .map(|(i, v)| Record::from_value(v, i as i64 + 1))
                .collect(),
            Err(e) => {
                warn!("{} is not a JSON array ({}), treating as empty", path.display(), e);
                vec![]
            }
        }
    }

    pub fn get(&self, path: &Path, id: i64) -> Option<Record> {
        let index = position(id)?;
        self.list(path).into_iter().nth(index)
    }

    /// Back up the current file, then atomically replace it with `records`.
    pub fn replace_all(&self, path: &Path, records: Vec<Record>) -> StoreResult<()> {
        let lock = self.lock_for(path);
        let _guard = acquire(&lock);
        self.write_locked(path, records)
    }

    pub fn insert(&self, path: &Path, form: &RecordForm) -> StoreResult<Record> {
        let lock = self.lock_for(path);
        let _guard = acquire(&lock);
        let mut records = self.list(path);
        let record = form
            .clone()
            .into_record(records.len() as i64 + 1, Some(now_stamp()));
        records.push(record.clone());
        self.write_locked(path, records)?;
        Ok(record)
    }

    /// `Ok(None)` when `id` is outside the array; the array never grows on update.
    pub fn update(&self, path: &Path, id: i64, form: &RecordForm) -> StoreResult<Option<Record>> {
        let lock = self.lock_for(path);
        let _guard = acquire(&lock);
        let mut records = self.list(path);
        let slot = match position(id).and_then(|i| records.get_mut(i)) {
            Some(slot) => slot,
            None => return Ok(None),
        };
        *slot = form.clone().into_record(id, Some(now_stamp()));
        let updated = slot.clone();
        self.write_locked(path, records)?;
        Ok(Some(updated))
    }

    /// `Ok(false)` when `id` is outside the array.
    pub fn delete(&self, path: &Path, id: i64) -> StoreResult<bool> {
        let lock = self.lock_for(path);
        let _guard = acquire(&lock);
        let mut records = self.list(path);
        match position(id) {
            Some(i) if i < records.len() => {
                records.remove(i);
                self.write_locked(path, records)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn count(&self, path: &Path) -> i64 {
        self.list(path).len() as i64
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        self.locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn write_locked(&self, path: &Path, mut records: Vec<Record>) -> StoreResult<()> {
        let dir = parent_dir(path);
        fs::create_dir_all(&dir)?;

        if path.exists() {
            let backup = backup_path(path, &chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string());
            fs::copy(path, &backup)?;
            debug!("backed up {} to {}", path.display(), backup.display());
        }

        for (i, r) in records.iter_mut().enumerate() {
            r.id = i as i64 + 1;
        }
        let body = serde_json::to_string_pretty(&records)?;

        // Write beside the target and rename over it, so readers never see a partial file
        let tmp = dir.join(format!(".{}.tmp", file_name(path)));
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(body.as_bytes())?;
            f.sync_all()?;
        }
        fs::rename(&tmp, path)?;

        if self.backup_keep > 0 {
            prune_backups(path, self.backup_keep);
        }
        Ok(())
    }
}

fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    // A panicking writer cannot leave the file half-written, so a poisoned lock is still usable
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn position(id: i64) -> Option<usize> {
    if id < 1 {
        return None;
    }
    usize::try_from(id - 1).ok()
}

fn now_stamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `.bak_<basename>.<YYYYMMDD_HHMMSS>` next to the original.
pub fn backup_path(path: &Path, stamp: &str) -> PathBuf {
    parent_dir(path).join(format!(".bak_{}.{}", file_name(path), stamp))
}

/// Backups of `path`, oldest first. The timestamp suffix sorts chronologically.
pub fn list_backups(path: &Path) -> Vec<PathBuf> {
    let prefix = format!(".bak_{}.", file_name(path));
    let mut found: Vec<PathBuf> = fs::read_dir(parent_dir(path))
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .map(|n| n.to_string_lossy().starts_with(&prefix))
                        .unwrap_or(false)
                })
                .collect()
        })
        .unwrap_or_default();
    found.sort();
    found
}

fn prune_backups(path: &Path, keep: usize) {
    let backups = list_backups(path);
    if backups.len() <= keep {
        return;
    }
    for old in &backups[..backups.len() - keep] {
        if let Err(e) = fs::remove_file(old) {
            warn!("could not remove old backup {}: {}", old.display(), e);
        }
    }
}
