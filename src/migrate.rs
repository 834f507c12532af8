use log::{info, warn};
use serde::Serialize;

use crate::backend::Backend;
use crate::config::CollectionConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::json::JsonStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub imported: usize,
    pub skipped: usize,
}

/// Copy a collection's JSON file into its table, once.
///
/// Refuses (reporting every file record as skipped) when the table already has rows, so a
/// second run never duplicates. The source file is only read.
pub fn migrate(backend: &Backend, collection: &CollectionConfig) -> StoreResult<MigrationReport> {
    let store = match backend {
        Backend::Relational(store) => store,
        Backend::File(_) => {
            return Err(StoreError::Precondition(
                "migration needs a relational backend, but collections are served from JSON files"
                    .to_string(),
            ))
        }
    };
    store.ensure_schema(&collection.table)?;

    let records = JsonStore::new(0).list(&collection.file);
    if records.is_empty() {
        info!("{}: nothing to migrate", collection.file.display());
        return Ok(MigrationReport {
            imported: 0,
            skipped: 0,
        });
    }

    let existing = store.count(&collection.table)?;
    if existing > 0 {
        warn!(
            "table {} already holds {} row(s); skipping migration of {} record(s)",
            collection.table,
            existing,
            records.len()
        );
        return Ok(MigrationReport {
            imported: 0,
            skipped: records.len(),
        });
    }

    let mut report = MigrationReport {
        imported: 0,
        skipped: 0,
    };
    for record in &records {
        match record.to_form().checked() {
            Ok(form) => {
                store.insert(&collection.table, &form)?;
                report.imported += 1;
            }
            Err(_) => report.skipped += 1,
        }
    }

    info!(
        "Migrated {} into {}: {} imported, {} skipped",
        collection.file.display(),
        collection.table,
        report.imported,
        report.skipped
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::error::ErrorKind;
    use crate::store::tests::{sample, test_store};
    use crate::store::SqlStore;

    fn collection(dir: &Path) -> CollectionConfig {
        CollectionConfig {
            file: dir.join("stuff.json"),
            table: "items".to_string(),
            public_read: true,
        }
    }

    /// Writes `valid` complete records and `invalid` records missing an image.
    fn seed_file(path: &Path, valid: usize, invalid: usize) {
        let files = JsonStore::new(0);
        let mut records = Vec::new();
        for i in 0..valid {
            records.push(sample(&format!("ok{}", i)).into_record(0, None));
        }
        for i in 0..invalid {
            let mut form = sample(&format!("bad{}", i));
            form.image.clear();
            records.push(form.into_record(0, None));
        }
        files.replace_all(path, records).unwrap();
    }

    #[test]
    fn second_run_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let c = collection(dir.path());
        seed_file(&c.file, 3, 2);
        let backend = Backend::Relational(Arc::new(test_store()));

        let first = migrate(&backend, &c).unwrap();
        assert_eq!(first, MigrationReport { imported: 3, skipped: 2 });

        let second = migrate(&backend, &c).unwrap();
        assert_eq!(second, MigrationReport { imported: 0, skipped: 5 });

        if let Backend::Relational(store) = &backend {
            assert_eq!(store.count("items").unwrap(), 3);
        }
    }

    #[test]
    fn null_fields_count_as_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let c = collection(dir.path());
        std::fs::write(
            &c.file,
            r#"[{"title": "good", "description": "d", "username": "u", "url": "https://x", "image": "i"},
                {"id": "2", "title": null, "description": "d", "username": "u", "url": "https://x", "image": "i"}]"#,
        )
        .unwrap();
        let backend = Backend::Relational(Arc::new(test_store()));
        assert_eq!(
            migrate(&backend, &c).unwrap(),
            MigrationReport { imported: 1, skipped: 1 }
        );
    }

    #[test]
    fn empty_or_missing_source_reports_zero() {
        let dir = tempfile::tempdir().unwrap();
        let c = collection(dir.path());
        let backend = Backend::Relational(Arc::new(test_store()));
        assert_eq!(
            migrate(&backend, &c).unwrap(),
            MigrationReport { imported: 0, skipped: 0 }
        );
    }

    #[test]
    fn non_empty_destination_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let c = collection(dir.path());
        seed_file(&c.file, 2, 0);
        let store = test_store();
        store.insert("items", &sample("already here")).unwrap();
        let backend = Backend::Relational(Arc::new(store));
        assert_eq!(
            migrate(&backend, &c).unwrap(),
            MigrationReport { imported: 0, skipped: 2 }
        );
    }

    #[test]
    fn source_file_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let c = collection(dir.path());
        seed_file(&c.file, 2, 1);
        let before = std::fs::read_to_string(&c.file).unwrap();
        let backend = Backend::Relational(Arc::new(test_store()));
        migrate(&backend, &c).unwrap();
        assert_eq!(std::fs::read_to_string(&c.file).unwrap(), before);
    }

    #[test]
    fn creates_destination_table_first() {
        let dir = tempfile::tempdir().unwrap();
        let c = CollectionConfig {
            table: "videos".to_string(),
            ..collection(dir.path())
        };
        seed_file(&c.file, 1, 0);
        let backend = Backend::Relational(Arc::new(test_store()));
        assert_eq!(migrate(&backend, &c).unwrap().imported, 1);
    }

    #[test]
    fn file_backend_is_a_precondition_failure() {
        let dir = tempfile::tempdir().unwrap();
        let c = collection(dir.path());
        seed_file(&c.file, 1, 0);
        let err = migrate(&Backend::File(JsonStore::new(0)), &c).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }
}
