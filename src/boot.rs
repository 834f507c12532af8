use log::{error, info, warn};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use crate::config::{Config, DriverKind};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BootReport {
    pub warnings: u32,
    pub errors: u32,
}

/// Run all boot checks. Call this before the backend is selected.
/// Aborts the process if a collection directory is unusable.
pub fn run(config: &Config) {
    info!("Curio boot check starting...");
    let report = check(config);

    if report.errors > 0 {
        error!(
            "Boot check FAILED: {} error(s), {} warning(s). Aborting.",
            report.errors, report.warnings
        );
        process::exit(1);
    }

    if report.warnings > 0 {
        warn!(
            "Boot check passed with {} warning(s). Some features may not work correctly.",
            report.warnings
        );
    } else {
        info!("Boot check passed. All systems go.");
    }
}

pub fn check(config: &Config) -> BootReport {
    let mut report = BootReport::default();

    // ── 1. Collection directories ──────────────────────
    let mut dirs = BTreeSet::new();
    for c in config.collections.values() {
        dirs.insert(dir_of(&c.file));
    }
    for dir in &dirs {
        if !dir.exists() {
            match fs::create_dir_all(dir) {
                Ok(_) => info!("  Created directory: {}", dir.display()),
                Err(e) => {
                    error!("  FAILED to create directory {}: {}", dir.display(), e);
                    report.errors += 1;
                    continue;
                }
            }
        }
        if let Err(e) = write_test(dir) {
            error!("  Collection directory {} not writable: {}", dir.display(), e);
            report.errors += 1;
        }
    }

    // ── 2. Embedded database directory ─────────────────
    if config.driver_priority.contains(&DriverKind::Sqlite) {
        let db_dir = dir_of(&config.database.embedded_path);
        if let Err(e) = fs::create_dir_all(&db_dir).and_then(|_| write_test(&db_dir)) {
            warn!(
                "  Embedded database directory {} unusable: {} (sqlite tier will be skipped)",
                db_dir.display(),
                e
            );
            report.warnings += 1;
        }
    }

    // ── 3. Collection files parse ──────────────────────
    for (name, c) in &config.collections {
        if let Ok(raw) = fs::read_to_string(&c.file) {
            if serde_json::from_str::<Vec<serde_json::Value>>(&raw).is_err() {
                warn!(
                    "  {} ({}) is not a JSON array; it will read as empty",
                    c.file.display(),
                    name
                );
                report.warnings += 1;
            }
        }
    }

    // ── 4. Write API ───────────────────────────────────
    if config.admin_token.as_deref().map_or(true, str::is_empty) {
        warn!("  No admin_token configured, write and migration routes are disabled");
        report.warnings += 1;
    }

    report
}

fn dir_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn write_test(dir: &Path) -> std::io::Result<()> {
    let test_file = dir.join(".write_test");
    fs::write(&test_file, "test")?;
    let _ = fs::remove_file(&test_file);
    Ok(())
}
