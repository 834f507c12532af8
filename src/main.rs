#[macro_use]
extern crate rocket;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use rocket::{Build, Rocket};

mod auth;
mod backend;
mod boot;
mod config;
mod db;
mod error;
mod migrate;
mod models;
mod registry;
mod routes;
mod store;

#[cfg(test)]
mod tests;

use config::{Config, DEFAULT_CONFIG_PATH};
use registry::Registry;

#[derive(Parser)]
#[command(name = "curio", version, about = "Admin-managed collection store")]
struct Cli {
    /// Path to the TOML configuration
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the JSON API (default)
    Serve,
    /// Copy a collection's JSON file into its database table, once
    Migrate { collection: String },
    /// Print the active backend and per-collection record counts
    Status,
}

/// Mount the collection API and the admin routes over a ready registry.
pub fn build_rocket(registry: Registry) -> Rocket<Build> {
    rocket::build()
        .manage(registry)
        .mount("/api", routes::api::routes())
        .mount("/admin", routes::admin::routes())
        .register(
            "/",
            catchers![
                routes::auth_required,
                routes::not_found,
                routes::default_catcher
            ],
        )
}

#[rocket::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    // Boot check: verify/create collection directories before probing backends
    boot::run(&config);

    let registry = Registry::new(config);
    match registry.backend() {
        Ok(backend) if backend.is_relational() => {
            info!("Collections served by the {} backend", backend.name())
        }
        Ok(_) => warn!("Collections served from JSON files; run `migrate` once a database is reachable"),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            if let Err(e) = build_rocket(registry).launch().await {
                error!("server stopped: {}", e);
                process::exit(1);
            }
        }
        Command::Migrate { collection } => match registry.migrate(&collection) {
            Ok(report) => println!(
                "{}: imported {}, skipped {}",
                collection, report.imported, report.skipped
            ),
            Err(e) => {
                error!("migration of {} failed: {}", collection, e);
                process::exit(1);
            }
        },
        Command::Status => match registry.status() {
            Ok(status) => {
                println!("backend: {}", status.backend);
                for c in status.collections {
                    println!("  {:<12} {:>6} record(s)  table={} file={}", c.name, c.records, c.table, c.file);
                }
            }
            Err(e) => {
                error!("{}", e);
                process::exit(1);
            }
        },
    }
}
