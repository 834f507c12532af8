use log::info;
use mysql::prelude::Queryable;
use mysql::{Opts, OptsBuilder, Pool};

use crate::config::{is_sql_identifier, DatabaseConfig};
use crate::error::{StoreError, StoreResult};
use crate::models::record::{Record, RecordForm};

use super::SqlStore;

/// Server error 1049: unknown database.
const ER_BAD_DB_ERROR: u16 = 1049;

const SELECT_COLUMNS: &str = "SELECT id, title, description, username, url, source, image, video_id, \
     DATE_FORMAT(updated_at, '%Y-%m-%d %H:%i:%s') AS updated_at";

type RecordRow = (
    i64,
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
);

/// How the driver reaches the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Socket,
}

/// MySQL-backed implementation of the SqlStore trait.
pub struct MysqlStore {
    pool: Pool,
}

impl MysqlStore {
    /// Connect to the configured database. If the server reports the database as unknown,
    /// create it on a database-less connection and retry once.
    pub fn connect(cfg: &DatabaseConfig, transport: Transport) -> StoreResult<Self> {
        if !is_sql_identifier(&cfg.name) {
            return Err(StoreError::Config(format!(
                "'{}' is not a valid database name",
                cfg.name
            )));
        }
        let base = base_opts(cfg, transport)?;
        let pool = match Pool::new(Opts::from(base.clone().db_name(Some(cfg.name.as_str())))) {
            Ok(pool) => pool,
            Err(mysql::Error::MySqlError(ref e)) if e.code == ER_BAD_DB_ERROR => {
                info!("database '{}' does not exist, creating it", cfg.name);
                let bootstrap = Pool::new(Opts::from(base.clone().db_name(None::<String>)))?;
                bootstrap.get_conn()?.query_drop(format!(
                    "CREATE DATABASE IF NOT EXISTS `{}` CHARACTER SET utf8mb4",
                    cfg.name
                ))?;
                Pool::new(Opts::from(base.db_name(Some(cfg.name.as_str()))))?
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { pool })
    }
}

fn base_opts(cfg: &DatabaseConfig, transport: Transport) -> StoreResult<OptsBuilder> {
    let builder = OptsBuilder::new()
        .user(Some(cfg.user.as_str()))
        .pass(Some(cfg.password.as_str()));
    match transport {
        Transport::Tcp => Ok(builder
            .ip_or_hostname(Some(cfg.host.as_str()))
            .tcp_port(cfg.port)
            .prefer_socket(false)),
        Transport::Socket => {
            let socket = cfg.socket.as_ref().ok_or_else(|| {
                StoreError::Connection("no database.socket configured".to_string())
            })?;
            Ok(builder.socket(Some(socket.to_string_lossy().into_owned())))
        }
    }
}

fn quote(table: &str) -> String {
    format!("`{}`", table)
}

fn to_record(row: RecordRow) -> Record {
    let (id, title, description, username, url, source, image, video_id, updated_at) = row;
    Record {
        id,
        title,
        description,
        username,
        url,
        source,
        image,
        video_id,
        updated_at,
    }
}

impl SqlStore for MysqlStore {
    fn engine(&self) -> &'static str {
        "mysql"
    }

    fn ensure_schema(&self, table: &str) -> StoreResult<()> {
        let mut conn = self.pool.get_conn()?;
        conn.query_drop(format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                username VARCHAR(100) NOT NULL,
                url TEXT NOT NULL,
                source TEXT NULL,
                image TEXT NOT NULL,
                video_id VARCHAR(64) NULL,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
            quote(table)
        ))?;
        Ok(())
    }

    fn list(&self, table: &str) -> StoreResult<Vec<Record>> {
        let mut conn = self.pool.get_conn()?;
        Ok(conn.query_map(
            format!("{} FROM {} ORDER BY id ASC", SELECT_COLUMNS, quote(table)),
            to_record,
        )?)
    }

    fn get(&self, table: &str, id: i64) -> StoreResult<Option<Record>> {
        let mut conn = self.pool.get_conn()?;
        let row: Option<RecordRow> = conn.exec_first(
            format!("{} FROM {} WHERE id = ?", SELECT_COLUMNS, quote(table)),
            (id,),
        )?;
        Ok(row.map(to_record))
    }

    fn insert(&self, table: &str, form: &RecordForm) -> StoreResult<i64> {
        let mut conn = self.pool.get_conn()?;
        conn.exec_drop(
            format!(
                "INSERT INTO {} (title, description, username, url, source, image, video_id)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                quote(table)
            ),
            (
                &form.title,
                &form.description,
                &form.username,
                &form.url,
                &form.source,
                &form.image,
                &form.video_id,
            ),
        )?;
        Ok(conn.last_insert_id() as i64)
    }

    fn update(&self, table: &str, id: i64, form: &RecordForm) -> StoreResult<bool> {
        let mut conn = self.pool.get_conn()?;
        conn.exec_drop(
            format!(
                "UPDATE {} SET title=?, description=?, username=?, url=?, source=?, image=?,
                 video_id=? WHERE id=?",
                quote(table)
            ),
            (
                &form.title,
                &form.description,
                &form.username,
                &form.url,
                &form.source,
                &form.image,
                &form.video_id,
                id,
            ),
        )?;
        // Counts changed rows: an identical rewrite also reports false.
        Ok(conn.affected_rows() > 0)
    }

    fn delete(&self, table: &str, id: i64) -> StoreResult<bool> {
        let mut conn = self.pool.get_conn()?;
        conn.exec_drop(format!("DELETE FROM {} WHERE id = ?", quote(table)), (id,))?;
        Ok(conn.affected_rows() > 0)
    }

    fn count(&self, table: &str) -> StoreResult<i64> {
        let mut conn = self.pool.get_conn()?;
        let n: Option<i64> = conn.query_first(format!("SELECT COUNT(*) FROM {}", quote(table)))?;
        Ok(n.unwrap_or(0))
    }
}
