#![cfg(test)]

use std::path::Path;

use rocket::http::{ContentType, Header, Status};
use rocket::local::blocking::Client;
use serde_json::{json, Value};

use crate::backend::select_backend;
use crate::config::Config;
use crate::error::ErrorKind;
use crate::migrate::MigrationReport;
use crate::models::record::RecordForm;
use crate::registry::Registry;
use crate::store::json::{list_backups, JsonStore};

/// Config rooted in a temp dir: embedded sqlite tier first, JSON files as fallback.
fn config_in(dir: &Path, priority: &str) -> Config {
    let raw = format!(
        r#"
        driver_priority = [{priority}]
        admin_token = "letmein"

        [database]
        port = 1
        embedded_path = "{root}/db/curio.db"

        [storage]
        backup_keep = 5

        [collections.items]
        file = "{root}/data/stuff.json"
        table = "items"
        public_read = true

        [collections.videos]
        file = "{root}/data/videos.json"
        table = "videos"
        public_read = true

        [collections.drafts]
        file = "{root}/data/drafts.json"
        table = "drafts"
        "#,
        priority = priority,
        root = dir.display()
    );
    Config::from_toml(&raw).expect("test config must parse")
}

fn form(title: &str) -> RecordForm {
    RecordForm {
        title: title.to_string(),
        description: format!("{} description", title),
        username: "@poyo".to_string(),
        url: format!("https://poyo.example/{}", title),
        source: Some("youtube".to_string()),
        image: format!("/uploads/{}.jpg", title),
        video_id: Some(format!("vid-{}", title)),
    }
}

// ═══════════════════════════════════════════════════════════
// Backend transparency
// ═══════════════════════════════════════════════════════════

#[test]
fn same_fields_from_both_backends() {
    let dir = tempfile::tempdir().unwrap();
    let file = Registry::new(config_in(dir.path(), r#""json""#));
    let sql = Registry::new(config_in(dir.path(), r#""sqlite", "json""#));
    assert_eq!(file.backend().unwrap().name(), "json");
    assert_eq!(sql.backend().unwrap().name(), "sqlite");

    let f = file.insert("videos", &form("clip")).unwrap();
    let s = sql.insert("videos", &form("clip")).unwrap();
    assert_eq!(f.to_form(), s.to_form());

    let fv = serde_json::to_value(file.get("videos", f.id).unwrap()).unwrap();
    let sv = serde_json::to_value(sql.get("videos", s.id).unwrap()).unwrap();
    let keys = |v: &Value| {
        let mut k: Vec<String> = v.as_object().unwrap().keys().cloned().collect();
        k.sort();
        k
    };
    assert_eq!(keys(&fv), keys(&sv));
    assert!(fv["id"].is_i64() && sv["id"].is_i64());
    assert!(fv["updated_at"].is_string() && sv["updated_at"].is_string());
}

// ═══════════════════════════════════════════════════════════
// Selector fallback
// ═══════════════════════════════════════════════════════════

#[test]
fn unreachable_server_falls_back_and_crud_still_works() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), r#""mysql", "mysql_socket", "json""#);
    let backend = select_backend(&config).unwrap();
    assert_eq!(backend.name(), "json");

    let reg = Registry::with_backend(config, backend);
    let a = reg.insert("items", &form("a")).unwrap();
    let b = reg.insert("items", &form("b")).unwrap();
    assert_eq!((a.id, b.id), (1, 2));
    let updated = reg.update("items", 2, &form("b2")).unwrap();
    assert_eq!(updated.title, "b2");
    reg.delete("items", 1).unwrap();
    let items = reg.list("items").unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, 1);
    assert_eq!(items[0].title, "b2");
}

// ═══════════════════════════════════════════════════════════
// File atomicity
// ═══════════════════════════════════════════════════════════

#[test]
fn every_write_leaves_a_valid_backup() {
    let dir = tempfile::tempdir().unwrap();
    let reg = Registry::new(config_in(dir.path(), r#""json""#));
    let path = dir.path().join("data/stuff.json");

    reg.insert("items", &form("one")).unwrap();
    let before = std::fs::read_to_string(&path).unwrap();
    reg.insert("items", &form("two")).unwrap();

    let backups = list_backups(&path);
    assert!(!backups.is_empty());
    let newest = std::fs::read_to_string(backups.last().unwrap()).unwrap();
    assert_eq!(newest, before);
    let parsed: Value = serde_json::from_str(&newest).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 1);
}

// ═══════════════════════════════════════════════════════════
// Migration
// ═══════════════════════════════════════════════════════════

#[test]
fn migrate_file_collection_into_embedded_db() {
    let dir = tempfile::tempdir().unwrap();

    // Records written while running on files, some incomplete
    let files = Registry::new(config_in(dir.path(), r#""json""#));
    for t in ["a", "b", "c", "d"] {
        files.insert("items", &form(t)).unwrap();
    }
    let path = dir.path().join("data/stuff.json");
    let mut raw: Vec<Value> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    raw.push(json!({ "title": "no image", "description": "d", "username": "u", "url": "https://x" }));
    raw.push(json!({ "title": "", "description": "d", "username": "u", "url": "https://x", "image": "i" }));
    JsonStore::new(0)
        .replace_all(&path, serde_json::from_value(Value::Array(raw)).unwrap())
        .unwrap();

    let sql = Registry::new(config_in(dir.path(), r#""sqlite""#));
    assert_eq!(
        sql.migrate("items").unwrap(),
        MigrationReport { imported: 4, skipped: 2 }
    );
    assert_eq!(
        sql.migrate("items").unwrap(),
        MigrationReport { imported: 0, skipped: 6 }
    );
    let titles: Vec<String> = sql.list("items").unwrap().into_iter().map(|r| r.title).collect();
    assert_eq!(titles, vec!["a", "b", "c", "d"]);
    assert_eq!(files.list("items").unwrap().len(), 6);
}

#[test]
fn migrate_unknown_collection_is_typed() {
    let dir = tempfile::tempdir().unwrap();
    let sql = Registry::new(config_in(dir.path(), r#""sqlite""#));
    assert_eq!(sql.migrate("statues").unwrap_err().kind(), ErrorKind::NotFound);
}

// ═══════════════════════════════════════════════════════════
// HTTP surface
// ═══════════════════════════════════════════════════════════

fn client(dir: &Path) -> Client {
    let registry = Registry::new(config_in(dir, r#""sqlite""#));
    Client::tracked(crate::build_rocket(registry)).expect("valid rocket instance")
}

fn token() -> Header<'static> {
    Header::new(crate::auth::ADMIN_TOKEN_HEADER, "letmein")
}

#[test]
fn api_public_list_and_admin_writes() {
    let dir = tempfile::tempdir().unwrap();
    let client = client(dir.path());

    let res = client.get("/api/items").dispatch();
    assert_eq!(res.status(), Status::Ok);
    assert_eq!(res.into_json::<Value>().unwrap(), json!({ "ok": true, "items": [] }));

    let res = client
        .post("/api/items")
        .header(ContentType::JSON)
        .body(json!({ "title": "x", "description": "d", "username": "u", "url": "https://x", "image": "i" }).to_string())
        .dispatch();
    assert_eq!(res.status(), Status::Forbidden);

    let res = client
        .post("/api/items")
        .header(ContentType::JSON)
        .header(token())
        .body(json!({ "title": "x", "description": "d", "username": "u", "url": "https://x", "image": "i", "videoId": "v" }).to_string())
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body = res.into_json::<Value>().unwrap();
    let id = body["item"]["id"].as_i64().unwrap();
    assert_eq!(body["item"]["videoId"], "v");

    let res = client
        .put(format!("/api/items/{}", id))
        .header(ContentType::JSON)
        .header(token())
        .body(json!({ "title": "y", "description": "d", "username": "u", "url": "https://x", "image": "i" }).to_string())
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    assert_eq!(res.into_json::<Value>().unwrap()["item"]["title"], "y");

    let res = client.delete(format!("/api/items/{}", id)).header(token()).dispatch();
    assert_eq!(res.status(), Status::Ok);
    let res = client.get(format!("/api/items/{}", id)).dispatch();
    assert_eq!(res.status(), Status::NotFound);
    assert_eq!(res.into_json::<Value>().unwrap()["kind"], "not_found");
}

#[test]
fn api_rejects_invalid_record_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let client = client(dir.path());
    let res = client
        .post("/api/videos")
        .header(ContentType::JSON)
        .header(token())
        .body(json!({ "title": "  ", "description": "d", "username": "u", "url": "https://x", "image": "i" }).to_string())
        .dispatch();
    assert_eq!(res.status(), Status::UnprocessableEntity);
    let body = res.into_json::<Value>().unwrap();
    assert_eq!(body["kind"], "validation");
    assert_eq!(body["error"], "title is required");

    let res = client.get("/api/videos").dispatch();
    assert_eq!(res.into_json::<Value>().unwrap()["items"], json!([]));
}

#[test]
fn api_private_collection_needs_token() {
    let dir = tempfile::tempdir().unwrap();
    let client = client(dir.path());
    assert_eq!(client.get("/api/drafts").dispatch().status(), Status::Forbidden);
    assert_eq!(client.get("/api/drafts").header(token()).dispatch().status(), Status::Ok);
    assert_eq!(client.get("/api/sculptures").dispatch().status(), Status::NotFound);
}

#[test]
fn admin_migrate_and_status() {
    let dir = tempfile::tempdir().unwrap();
    let files = Registry::new(config_in(dir.path(), r#""json""#));
    files.insert("videos", &form("v1")).unwrap();
    files.insert("videos", &form("v2")).unwrap();

    let client = client(dir.path());
    assert_eq!(client.post("/admin/migrate/videos").dispatch().status(), Status::Forbidden);

    let res = client.post("/admin/migrate/videos").header(token()).dispatch();
    assert_eq!(res.status(), Status::Ok);
    assert_eq!(
        res.into_json::<Value>().unwrap(),
        json!({ "ok": true, "imported": 2, "skipped": 0 })
    );

    let res = client.get("/admin/status").header(token()).dispatch();
    let body = res.into_json::<Value>().unwrap();
    assert_eq!(body["status"]["backend"], "sqlite");
    let videos = body["status"]["collections"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "videos")
        .unwrap()
        .clone();
    assert_eq!(videos["records"], 2);
}
