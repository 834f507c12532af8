use log::error;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::Request;
use serde_json::{json, Value};

use crate::error::{ErrorKind, StoreError};

pub mod admin;
pub mod api;

pub type ApiResult = Result<Json<Value>, (Status, Json<Value>)>;

/// Map a store error to its HTTP status and `{"ok":false,...}` body.
pub fn fail(e: StoreError) -> (Status, Json<Value>) {
    let status = match e.kind() {
        ErrorKind::NotFound => Status::NotFound,
        ErrorKind::Validation => Status::UnprocessableEntity,
        ErrorKind::Precondition => Status::Conflict,
        ErrorKind::Config | ErrorKind::Connection | ErrorKind::Storage => {
            error!("request failed: {}", e);
            Status::InternalServerError
        }
    };
    (
        status,
        Json(json!({ "ok": false, "kind": e.kind(), "error": e.to_string() })),
    )
}

pub fn forbidden() -> (Status, Json<Value>) {
    (
        Status::Forbidden,
        Json(json!({ "ok": false, "error": "auth_required" })),
    )
}

#[catch(403)]
pub fn auth_required() -> Json<Value> {
    Json(json!({ "ok": false, "error": "auth_required" }))
}

#[catch(404)]
pub fn not_found() -> Json<Value> {
    Json(json!({ "ok": false, "error": "not_found" }))
}

#[catch(default)]
pub fn default_catcher(status: Status, _req: &Request) -> (Status, Json<Value>) {
    (status, Json(json!({ "ok": false, "error": status.reason_lossy() })))
}
