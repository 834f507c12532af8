use rocket::serde::json::Json;
use rocket::State;
use serde_json::json;

use crate::auth::AdminToken;
use crate::models::record::RecordForm;
use crate::registry::Registry;

use super::{fail, forbidden, ApiResult};

// ── Reads: open for public collections, token otherwise ───────────

#[get("/<collection>")]
pub fn list(registry: &State<Registry>, collection: &str, admin: Option<AdminToken>) -> ApiResult {
    let handle = registry.for_name(collection).map_err(fail)?;
    if !handle.is_public() && admin.is_none() {
        return Err(forbidden());
    }
    let items = handle.list().map_err(fail)?;
    Ok(Json(json!({ "ok": true, "items": items })))
}

#[get("/<collection>/<id>")]
pub fn show(
    registry: &State<Registry>,
    collection: &str,
    id: i64,
    admin: Option<AdminToken>,
) -> ApiResult {
    let handle = registry.for_name(collection).map_err(fail)?;
    if !handle.is_public() && admin.is_none() {
        return Err(forbidden());
    }
    let item = handle.get(id).map_err(fail)?;
    Ok(Json(json!({ "ok": true, "item": item })))
}

// ── Writes: admin token required ──────────────────────────────────

#[post("/<collection>", data = "<form>")]
pub fn create(
    _admin: AdminToken,
    registry: &State<Registry>,
    collection: &str,
    form: Json<RecordForm>,
) -> ApiResult {
    let item = registry.insert(collection, &form).map_err(fail)?;
    Ok(Json(json!({ "ok": true, "item": item })))
}

#[put("/<collection>/<id>", data = "<form>")]
pub fn update(
    _admin: AdminToken,
    registry: &State<Registry>,
    collection: &str,
    id: i64,
    form: Json<RecordForm>,
) -> ApiResult {
    let item = registry.update(collection, id, &form).map_err(fail)?;
    Ok(Json(json!({ "ok": true, "item": item })))
}

#[delete("/<collection>/<id>")]
pub fn delete(
    _admin: AdminToken,
    registry: &State<Registry>,
    collection: &str,
    id: i64,
) -> ApiResult {
    registry.delete(collection, id).map_err(fail)?;
    Ok(Json(json!({ "ok": true })))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![list, show, create, update, delete]
}
