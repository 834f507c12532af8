use rocket::serde::json::Json;
use rocket::State;
use serde_json::json;

use crate::auth::AdminToken;
use crate::registry::Registry;

use super::{fail, ApiResult};

#[post("/migrate/<collection>")]
pub fn migrate(_admin: AdminToken, registry: &State<Registry>, collection: &str) -> ApiResult {
    let report = registry.migrate(collection).map_err(fail)?;
    Ok(Json(json!({
        "ok": true,
        "imported": report.imported,
        "skipped": report.skipped,
    })))
}

#[get("/status")]
pub fn status(_admin: AdminToken, registry: &State<Registry>) -> ApiResult {
    let status = registry.status().map_err(fail)?;
    Ok(Json(json!({ "ok": true, "status": status })))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![migrate, status]
}
