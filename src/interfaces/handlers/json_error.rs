use actix_web::{http::StatusCode, HttpResponse};
use serde::Serialize;
use serde_json::{json, Value};

/// `{ "ok": false, "error": { "code", "message" } }`
pub fn error_body(code: &str, message: &str) -> Value {
    json!({
        "ok": false,
        "error": {
            "code": code,
            "message": message
        }
    })
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

pub fn json_ok<T: Serialize>(status: StatusCode, data: T) -> HttpResponse {
    HttpResponse::build(status).json(ApiResponse { ok: true, data })
}
