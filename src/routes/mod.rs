use actix_web::{get, web, HttpMessage, HttpRequest, HttpResponse};
use mime_guess::from_path;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::{
    config::Config,
    models::{admin::AdminAuthentication, role::AdminPermission},
};

pub mod admin;
pub mod dashboard;
pub mod event;
pub mod notification;
pub mod report;
pub mod staff;
pub mod team;

const CONFLICTS: [&str; 6] = [
    "REPORT_STATUS_CONFLICT",
    "INVALID_STATUS_TRANSITION",
    "TEAM_IS_BUSY",
    "STAFF_IS_IN_WORK",
    "STAFF_NOT_AVAILABLE",
    "TEAM_CATEGORY_MISMATCH",
];
const INVALID_REQUESTS: [&str; 9] = [
    "INVALID_ID",
    "INVALID_FILE",
    "DECLINE_REASON_REQUIRED",
    "MISSING_CREDENTIALS",
    "UNAUTHORIZED_EMAIL",
    "STAFF_NOT_SUPERVISOR",
    "STAFF_STATUS_NOT_ALLOWED",
    "REPORT_PHOTO_REQUIRED",
    "INVALID_ESTIMATED_DATE",
];

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    ReportPhoto,
    ProofPhoto,
}

#[derive(Deserialize)]
pub struct FileQueryParams {
    pub kind: FileKind,
    pub name: String,
}

impl FileKind {
    pub fn directory(&self, config: &Config) -> String {
        match self {
            FileKind::ReportPhoto => format!("{}/reports", config.files_dir),
            FileKind::ProofPhoto => format!("{}/proofs", config.files_dir),
        }
    }
}

/// Stored names are `<report>/<file>`; anything that could climb out is refused.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('/')
        && !name.contains('\\')
        && name.split('/').all(|part| !part.is_empty() && part != "." && part != "..")
}

pub fn error_response(error: String) -> HttpResponse {
    let mut response = match error.as_str() {
        "UNAUTHORIZED" | "INVALID_COMBINATION" | "INVALID_REFRESH_TOKEN" => {
            HttpResponse::Unauthorized()
        }
        "FORBIDDEN" => HttpResponse::Forbidden(),
        code if code.ends_with("_NOT_FOUND") => HttpResponse::NotFound(),
        code if CONFLICTS.contains(&code) || code.ends_with("_ALREADY_EXIST") => {
            HttpResponse::Conflict()
        }
        code if INVALID_REQUESTS.contains(&code) || code.contains("_MUST_") => {
            HttpResponse::BadRequest()
        }
        code => {
            tracing::error!(error = code, "request failed");
            HttpResponse::InternalServerError()
        }
    };
    response.body(error)
}

pub fn authorize(
    req: &HttpRequest,
    permit: &AdminPermission,
) -> Result<AdminAuthentication, HttpResponse> {
    let issuer = match req.extensions().get::<AdminAuthentication>() {
        Some(issuer) => issuer.clone(),
        None => return Err(HttpResponse::Unauthorized().body("UNAUTHORIZED")),
    };
    if !issuer.role.validate(permit) {
        return Err(HttpResponse::Forbidden().body("FORBIDDEN"));
    }
    Ok(issuer)
}

pub fn parse_id(raw: &str) -> Result<ObjectId, HttpResponse> {
    raw.parse::<ObjectId>()
        .map_err(|_| HttpResponse::BadRequest().body("INVALID_ID"))
}

#[get("/files")]
pub async fn get_file(query: web::Query<FileQueryParams>, config: web::Data<Config>) -> HttpResponse {
    if !is_safe_name(&query.name) {
        return HttpResponse::BadRequest().body("INVALID_FILE");
    }
    let path = format!("{}/{}", query.kind.directory(&config), query.name);

    if let Ok(file) = fs::read(&path) {
        let mime = from_path(&path).first_or_octet_stream();
        HttpResponse::Ok().content_type(mime).body(file)
    } else {
        HttpResponse::NotFound().body("CONTENT_NOT_FOUND")
    }
}
