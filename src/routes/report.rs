use std::{
    fs::{create_dir_all, remove_file, rename},
    path::Path,
};

use actix_multipart::form::{tempfile::TempFile, MultipartForm};
use actix_web::{get, post, put, web, HttpRequest, HttpResponse};
use mime_guess::{get_mime_extensions, mime};
use mongodb::bson::{oid::ObjectId, DateTime};
use serde::Deserialize;

use super::{authorize, error_response, parse_id, FileKind};
use crate::{
    config::Config,
    models::{
        report::{
            Report, ReportAssignRequest, ReportDeclineRequest, ReportListResponse,
            ReportPhotoMultipartRequest, ReportQuery, ReportRequest, ReportStatusRequest,
        },
        role::AdminPermission,
        team::Team,
    },
};

#[derive(Debug, Default, Deserialize)]
pub struct ReportPhotoQueryParams {
    pub kind: Option<FileKind>,
}

async fn load_report(report_id: &str) -> Result<Report, HttpResponse> {
    let report_id = parse_id(report_id)?;
    match Report::find_by_id(&report_id).await {
        Ok(Some(report)) => Ok(report),
        Ok(None) => Err(HttpResponse::NotFound().body("REPORT_NOT_FOUND")),
        Err(error) => Err(error_response(error)),
    }
}

fn photo_extension(content_type: Option<&mime::Mime>) -> Option<&'static str> {
    let content_type = content_type?;
    if content_type.type_() != mime::IMAGE {
        return None;
    }
    get_mime_extensions(content_type)?.first().copied()
}

/// Every file must be an image before any of them is stored.
fn photo_extensions(files: &[TempFile], kind: FileKind) -> Option<Vec<&'static str>> {
    let limit = match kind {
        FileKind::ReportPhoto => files.len(),
        FileKind::ProofPhoto => 1,
    };
    files
        .iter()
        .take(limit)
        .map(|file| photo_extension(file.content_type.as_ref()))
        .collect()
}

/// Moves uploads into `save_dir` under fresh names. Stops at the first failure
/// and removes whatever was already moved.
fn store_photos(save_dir: &str, sources: &[(&Path, &str)]) -> Result<Vec<String>, String> {
    let mut stored: Vec<String> = Vec::with_capacity(sources.len());
    for (source, ext) in sources {
        let file_name = format!("{}.{}", ObjectId::new().to_hex(), ext);
        if rename(source, format!("{save_dir}/{file_name}")).is_err() {
            discard_photos(save_dir, &stored);
            return Err("REPORT_PHOTO_RENAME_FAILED".to_string());
        }
        stored.push(file_name);
    }
    Ok(stored)
}

fn discard_photos(save_dir: &str, file_names: &[String]) {
    for file_name in file_names {
        if let Err(error) = remove_file(format!("{save_dir}/{file_name}")) {
            tracing::warn!(%error, file_name, "could not remove stored photo");
        }
    }
}

#[get("/reports")]
pub async fn get_reports(query: web::Query<ReportQuery>, req: HttpRequest) -> HttpResponse {
    if let Err(response) = authorize(&req, &AdminPermission::ReviewReports) {
        return response;
    }

    match Report::find_all().await {
        Ok(reports) => HttpResponse::Ok().json(ReportListResponse::build(
            reports,
            &query,
            DateTime::now().timestamp_millis(),
        )),
        Err(error) => error_response(error),
    }
}
#[get("/reports/{report_id}")]
pub async fn get_report(report_id: web::Path<String>, req: HttpRequest) -> HttpResponse {
    if let Err(response) = authorize(&req, &AdminPermission::ReviewReports) {
        return response;
    }
    let report_id = match parse_id(&report_id) {
        Ok(report_id) => report_id,
        Err(response) => return response,
    };

    match Report::find_detail_by_id(&report_id).await {
        Ok(Some(report)) => HttpResponse::Ok().json(report),
        Ok(None) => HttpResponse::NotFound().body("REPORT_NOT_FOUND"),
        Err(error) => error_response(error),
    }
}
#[post("/reports")]
pub async fn create_report(payload: web::Json<ReportRequest>) -> HttpResponse {
    match Report::submit(payload.into_inner()).await {
        Ok(_id) => HttpResponse::Created().body(_id.to_hex()),
        Err(error) => error_response(error),
    }
}
#[put("/reports/{report_id}/approve")]
pub async fn approve_report(report_id: web::Path<String>, req: HttpRequest) -> HttpResponse {
    if let Err(response) = authorize(&req, &AdminPermission::ReviewReports) {
        return response;
    }
    let mut report = match load_report(&report_id).await {
        Ok(report) => report,
        Err(response) => return response,
    };

    match report.approve().await {
        Ok(_id) => HttpResponse::Ok().body(_id.to_hex()),
        Err(error) => error_response(error),
    }
}
#[put("/reports/{report_id}/decline")]
pub async fn decline_report(
    report_id: web::Path<String>,
    payload: web::Json<ReportDeclineRequest>,
    req: HttpRequest,
) -> HttpResponse {
    if let Err(response) = authorize(&req, &AdminPermission::ReviewReports) {
        return response;
    }
    if payload.reason.trim().is_empty() {
        return HttpResponse::BadRequest().body("DECLINE_REASON_REQUIRED");
    }
    let mut report = match load_report(&report_id).await {
        Ok(report) => report,
        Err(response) => return response,
    };

    match report.decline(&payload.reason).await {
        Ok(_id) => HttpResponse::Ok().body(_id.to_hex()),
        Err(error) => error_response(error),
    }
}
#[put("/reports/{report_id}/assign")]
pub async fn assign_report(
    report_id: web::Path<String>,
    payload: web::Json<ReportAssignRequest>,
    req: HttpRequest,
) -> HttpResponse {
    if let Err(response) = authorize(&req, &AdminPermission::ReviewReports) {
        return response;
    }
    let payload: ReportAssignRequest = payload.into_inner();
    let team_id = match parse_id(&payload.team) {
        Ok(team_id) => team_id,
        Err(response) => return response,
    };
    let estimated_date = match payload.estimated_date {
        Some(millis) if millis <= 0 => {
            return HttpResponse::BadRequest().body("INVALID_ESTIMATED_DATE")
        }
        Some(millis) => Some(DateTime::from_millis(millis)),
        None => None,
    };

    let mut report = match load_report(&report_id).await {
        Ok(report) => report,
        Err(response) => return response,
    };
    let team = match Team::find_by_id(&team_id).await {
        Ok(Some(team)) => team,
        Ok(None) => return HttpResponse::NotFound().body("TEAM_NOT_FOUND"),
        Err(error) => return error_response(error),
    };

    match report.assign_team(&team, estimated_date).await {
        Ok(_id) => HttpResponse::Ok().body(_id.to_hex()),
        Err(error) => error_response(error),
    }
}
#[put("/reports/{report_id}/status")]
pub async fn update_report_status(
    report_id: web::Path<String>,
    payload: web::Json<ReportStatusRequest>,
    req: HttpRequest,
) -> HttpResponse {
    if let Err(response) = authorize(&req, &AdminPermission::UpdateReports) {
        return response;
    }
    let payload: ReportStatusRequest = payload.into_inner();
    let mut report = match load_report(&report_id).await {
        Ok(report) => report,
        Err(response) => return response,
    };

    match report.update_status(payload.status, payload.message).await {
        Ok(_id) => HttpResponse::Ok().body(_id.to_hex()),
        Err(error) => error_response(error),
    }
}
#[put("/reports/{report_id}/photos")]
pub async fn upload_report_photos(
    report_id: web::Path<String>,
    query: web::Query<ReportPhotoQueryParams>,
    form: MultipartForm<ReportPhotoMultipartRequest>,
    config: web::Data<Config>,
    req: HttpRequest,
) -> HttpResponse {
    if let Err(response) = authorize(&req, &AdminPermission::UpdateReports) {
        return response;
    }
    let kind = query.kind.unwrap_or(FileKind::ReportPhoto);
    let form = form.into_inner();
    if form.files.is_empty() {
        return HttpResponse::BadRequest().body("REPORT_PHOTO_REQUIRED");
    }

    let extensions = match photo_extensions(&form.files, kind) {
        Some(extensions) => extensions,
        None => return HttpResponse::BadRequest().body("INVALID_FILE"),
    };

    let mut report = match load_report(&report_id).await {
        Ok(report) => report,
        Err(response) => return response,
    };
    let report_dir = report_id.into_inner();
    let save_dir = format!("{}/{}", kind.directory(&config), report_dir);

    if create_dir_all(&save_dir).is_err() {
        return HttpResponse::InternalServerError().body("DIRECTORY_CREATION_FAILED");
    }

    let sources: Vec<(&Path, &str)> = form
        .files
        .iter()
        .zip(extensions)
        .map(|(file, ext)| (file.file.path(), ext))
        .collect();
    let stored = match store_photos(&save_dir, &sources) {
        Ok(stored) => stored,
        Err(error) => return error_response(error),
    };
    let names: Vec<String> = stored
        .iter()
        .map(|file_name| format!("{report_dir}/{file_name}"))
        .collect();

    let result = match kind {
        FileKind::ReportPhoto => report.add_photos(names).await,
        FileKind::ProofPhoto => match names.into_iter().next() {
            Some(name) => report.set_proof_photo(name).await,
            None => Err("REPORT_PHOTO_REQUIRED".to_string()),
        },
    };
    match result {
        Ok(_id) => HttpResponse::Ok().body(_id.to_hex()),
        Err(error) => {
            discard_photos(&save_dir, &stored);
            error_response(error)
        }
    }
}
