use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};

use super::{authorize, error_response, parse_id};
use crate::models::{
    role::AdminPermission,
    staff::{
        Staff, StaffConfirmQuery, StaffQuery, StaffRequest, StaffStatusRequest,
        StaffUpdateRequest,
    },
};

async fn load_staff(staff_id: &str) -> Result<Staff, HttpResponse> {
    let staff_id = parse_id(staff_id)?;
    match Staff::find_by_id(&staff_id).await {
        Ok(Some(staff)) => Ok(staff),
        Ok(None) => Err(HttpResponse::NotFound().body("STAFF_NOT_FOUND")),
        Err(error) => Err(error_response(error)),
    }
}

/// An unconfirmed change to an In-Work member answers with what they are busy with.
async fn guarded_error_response(staff: &Staff, error: String) -> HttpResponse {
    if error != "STAFF_IS_IN_WORK" {
        return error_response(error);
    }
    match staff.work_context().await {
        Ok(context) => HttpResponse::Conflict().json(context),
        Err(_) => error_response(error),
    }
}

#[get("/staff")]
pub async fn get_staff_list(query: web::Query<StaffQuery>, req: HttpRequest) -> HttpResponse {
    if let Err(response) = authorize(&req, &AdminPermission::ManageStaff) {
        return response;
    }

    match Staff::find_many(&query).await {
        Ok(staff) => HttpResponse::Ok().json(staff),
        Err(error) => error_response(error),
    }
}
#[get("/staff/{staff_id}")]
pub async fn get_staff(staff_id: web::Path<String>, req: HttpRequest) -> HttpResponse {
    if let Err(response) = authorize(&req, &AdminPermission::ManageStaff) {
        return response;
    }

    match load_staff(&staff_id).await {
        Ok(staff) => match staff.to_response() {
            Some(staff) => HttpResponse::Ok().json(staff),
            None => HttpResponse::NotFound().body("STAFF_NOT_FOUND"),
        },
        Err(response) => response,
    }
}
#[post("/staff")]
pub async fn register_staff(payload: web::Json<StaffRequest>, req: HttpRequest) -> HttpResponse {
    if let Err(response) = authorize(&req, &AdminPermission::ManageStaff) {
        return response;
    }

    match Staff::register(payload.into_inner()).await {
        Ok(staff) => HttpResponse::Created().json(staff),
        Err(error) => error_response(error),
    }
}
#[put("/staff/{staff_id}")]
pub async fn update_staff(
    staff_id: web::Path<String>,
    query: web::Query<StaffConfirmQuery>,
    payload: web::Json<StaffUpdateRequest>,
    req: HttpRequest,
) -> HttpResponse {
    if let Err(response) = authorize(&req, &AdminPermission::ManageStaff) {
        return response;
    }

    let mut staff = match load_staff(&staff_id).await {
        Ok(staff) => staff,
        Err(response) => return response,
    };

    let confirmed = query.confirm.unwrap_or(false);
    match staff.update_profile(payload.into_inner(), confirmed).await {
        Ok(_id) => HttpResponse::Ok().body(_id.to_hex()),
        Err(error) => guarded_error_response(&staff, error).await,
    }
}
#[put("/staff/{staff_id}/status")]
pub async fn update_staff_status(
    staff_id: web::Path<String>,
    query: web::Query<StaffConfirmQuery>,
    payload: web::Json<StaffStatusRequest>,
    req: HttpRequest,
) -> HttpResponse {
    if let Err(response) = authorize(&req, &AdminPermission::ManageStaff) {
        return response;
    }

    let mut staff = match load_staff(&staff_id).await {
        Ok(staff) => staff,
        Err(response) => return response,
    };

    let confirmed = query.confirm.unwrap_or(false);
    match staff.update_status(payload.status, confirmed).await {
        Ok(_id) => HttpResponse::Ok().body(_id.to_hex()),
        Err(error) => guarded_error_response(&staff, error).await,
    }
}
#[delete("/staff/{staff_id}")]
pub async fn delete_staff(
    staff_id: web::Path<String>,
    query: web::Query<StaffConfirmQuery>,
    req: HttpRequest,
) -> HttpResponse {
    if let Err(response) = authorize(&req, &AdminPermission::ManageStaff) {
        return response;
    }

    let staff = match load_staff(&staff_id).await {
        Ok(staff) => staff,
        Err(response) => return response,
    };

    match staff.delete(query.confirm.unwrap_or(false)).await {
        Ok(count) => HttpResponse::Ok().body(format!("Deleted {count} staff")),
        Err(error) => guarded_error_response(&staff, error).await,
    }
}
