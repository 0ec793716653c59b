use actix_web::{get, post, web, HttpMessage, HttpRequest, HttpResponse};
use mongodb::bson::DateTime;

use super::error_response;
use crate::models::{
    admin::{
        is_rda_email, Admin, AdminAuthentication, AdminCredential, AdminRefreshRequest,
        AdminRequest,
    },
    role::{AdminPermission, AdminRole},
};

async fn release_claim(bootstrapping: bool) {
    if !bootstrapping {
        return;
    }
    if let Err(error) = Admin::release_bootstrap().await {
        tracing::warn!(%error, "bootstrap claim left in place");
    }
}

#[post("/admins/login")]
pub async fn login(payload: web::Json<AdminCredential>) -> HttpResponse {
    let payload: AdminCredential = payload.into_inner();

    match payload.authenticate().await {
        Ok(tokens) => {
            tracing::info!(admin = %tokens.admin._id, "admin signed in");
            HttpResponse::Ok().json(tokens)
        }
        Err(error) => {
            tracing::warn!(%error, "admin sign in refused");
            error_response(error)
        }
    }
}
#[post("/admins/refresh")]
pub async fn refresh(payload: web::Json<AdminRefreshRequest>) -> HttpResponse {
    let payload: AdminRefreshRequest = payload.into_inner();

    match AdminCredential::refresh(&payload.rtk).await {
        Ok(tokens) => HttpResponse::Ok().json(tokens),
        Err(error) => error_response(error),
    }
}
#[post("/admins")]
pub async fn create_admin(payload: web::Json<AdminRequest>, req: HttpRequest) -> HttpResponse {
    let payload: AdminRequest = payload.into_inner();

    if payload.password.len() < 8 {
        return HttpResponse::BadRequest().body("ADMIN_MUST_HAVE_VALID_PASSWORD");
    }
    if !is_rda_email(&payload.email) {
        return HttpResponse::BadRequest().body("ADMIN_MUST_HAVE_VALID_EMAIL");
    }
    if payload.name.trim().is_empty() {
        return HttpResponse::BadRequest().body("ADMIN_MUST_HAVE_NAME");
    }

    let issuer_role = req
        .extensions()
        .get::<AdminAuthentication>()
        .map(|issuer| issuer.role);

    let role = match issuer_role {
        Some(issuer_role) => {
            if !issuer_role.validate(&AdminPermission::ManageAdmins) {
                return HttpResponse::Forbidden().body("FORBIDDEN");
            }
            payload.role.unwrap_or(AdminRole::Officer)
        }
        None => match Admin::count().await {
            Ok(0) => match Admin::claim_bootstrap().await {
                Ok(()) => AdminRole::Owner,
                Err(error) if error == "BOOTSTRAP_ALREADY_EXIST" => {
                    return HttpResponse::Unauthorized().body("UNAUTHORIZED")
                }
                Err(error) => return error_response(error),
            },
            Ok(_) => return HttpResponse::Unauthorized().body("UNAUTHORIZED"),
            Err(error) => return error_response(error),
        },
    };
    let bootstrapping = issuer_role.is_none();

    match Admin::find_by_email(&payload.email).await {
        Ok(Some(_)) => {
            release_claim(bootstrapping).await;
            return HttpResponse::Conflict().body("ADMIN_ALREADY_EXIST");
        }
        Ok(None) => (),
        Err(error) => {
            release_claim(bootstrapping).await;
            return error_response(error);
        }
    }

    let mut admin: Admin = Admin {
        _id: None,
        name: payload.name.trim().to_string(),
        email: payload.email.trim().to_lowercase(),
        password: payload.password,
        role,
        seen_at: None,
        cleared_at: None,
        created_at: DateTime::now(),
    };

    match admin.save().await {
        Ok(_id) => {
            tracing::info!(admin = %_id, ?role, "admin created");
            HttpResponse::Created().body(_id.to_hex())
        }
        Err(error) => {
            release_claim(bootstrapping).await;
            error_response(error)
        }
    }
}
#[get("/admins/me")]
pub async fn get_me(req: HttpRequest) -> HttpResponse {
    let issuer_id = match req.extensions().get::<AdminAuthentication>() {
        Some(issuer) => issuer._id,
        None => return HttpResponse::Unauthorized().body("UNAUTHORIZED"),
    };

    match Admin::find_by_id(&issuer_id).await {
        Ok(Some(admin)) => match admin.to_response() {
            Ok(admin) => HttpResponse::Ok().json(admin),
            Err(error) => error_response(error),
        },
        Ok(None) => HttpResponse::NotFound().body("ADMIN_NOT_FOUND"),
        Err(error) => error_response(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::tests::sign_in;
    use actix_web::{dev::Service, http::StatusCode, test, App};
    use serde_json::json;

    #[actix_web::test]
    async fn login_rejects_non_rda_address_before_lookup() {
        let app = test::init_service(App::new().service(login)).await;

        let req = test::TestRequest::post()
            .uri("/admins/login")
            .set_json(json!({ "email": "someone@gmail.com", "password": "secret123" }))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(test::read_body(res).await, "UNAUTHORIZED_EMAIL");
    }

    #[actix_web::test]
    async fn officers_cannot_create_admins() {
        let app = test::init_service(
            App::new()
                .wrap_fn(|req, srv| {
                    sign_in(&req, AdminRole::Officer);
                    srv.call(req)
                })
                .service(create_admin),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/admins")
            .set_json(json!({
                "name": "New Officer",
                "email": "new.officer@rda.gov.lk",
                "password": "longenough",
            }))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn short_passwords_are_rejected() {
        let app = test::init_service(App::new().service(create_admin)).await;

        let req = test::TestRequest::post()
            .uri("/admins")
            .set_json(json!({
                "name": "Owner",
                "email": "owner@rda.gov.lk",
                "password": "short",
            }))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(test::read_body(res).await, "ADMIN_MUST_HAVE_VALID_PASSWORD");
    }

    #[actix_web::test]
    async fn me_requires_sign_in() {
        let app = test::init_service(App::new().service(get_me)).await;

        let req = test::TestRequest::get().uri("/admins/me").to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
