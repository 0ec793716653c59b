use actix_web::{get, HttpRequest, HttpResponse};

use super::{authorize, error_response};
use crate::models::{dashboard::DashboardStats, role::AdminPermission};

#[get("/dashboard")]
pub async fn get_dashboard(req: HttpRequest) -> HttpResponse {
    if let Err(response) = authorize(&req, &AdminPermission::ViewDashboard) {
        return response;
    }

    match DashboardStats::load().await {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(error) => error_response(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn dashboard_requires_sign_in() {
        let app = test::init_service(App::new().service(get_dashboard)).await;

        let req = test::TestRequest::get().uri("/dashboard").to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
