use actix_web::{get, put, web, HttpRequest, HttpResponse};
use mongodb::bson::DateTime;

use super::{authorize, error_response, parse_id};
use crate::models::{
    admin::Admin,
    notification::{Notification, NotificationFeed},
    role::AdminPermission,
};

#[get("/notifications")]
pub async fn get_notifications(req: HttpRequest) -> HttpResponse {
    let issuer = match authorize(&req, &AdminPermission::ViewDashboard) {
        Ok(issuer) => issuer,
        Err(response) => return response,
    };

    let admin = match Admin::find_by_id(&issuer._id).await {
        Ok(Some(admin)) => admin,
        Ok(None) => return HttpResponse::NotFound().body("ADMIN_NOT_FOUND"),
        Err(error) => return error_response(error),
    };

    match NotificationFeed::load(&admin).await {
        Ok(feed) => HttpResponse::Ok().json(feed),
        Err(error) => error_response(error),
    }
}
#[put("/notifications/seen")]
pub async fn mark_notifications_seen(req: HttpRequest) -> HttpResponse {
    let issuer = match authorize(&req, &AdminPermission::ViewDashboard) {
        Ok(issuer) => issuer,
        Err(response) => return response,
    };

    match Admin::update_seen_at(&issuer._id, DateTime::now()).await {
        Ok(_id) => HttpResponse::Ok().body(_id.to_hex()),
        Err(error) => error_response(error),
    }
}
#[put("/notifications/clear")]
pub async fn clear_notifications(req: HttpRequest) -> HttpResponse {
    let issuer = match authorize(&req, &AdminPermission::ViewDashboard) {
        Ok(issuer) => issuer,
        Err(response) => return response,
    };

    match Admin::update_cleared_at(&issuer._id, DateTime::now()).await {
        Ok(_id) => HttpResponse::Ok().body(_id.to_hex()),
        Err(error) => error_response(error),
    }
}
#[put("/notifications/{notification_id}/read")]
pub async fn mark_notification_read(
    notification_id: web::Path<String>,
    req: HttpRequest,
) -> HttpResponse {
    if let Err(response) = authorize(&req, &AdminPermission::ViewDashboard) {
        return response;
    }
    let notification_id = match parse_id(&notification_id) {
        Ok(notification_id) => notification_id,
        Err(response) => return response,
    };

    match Notification::mark_read(&notification_id).await {
        Ok(_id) => HttpResponse::Ok().body(_id.to_hex()),
        Err(error) => error_response(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::role::AdminRole, routes::tests::sign_in};
    use actix_web::{dev::Service, http::StatusCode, test, App};

    #[actix_web::test]
    async fn feed_requires_sign_in() {
        let app = test::init_service(
            App::new()
                .service(get_notifications)
                .service(clear_notifications),
        )
        .await;

        let req = test::TestRequest::get().uri("/notifications").to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );

        let req = test::TestRequest::put()
            .uri("/notifications/clear")
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[actix_web::test]
    async fn marker_routes_win_over_notification_ids() {
        let app = test::init_service(
            App::new()
                .wrap_fn(|req, srv| {
                    sign_in(&req, AdminRole::Officer);
                    srv.call(req)
                })
                .service(mark_notifications_seen)
                .service(mark_notification_read),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/notifications/seen/read")
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(test::read_body(res).await, "INVALID_ID");
    }
}
