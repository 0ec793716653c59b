use actix_web::{
    get,
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    web, Error, HttpRequest, HttpResponse,
};
use futures::stream::{self, StreamExt};
use tokio::sync::broadcast::error::RecvError;

use super::authorize;
use crate::{events, models::role::AdminPermission};

const OPENING: &str = ": connected\n\n";

/// Live change feed. Each write to reports, teams, staff or notifications
/// arrives as a `change` event so the dashboard can refetch.
#[get("/events")]
pub async fn get_events(req: HttpRequest) -> HttpResponse {
    let issuer = match authorize(&req, &AdminPermission::ViewDashboard) {
        Ok(issuer) => issuer,
        Err(response) => return response,
    };
    tracing::debug!(admin = %issuer._id, "event stream opened");

    let changes = stream::unfold(events::subscribe(), |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => return Some((web::Bytes::from(event.to_sse()), receiver)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event stream fell behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });
    let body = stream::once(async { web::Bytes::from_static(OPENING.as_bytes()) })
        .chain(changes)
        .map(Ok::<_, Error>);

    HttpResponse::Ok()
        .insert_header((CONTENT_TYPE, "text/event-stream"))
        .insert_header((CACHE_CONTROL, "no-cache"))
        .streaming(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::role::AdminRole, routes::tests::sign_in};
    use actix_web::{dev::Service, http::StatusCode, test, App};

    #[actix_web::test]
    async fn stream_requires_sign_in() {
        let app = test::init_service(App::new().service(get_events)).await;

        let req = test::TestRequest::get().uri("/events").to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn stream_opens_as_server_sent_events() {
        let app = test::init_service(
            App::new()
                .wrap_fn(|req, srv| {
                    sign_in(&req, AdminRole::Officer);
                    srv.call(req)
                })
                .service(get_events),
        )
        .await;

        let req = test::TestRequest::get().uri("/events").to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers().get(CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
        assert_eq!(res.headers().get(CACHE_CONTROL).unwrap(), "no-cache");
    }
}
