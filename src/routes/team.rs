use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};

use super::{authorize, error_response, parse_id};
use crate::models::{
    role::AdminPermission,
    staff::Staff,
    team::{Team, TeamQuery, TeamRequest, TeamResponse, TeamSupervisorRequest},
};

async fn load_team(team_id: &str) -> Result<Team, HttpResponse> {
    let team_id = parse_id(team_id)?;
    match Team::find_by_id(&team_id).await {
        Ok(Some(team)) => Ok(team),
        Ok(None) => Err(HttpResponse::NotFound().body("TEAM_NOT_FOUND")),
        Err(error) => Err(error_response(error)),
    }
}

#[get("/teams")]
pub async fn get_teams(query: web::Query<TeamQuery>, req: HttpRequest) -> HttpResponse {
    if let Err(response) = authorize(&req, &AdminPermission::ManageTeams) {
        return response;
    }

    match Team::find_many(&query).await {
        Ok(teams) => HttpResponse::Ok().json(
            teams
                .iter()
                .filter_map(Team::to_response)
                .collect::<Vec<TeamResponse>>(),
        ),
        Err(error) => error_response(error),
    }
}
#[get("/teams/{team_id}")]
pub async fn get_team(team_id: web::Path<String>, req: HttpRequest) -> HttpResponse {
    if let Err(response) = authorize(&req, &AdminPermission::ManageTeams) {
        return response;
    }

    let mut team = match load_team(&team_id).await {
        Ok(team) => team,
        Err(response) => return response,
    };
    match Staff::find_all().await {
        Ok(staff) => team.count_members(&staff),
        Err(error) => return error_response(error),
    }

    match team.to_response() {
        Some(team) => HttpResponse::Ok().json(team),
        None => HttpResponse::NotFound().body("TEAM_NOT_FOUND"),
    }
}
#[post("/teams")]
pub async fn create_team(payload: web::Json<TeamRequest>, req: HttpRequest) -> HttpResponse {
    if let Err(response) = authorize(&req, &AdminPermission::ManageTeams) {
        return response;
    }
    let payload: TeamRequest = payload.into_inner();
    if payload.name.trim().is_empty() {
        return HttpResponse::BadRequest().body("TEAM_MUST_HAVE_NAME");
    }

    match Team::create(payload).await {
        Ok(team) => HttpResponse::Created().json(team),
        Err(error) => error_response(error),
    }
}
#[put("/teams/{team_id}/supervisor")]
pub async fn assign_team_supervisor(
    team_id: web::Path<String>,
    payload: web::Json<TeamSupervisorRequest>,
    req: HttpRequest,
) -> HttpResponse {
    if let Err(response) = authorize(&req, &AdminPermission::ManageTeams) {
        return response;
    }
    let staff_id = match parse_id(&payload.staff) {
        Ok(staff_id) => staff_id,
        Err(response) => return response,
    };

    let mut team = match load_team(&team_id).await {
        Ok(team) => team,
        Err(response) => return response,
    };
    let staff = match Staff::find_by_id(&staff_id).await {
        Ok(Some(staff)) => staff,
        Ok(None) => return HttpResponse::NotFound().body("STAFF_NOT_FOUND"),
        Err(error) => return error_response(error),
    };

    match team.assign_supervisor(&staff).await {
        Ok(_id) => HttpResponse::Ok().body(_id.to_hex()),
        Err(error) => error_response(error),
    }
}
#[delete("/teams/{team_id}")]
pub async fn delete_team(team_id: web::Path<String>, req: HttpRequest) -> HttpResponse {
    if let Err(response) = authorize(&req, &AdminPermission::ManageTeams) {
        return response;
    }

    let team = match load_team(&team_id).await {
        Ok(team) => team,
        Err(response) => return response,
    };

    match team.delete().await {
        Ok(count) => HttpResponse::Ok().body(format!("Deleted {count} team")),
        Err(error) => error_response(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::role::AdminRole, routes::tests::sign_in};
    use actix_web::{dev::Service, http::StatusCode, test, App};
    use serde_json::json;

    #[actix_web::test]
    async fn teams_require_sign_in() {
        let app = test::init_service(App::new().service(get_teams)).await;

        let req = test::TestRequest::get().uri("/teams").to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn team_requests_are_validated_before_lookup() {
        let app = test::init_service(
            App::new()
                .wrap_fn(|req, srv| {
                    sign_in(&req, AdminRole::Officer);
                    srv.call(req)
                })
                .service(create_team)
                .service(assign_team_supervisor)
                .service(delete_team),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/teams")
            .set_json(json!({ "name": " ", "category": "Pothole" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(test::read_body(res).await, "TEAM_MUST_HAVE_NAME");

        let req = test::TestRequest::put()
            .uri("/teams/65a1b2c3d4e5f60718293a4b/supervisor")
            .set_json(json!({ "staff": "S-1234" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(test::read_body(res).await, "INVALID_ID");

        let req = test::TestRequest::delete().uri("/teams/T-1234").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn unknown_categories_are_rejected() {
        let app = test::init_service(
            App::new()
                .wrap_fn(|req, srv| {
                    sign_in(&req, AdminRole::Owner);
                    srv.call(req)
                })
                .service(create_team),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/teams")
            .set_json(json!({ "name": "Alpha", "category": "Bridges" }))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
