use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::io;
use tracing_subscriber::EnvFilter;

use models::admin::AdminAuthenticationMiddlewareFactory;

mod config;
mod database;
mod events;
mod models;
mod routes;

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config::Config::from_env();

    database::connect(&config.db_uri, &config.db_name)
        .await
        .map_err(io::Error::other)?;
    models::admin::load_keys(&config).map_err(io::Error::other)?;

    tracing::info!(host = %config.host, port = config.port, "starting admin server");

    let bind = (config.host.clone(), config.port);
    let data = web::Data::new(config);

    HttpServer::new(move || {
        let cors = match &data.cors_origin {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allow_any_method()
                .allow_any_header(),
            None => Cors::permissive(),
        };

        App::new()
            .app_data(data.clone())
            .wrap(AdminAuthenticationMiddlewareFactory)
            .wrap(cors)
            .wrap(Logger::default())
            .service(routes::get_file)
            .service(routes::admin::login)
            .service(routes::admin::refresh)
            .service(routes::admin::create_admin)
            .service(routes::admin::get_me)
            .service(routes::dashboard::get_dashboard)
            .service(routes::event::get_events)
            .service(routes::notification::get_notifications)
            .service(routes::notification::mark_notifications_seen)
            .service(routes::notification::clear_notifications)
            .service(routes::notification::mark_notification_read)
            .service(routes::report::get_reports)
            .service(routes::report::get_report)
            .service(routes::report::create_report)
            .service(routes::report::approve_report)
            .service(routes::report::decline_report)
            .service(routes::report::assign_report)
            .service(routes::report::update_report_status)
            .service(routes::report::upload_report_photos)
            .service(routes::team::get_teams)
            .service(routes::team::get_team)
            .service(routes::team::create_team)
            .service(routes::team::assign_team_supervisor)
            .service(routes::team::delete_team)
            .service(routes::staff::get_staff_list)
            .service(routes::staff::get_staff)
            .service(routes::staff::register_staff)
            .service(routes::staff::update_staff)
            .service(routes::staff::update_staff_status)
            .service(routes::staff::delete_staff)
    })
    .bind(bind)?
    .run()
    .await
}
