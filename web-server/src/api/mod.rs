// web-server/src/api/mod.rs
pub mod auth;
pub mod staff;
pub mod statistics;

use actix_web::{get, web, HttpResponse, Responder};
use serde_json::json;

use crate::context::AppContext;
use crate::middleware::Authorize;
use crate::realtime;

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("Task Tracker Web Server")
}

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Routes and shared state. The app must also be wrapped with
/// [`AppContext::jwt_auth`] so the scopes below see a bound identity.
pub fn configure(cfg: &mut web::ServiceConfig, ctx: &AppContext) {
    cfg.app_data(web::Data::new(ctx.clone()))
        .service(index)
        .service(health)
        .service(
            web::scope("/api")
                .service(auth::login)
                .service(auth::logout)
                .service(auth::me)
                .service(
                    web::scope("/staff")
                        .wrap(Authorize::new(ctx.policies.staff_directory.clone()))
                        .service(staff::list),
                )
                .service(
                    web::scope("/statistics")
                        .wrap(Authorize::new(ctx.policies.statistics.clone()))
                        .service(statistics::summary),
                ),
        )
        .service(
            web::resource(ctx.realtime_path.as_str())
                .wrap(Authorize::new(ctx.policies.authenticated.clone()))
                .route(web::get().to(realtime::handshake)),
        );
}
