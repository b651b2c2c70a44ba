// web-server/src/api/staff.rs
use actix_web::{get, web, HttpResponse};

use crate::context::AppContext;

/// Staff directory, restricted by the `DirectorOnly` policy.
#[get("")]
pub async fn list(ctx: web::Data<AppContext>) -> HttpResponse {
    HttpResponse::Ok().json(ctx.accounts.principals().await)
}
