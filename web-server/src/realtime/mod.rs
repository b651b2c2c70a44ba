// web-server/src/realtime/mod.rs
pub mod registry;
pub mod session;

use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;

use crate::context::AppContext;
use crate::middleware::Identity;
use session::NotificationSession;

/// WebSocket handshake for the notification channel.
///
/// [`JwtAuth`](crate::middleware::JwtAuth) has already validated the header or
/// `access_token` credential by the time this runs.
pub async fn handshake(
    req: HttpRequest,
    stream: web::Payload,
    identity: Identity,
    ctx: web::Data<AppContext>,
) -> Result<HttpResponse, Error> {
    tracing::debug!(
        "Channel handshake for principal {} via {:?}",
        identity.principal.id,
        identity.source
    );

    let session = NotificationSession::new(identity.principal, ctx.registry.clone());
    ws::start(session, &req, stream)
}
