// web-server/src/api/auth.rs
use actix_web::{get, post, web, HttpResponse};
use common::{LoginRequest, LoginResponse};

use crate::accounts;
use crate::context::AppContext;
use crate::error::ApiError;
use crate::middleware::Identity;

/// Verify username/password and mint a token.
///
/// Unknown usernames and wrong passwords produce the same 401.
#[post("/auth/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    ctx: web::Data<AppContext>,
) -> Result<HttpResponse, ApiError> {
    let LoginRequest { username, password } = body.into_inner();

    let principal = match accounts::authenticate(ctx.accounts.as_ref(), &username, &password).await? {
        Some(principal) => principal,
        None => {
            tracing::warn!("Failed login attempt for username: {}", username);
            return Err(ApiError::InvalidCredentials);
        }
    };

    let issued = ctx.issuer.issue(&principal).map_err(|e| {
        tracing::error!("Failed to issue token for principal {}: {}", principal.id, e);
        ApiError::Internal(e.to_string())
    })?;

    tracing::info!(
        "Principal {} ({}) signed in, token expires at {}",
        principal.id,
        principal.role,
        issued.expires_at
    );

    Ok(HttpResponse::Ok().json(LoginResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        user: principal,
    }))
}

/// Tokens are stateless, so this only acknowledges the sign-out.
#[post("/auth/logout")]
pub async fn logout(identity: Identity) -> HttpResponse {
    tracing::info!("Principal {} signed out", identity.principal.id);
    HttpResponse::NoContent().finish()
}

#[get("/auth/me")]
pub async fn me(identity: Identity) -> HttpResponse {
    HttpResponse::Ok().json(identity.principal)
}
