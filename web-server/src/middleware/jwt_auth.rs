// web-server/src/middleware/jwt_auth.rs
use std::sync::Arc;
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{self, HeaderMap},
    web, Error, HttpMessage,
};
use common::jwt::TokenValidator;
use common::token_fingerprint;
use futures_util::future::{ready, LocalBoxFuture, Ready};
use serde::Deserialize;

use super::identity::{Identity, TokenSource};
use crate::error::ApiError;

/// Bearer-token authentication for every non-public path.
///
/// The token is read from `Authorization: Bearer`. Only on the real-time
/// channel path, when that header is absent, `?access_token=` is accepted
/// instead. Any other path ignores the query parameter.
#[derive(Clone)]
pub struct JwtAuth {
    validator: Arc<TokenValidator>,
    public_paths: Arc<Vec<String>>,
    channel_path: Arc<String>,
}

#[derive(Deserialize)]
struct ChannelQuery {
    access_token: Option<String>,
}

impl JwtAuth {
    pub fn new(validator: TokenValidator, channel_path: impl Into<String>) -> Self {
        Self {
            validator: Arc::new(validator),
            public_paths: Arc::new(Vec::new()),
            channel_path: Arc::new(channel_path.into()),
        }
    }

    /// Exempt an exact path from authentication.
    pub fn public(mut self, path: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.public_paths).push(path.into());
        self
    }

    fn is_public(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| p == path)
    }

    fn is_channel(&self, path: &str) -> bool {
        let prefix = self.channel_path.trim_end_matches('/');
        match path.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    fn extract(&self, req: &ServiceRequest) -> Option<(String, TokenSource)> {
        if let Some(token) = bearer_token(req.headers()) {
            return Some((token, TokenSource::Header));
        }

        if !self.is_channel(req.path()) {
            return None;
        }

        web::Query::<ChannelQuery>::from_query(req.query_string())
            .ok()
            .and_then(|q| q.into_inner().access_token)
            .filter(|t| !t.trim().is_empty())
            .map(|t| (t, TokenSource::Query))
    }

    fn authenticate(&self, req: &ServiceRequest) -> Result<Identity, ApiError> {
        let (token, source) = match self.extract(req) {
            Some(found) => found,
            None => {
                tracing::debug!("No credential presented for {}", req.path());
                return Err(ApiError::MissingToken);
            }
        };

        let principal = self
            .validator
            .validate(&token)
            .and_then(|claims| claims.principal())
            .map_err(|e| {
                tracing::warn!(
                    "Rejected token {} ({:?}) on {}: {}",
                    token_fingerprint(&token),
                    source,
                    req.path(),
                    e
                );
                ApiError::from(e)
            })?;

        if source == TokenSource::Query {
            tracing::debug!(
                "Channel handshake authenticated via query token {}",
                token_fingerprint(&token)
            );
        }

        Ok(Identity { principal, source })
    }
}

/// `Authorization: Bearer <token>`, scheme matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token.to_string())
    } else {
        None
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = JwtAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddleware {
            service,
            auth: self.clone(),
        }))
    }
}

pub struct JwtAuthMiddleware<S> {
    service: S,
    auth: JwtAuth,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if !self.auth.is_public(req.path()) {
            match self.auth.authenticate(&req) {
                Ok(identity) => {
                    req.extensions_mut().insert(identity);
                }
                Err(err) => {
                    // Rejected before the request reaches any handler
                    let resp = req.error_response(err).map_into_right_body();
                    return Box::pin(async move { Ok(resp) });
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            fut.await.map(ServiceResponse::map_into_left_body)
        })
    }
}
