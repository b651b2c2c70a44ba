// web-server/src/middleware/authorize.rs
use std::sync::Arc;
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures_util::future::{ready, LocalBoxFuture, Ready};

use super::identity::Identity;
use crate::error::ApiError;
use crate::policy::Policy;

/// Role check for a scope. Must sit inside [`JwtAuth`](super::JwtAuth).
#[derive(Clone)]
pub struct Authorize {
    policy: Arc<Policy>,
}

impl Authorize {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    fn check(&self, req: &ServiceRequest) -> Result<(), ApiError> {
        let extensions = req.extensions();
        let identity = extensions.get::<Identity>().ok_or(ApiError::MissingToken)?;

        if self.policy.allows(identity.role()) {
            Ok(())
        } else {
            tracing::warn!(
                "Principal {} with role {} denied by policy {} on {}",
                identity.principal.id,
                identity.role(),
                self.policy.name,
                req.path()
            );
            Err(ApiError::Forbidden {
                policy: self.policy.name.clone(),
                role: identity.role(),
            })
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authorize
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthorizeMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthorizeMiddleware {
            service,
            authorize: self.clone(),
        }))
    }
}

pub struct AuthorizeMiddleware<S> {
    service: S,
    authorize: Authorize,
}

impl<S, B> Service<ServiceRequest> for AuthorizeMiddleware<S>
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
        if let Err(err) = self.authorize.check(&req) {
            let resp = req.error_response(err).map_into_right_body();
            return Box::pin(async move { Ok(resp) });
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            fut.await.map(ServiceResponse::map_into_left_body)
        })
    }
}
