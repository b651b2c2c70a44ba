// web-server/src/middleware/identity.rs
use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use common::{Principal, Role};
use futures_util::future::{ready, Ready};

use crate::error::ApiError;

/// Where the credential of the current request was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Header,
    /// `?access_token=` on the real-time channel path
    Query,
}

/// Validated caller, bound into the request extensions by [`JwtAuth`](super::JwtAuth).
#[derive(Debug, Clone)]
pub struct Identity {
    pub principal: Principal,
    pub source: TokenSource,
}

impl Identity {
    pub fn role(&self) -> Role {
        self.principal.role
    }
}

impl FromRequest for Identity {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Identity>()
                .cloned()
                .ok_or(ApiError::MissingToken),
        )
    }
}
