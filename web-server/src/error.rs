// web-server/src/error.rs
use actix_web::{http::header, http::StatusCode, HttpResponse, ResponseError};
use common::jwt::TokenError;
use common::{ErrorBody, Role};

/// Every rejection the server produces.
///
/// Authentication failures map to 401 and authorization failures to 403,
/// so a client can tell "log in again" from "you lack permission".
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("{0}")]
    InvalidToken(#[from] TokenError),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("role `{role}` is not permitted by policy `{policy}`")]
    Forbidden { policy: String, role: Role },

    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::MissingToken | ApiError::InvalidToken(_) | ApiError::InvalidCredentials => {
                "unauthorized"
            }
            ApiError::Forbidden { .. } => "forbidden",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingToken | ApiError::InvalidToken(_) | ApiError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = ErrorBody {
            error: self.kind().to_string(),
            message: self.to_string(),
        };

        let mut response = HttpResponse::build(self.status_code());
        if self.status_code() == StatusCode::UNAUTHORIZED {
            response.insert_header((header::WWW_AUTHENTICATE, "Bearer"));
        }
        response.json(body)
    }
}
