pub mod authorize;
pub mod identity;
pub mod jwt_auth;

pub use authorize::Authorize;
pub use identity::{Identity, TokenSource};
pub use jwt_auth::JwtAuth;
