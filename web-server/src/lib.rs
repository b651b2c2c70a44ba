pub mod accounts;
pub mod api;
pub mod context;
pub mod error;
pub mod middleware;
pub mod policy;
pub mod realtime;

pub use context::AppContext;
pub use error::ApiError;
