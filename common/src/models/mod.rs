pub mod auth;
pub mod principal;
