pub mod admin;
pub mod auth;
pub mod free;
pub mod member;
