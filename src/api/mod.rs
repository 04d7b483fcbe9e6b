//! HTTP layer: JWT helpers, middleware and route handlers

pub mod constants;
pub mod jwt;
pub mod middleware;
pub mod services;
