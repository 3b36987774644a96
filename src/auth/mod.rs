// Authentication: bearer token verification and the per-route gate

pub mod audit_logger;
pub mod auth_middleware;
pub mod jwt;
