//! HTTP API: server, routing, and request/response mapping.
//!
//! Every feature module of the product calls through this boundary: session
//! verification first, then capability/section authorization, then branch
//! narrowing for listings, and finally audit recording for state-changing
//! requests.

pub mod app;
pub mod audit;
pub mod authz;
pub mod context;
pub mod middleware;
