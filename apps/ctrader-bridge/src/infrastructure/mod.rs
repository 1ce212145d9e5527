//! Infrastructure layer - adapters for the upstream protocol, configuration,
//! and the HTTP facade server.

pub mod config;
pub mod http;
pub mod openapi;
