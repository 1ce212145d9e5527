//! Application layer - the bridge facade and its error taxonomy.

pub mod bridge;
pub mod error;
pub mod error_mapper;
mod facade;

pub use bridge::{Bridge, BridgeStats};
pub use error::FacadeError;
pub use error_mapper::{ErrorClass, MappedError, map_error};
