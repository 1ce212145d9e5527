//! Upstream protocol integration: wire schemas, codec, connections, and the
//! connection pool.

pub mod codec;
pub mod connection;
pub mod messages;
pub mod payload_type;
pub mod pool;

pub use codec::{CodecError, InboundMessage, Payload};
pub use connection::{Connection, ConnectionError, ConnectionState};
pub use pool::{ConnectionPool, PoolEntryStats, PoolStats};
