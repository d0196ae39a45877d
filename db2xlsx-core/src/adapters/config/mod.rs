//! Configuration types for database adapters.
//!
//! - `ConnectionConfig`: flavour, target and credentials for one connection

mod connection;

pub use connection::{CONNECT_TIMEOUT, ConnectionConfig};
