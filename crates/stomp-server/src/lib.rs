//! # stomp-server
//!
//! Server side of the STOMP broker.
//!
//! - [`SubscriptionRegistry`]: concurrent connection/subscription indices and unicast delivery
//! - [`StompProtocol`]: per-connection state machine, one handler per command
//! - [`ProtocolContext`]: registry, credential store, and message-id sequence shared by connections
//! - [`StompServer`]: tokio TCP listener running one task per connection
//! - [`ShutdownCoordinator`]: graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod context;
pub mod errors;
pub mod metrics;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod shutdown;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{ConnectionLimits, ServerConfig};
pub use context::{MessageIdSequence, ProtocolContext};
pub use errors::{HandleError, RegistryError, ServerError};
pub use protocol::{Session, StompProtocol};
pub use registry::{ConnectionHandle, SubscriptionRegistry};
pub use server::StompServer;
pub use shutdown::ShutdownCoordinator;
