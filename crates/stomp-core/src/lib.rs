//! # stomp-core
//!
//! Foundation types for the STOMP broker.
//!
//! This crate provides the vocabulary shared by the server, the credential
//! store, and the binary:
//!
//! - **Ids**: [`ConnectionId`] and [`SubscriptionId`] newtypes
//! - **Codec**: [`FrameCodec`] turns a byte stream into NUL-terminated frame texts and back
//! - **Frames**: [`Frame`] parser and the closed [`Command`] enumeration
//! - **Outbound frames**: builders for `CONNECTED`, `RECEIPT`, `MESSAGE`, and `ERROR`
//! - **Errors**: [`ProtocolError`] taxonomy, every variant fatal to its connection
//! - **Logging**: [`logging::init_subscriber`] for the `tracing` subscriber

#![deny(unsafe_code)]

pub mod codec;
pub mod errors;
pub mod frame;
pub mod ids;
pub mod logging;
pub mod outbound;

pub use codec::FrameCodec;
pub use errors::{CodecError, ProtocolError};
pub use frame::{Command, Frame};
pub use ids::{ConnectionId, SubscriptionId};

/// Protocol version negotiated by `CONNECT` and announced in `CONNECTED`.
pub const PROTOCOL_VERSION: &str = "1.2";
