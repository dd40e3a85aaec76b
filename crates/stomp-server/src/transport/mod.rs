//! TCP transport: one task per connection, NUL-framed over a raw socket.

pub mod connection;
pub mod session;

pub use connection::TcpConnectionHandle;
pub use session::run_connection;
