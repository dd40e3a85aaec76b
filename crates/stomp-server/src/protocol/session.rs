//! Per-connection session state.

/// What the protocol knows about its connection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    connected: bool,
    username: Option<String>,
    terminate: bool,
}

impl Session {
    /// Fresh, not yet connected session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `CONNECT` succeeded.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// User logged in on this connection.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Whether the connection must be closed.
    pub fn should_terminate(&self) -> bool {
        self.terminate
    }

    /// Record a successful `CONNECT`.
    pub fn mark_connected(&mut self, username: &str) {
        self.connected = true;
        self.username = Some(username.to_owned());
    }

    /// Flag the connection for termination. Sticky.
    pub fn mark_terminated(&mut self) {
        self.terminate = true;
    }
}
