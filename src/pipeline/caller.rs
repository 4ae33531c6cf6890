use std::time::Duration;
use tokio::time::Instant;

/// Identity and limits of one inbound call
///
/// `user` is an already-authenticated identity; it selects the proxy.
/// `address` is the client's network address; it keys admission control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    pub user: String,
    pub address: String,
    pub deadline: Option<Instant>,
}

impl CallContext {
    pub fn new(user: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            address: address.into(),
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the deadline `timeout` from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Key used for the admission bucket; the address, else the user
    pub fn admission_key(&self) -> &str {
        let address = self.address.trim();
        if address.is_empty() {
            self.user.trim()
        } else {
            address
        }
    }
}
