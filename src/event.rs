use crate::err::SocketError;
use std::fmt::{self, Display};

/// Where a [`Connector`](crate::Connector) is in its connection-establishment state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Unconnected,
    HostLookup,
    Connecting,
    Connected,
    /// Resting state after a successful bind; only reachable from `Unconnected`.
    Bound,
    /// Transient, while the descriptor is being torn down.
    Closing,
}

impl Phase {
    /// Phases in which a new connection attempt must be refused.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            Phase::HostLookup | Phase::Connecting | Phase::Connected | Phase::Closing
        )
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Phase::Unconnected => "unconnected",
            Phase::HostLookup => "host lookup",
            Phase::Connecting => "connecting",
            Phase::Connected => "connected",
            Phase::Bound => "bound",
            Phase::Closing => "closing",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    HostFound,
    Connected,
    Disconnected,
    StateChanged(Phase),
    ErrorOccurred(SocketError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketType {
    Tcp,
    Udp,
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_phases() {
        assert!(!Phase::Unconnected.is_busy());
        assert!(!Phase::Bound.is_busy());
        assert!(Phase::HostLookup.is_busy());
        assert!(Phase::Connecting.is_busy());
        assert!(Phase::Connected.is_busy());
        assert!(Phase::Closing.is_busy());
    }
}
