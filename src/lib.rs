//! Non-blocking TCP/UDP connection establishment on a raw socket.
//!
//! [`Connector`] creates a socket, optionally binds it to a local address and port, resolves
//! a host and tries each resolved address in turn, reapplying the local binding whenever the
//! socket has to be replaced. Once connected, the socket is handed off with [`Connector::assign`].
//!
//! All I/O is driven from [`Connector::next_event`] and needs a Tokio runtime with I/O and
//! time drivers enabled.

mod addr;
mod config;
mod connector;
pub mod err;
mod event;
mod handoff;
mod resolve;

pub use addr::HostAddress;
pub use config::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_WAIT_TIMEOUT};
pub use connector::Connector;
pub use err::SocketError;
pub use event::{Event, Phase, SocketType};
pub use handoff::AdoptSocket;
pub use resolve::{LookupId, Resolve, SystemResolver};
pub use socket2::{Domain, Protocol, Type};
