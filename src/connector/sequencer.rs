use super::{Connector, Deferred, InFlight};
use crate::addr::HostAddress;
use crate::err::{ConnectStatus, IoErrorExt, SocketError};
use crate::event::{Event, Phase};
use crate::resolve::{self, Resolution};
use socket2::{Domain, SockAddr, Socket};
use std::io;
use std::net::SocketAddr;
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tokio::time::sleep;

impl Connector {
    /// Starts connecting to `host` (a literal address or a name to look up) on `port`.
    ///
    /// Ignored, with a warning, while a previous attempt is in progress or established.
    /// Without a socket, the call is rejected with [`SocketError::InvalidState`].
    /// Progress and the outcome are reported through events.
    pub fn connect_to_host(&mut self, host: &str, port: u16) {
        if !self.begin_attempt(&host, port) {
            return;
        }
        match resolve::start(self.resolver.as_ref(), host) {
            Resolution::Ready(addresses) => self.start_connecting(addresses),
            Resolution::Pending(lookup) => self.lookup = Some(lookup),
        }
    }

    pub fn connect_to_address(&mut self, address: &HostAddress, port: u16) {
        if self.begin_attempt(address, port) {
            self.start_connecting(vec![address.clone()]);
        }
    }

    fn begin_attempt(&mut self, target: &dyn std::fmt::Display, port: u16) -> bool {
        if self.phase.is_busy() {
            log::warn!(
                "Ignoring connect to {} port {}: already {}",
                target,
                port,
                self.phase
            );
            return false;
        }
        if self.socket.is_none() {
            log::warn!(
                "Cannot connect to {} port {}: create a socket first",
                target,
                port
            );
            self.fail(SocketError::InvalidState);
            return false;
        }

        self.port = port;
        self.set_phase(Phase::HostLookup);
        true
    }

    pub(super) fn start_connecting(&mut self, addresses: Vec<HostAddress>) {
        if addresses.is_empty() {
            self.set_phase(Phase::Unconnected);
            self.fail(SocketError::HostNotFound);
            return;
        }

        self.addresses = addresses.into();
        self.set_phase(Phase::Connecting);
        self.emit(Event::HostFound);
        self.connect_to_next_address();
    }

    fn defer_next_address(&mut self) {
        self.deferred.push_back(Deferred::ConnectToNextAddress);
    }

    pub(super) fn connect_to_next_address(&mut self) {
        let Some(address) = self.addresses.pop_front() else {
            self.set_phase(Phase::Unconnected);
            self.fail(SocketError::ConnectionRefused);
            return;
        };
        let target = address.to_socket_addr(self.port);

        if !self.supports(&target) {
            log::debug!("Skipping {}: address family not supported by socket", target);
            self.defer_next_address();
            return;
        }

        let result = match &self.socket {
            Some(socket) => connect(socket, &target),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "No socket")),
        };

        match result {
            Ok(()) => {
                log::debug!("Connected to {} immediately", target);
                self.connected();
            }
            Err(e) => match e.connect_status() {
                ConnectStatus::InProgress => self.arm_watch(target),
                ConnectStatus::Interrupted | ConnectStatus::Failed => {
                    log::debug!("Connect to {} failed: {}", target, e);
                    self.recreate_socket();
                    self.defer_next_address();
                }
            },
        }
    }

    fn supports(&self, target: &SocketAddr) -> bool {
        let Some(spec) = self.spec else {
            return false;
        };
        match target {
            SocketAddr::V4(_) => spec.domain == Domain::IPV4,
            SocketAddr::V6(_) => spec.domain == Domain::IPV6,
        }
    }

    fn arm_watch(&mut self, target: SocketAddr) {
        let watch = match &self.socket {
            Some(socket) => watch_writable(socket),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "No socket")),
        };
        match watch {
            Ok(watch) => {
                log::debug!("Connecting to {}", target);
                self.in_flight = Some(InFlight {
                    target,
                    watch,
                    timeout: Box::pin(sleep(self.connect_timeout)),
                });
            }
            Err(e) => {
                log::warn!("Failed to watch connect to {}: {}", target, e);
                self.recreate_socket();
                self.defer_next_address();
            }
        }
    }

    pub(super) fn on_writable(&mut self) {
        let Some(in_flight) = self.in_flight.take() else {
            return;
        };
        let target = in_flight.target;
        drop(in_flight);

        let outcome = match &self.socket {
            Some(socket) => connect_outcome(socket),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "No socket")),
        };
        match outcome {
            Ok(()) => {
                log::debug!("Connected to {}", target);
                self.connected();
            }
            Err(e) => {
                log::debug!("Connect to {} failed: {}", target, e);
                self.abort_candidate();
            }
        }
    }

    /// Gives up on the in-flight candidate and moves on to the next one with a fresh socket.
    pub(super) fn abort_candidate(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            log::debug!("Abandoning connect to {}", in_flight.target);
        }
        self.recreate_socket();
        self.defer_next_address();
    }

    fn connected(&mut self) {
        self.in_flight = None;
        self.addresses.clear();
        self.set_phase(Phase::Connected);
        self.emit(Event::Connected);
    }

    /// Closes the socket and returns to `Unconnected`, cancelling anything in progress.
    ///
    /// Emits `Disconnected` if the connector was connected. Forgets the local binding.
    pub fn disconnect_from_host(&mut self) {
        let previous = self.phase;
        self.cancel_outstanding();

        if self.socket.is_some() {
            self.set_phase(Phase::Closing);
            self.close_socket();
        }
        if self.phase != Phase::Unconnected {
            self.set_phase(Phase::Unconnected);
        }
        if previous == Phase::Connected {
            self.emit(Event::Disconnected);
        }

        self.addresses.clear();
        self.binding = None;
    }

    /// Cancels an outstanding lookup, then tears down like [`Connector::disconnect_from_host`].
    pub fn abort(&mut self) {
        if self.lookup.is_some() || self.in_flight.is_some() {
            log::debug!("Aborting attempt while {}", self.phase);
        }
        self.cancel_outstanding();
        self.disconnect_from_host();
    }
}

fn connect(socket: &Socket, target: &SocketAddr) -> Result<(), io::Error> {
    let addr = SockAddr::from(*target);
    loop {
        match socket.connect(&addr) {
            Err(e) if e.connect_status() == ConnectStatus::Interrupted => continue,
            result => return result,
        }
    }
}

/// Registers a duplicate of `socket` with the reactor for writability.
fn watch_writable(socket: &Socket) -> Result<AsyncFd<Socket>, io::Error> {
    let duplicate = socket.try_clone()?;
    // SAFETY: the AsyncFd owns `duplicate`, which stays open until the AsyncFd is dropped.
    let watch = unsafe { AsyncFd::register_with_interest(duplicate, Interest::WRITABLE) }?;
    Ok(watch)
}

/// Reads the result of a non-blocking connect once the socket reports writable.
fn connect_outcome(socket: &Socket) -> Result<(), io::Error> {
    if let Some(e) = socket.take_error()? {
        return Err(e);
    }
    // spurious writability: the handshake has not actually completed
    socket.peer_addr()?;
    Ok(())
}
