use super::{Binding, Connector, SocketSpec};
use crate::addr::HostAddress;
use crate::err::SocketError;
use crate::event::Phase;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;

impl Connector {
    /// Opens a new non-blocking socket.
    ///
    /// Only permitted while `Unconnected` with no socket held. A binding recorded earlier
    /// (and not cleared by a disconnect) is applied to the new socket before this returns.
    pub fn create_socket(
        &mut self,
        domain: Domain,
        ty: Type,
        protocol: Option<Protocol>,
    ) -> Result<(), SocketError> {
        if self.phase != Phase::Unconnected || self.socket.is_some() {
            log::warn!(
                "Cannot create a socket while {} with a socket held: {}",
                self.phase,
                self.socket.is_some()
            );
            self.fail(SocketError::InvalidState);
            return Err(SocketError::InvalidState);
        }

        self.spec = Some(SocketSpec {
            domain,
            ty,
            protocol,
        });

        match self.open_socket() {
            Ok(socket) => {
                self.socket = Some(socket);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to create socket: {}", e);
                self.fail(SocketError::UnknownSocketError);
                Err(SocketError::UnknownSocketError)
            }
        }
    }

    pub fn create_tcp_socket(&mut self) -> Result<(), SocketError> {
        self.create_socket(Domain::IPV4, Type::STREAM, None)
    }

    pub fn create_udp_socket(&mut self) -> Result<(), SocketError> {
        self.create_socket(Domain::IPV4, Type::DGRAM, None)
    }

    /// Closes the socket if one is held. Idempotent.
    ///
    /// A bound connector goes back to `Unconnected` but keeps its binding, so the next
    /// [`Connector::create_socket`] binds the new socket to the same address and port.
    pub fn destroy_socket(&mut self) {
        self.close_socket();
        if self.phase == Phase::Bound {
            self.set_phase(Phase::Unconnected);
        }
    }

    pub(super) fn close_socket(&mut self) {
        if let Some(socket) = self.socket.take() {
            log::trace!("Closing socket {:?}", socket);
        }
    }

    /// Binds the socket to `address:port` (port 0 picks an ephemeral port).
    ///
    /// The binding is remembered and reapplied every time a socket is opened,
    /// until the next disconnect.
    pub fn bind_to(&mut self, address: &HostAddress, port: u16) -> Result<(), SocketError> {
        if !matches!(self.phase, Phase::Unconnected | Phase::Bound) {
            log::warn!("Cannot bind to {} while {}", address, self.phase);
            self.fail(SocketError::InvalidState);
            return Err(SocketError::InvalidState);
        }

        let Some(socket) = &self.socket else {
            log::warn!("Cannot bind to {}: create a socket first", address);
            self.fail(SocketError::InvalidState);
            return Err(SocketError::InvalidState);
        };

        match bind(socket, address, port) {
            Ok(()) => {
                self.binding = Some(Binding {
                    address: address.clone(),
                    port,
                });
                self.set_phase(Phase::Bound);
                Ok(())
            }
            Err(e) => {
                log::warn!("Failed to bind to {} port {}: {}", address, port, e);
                self.fail(SocketError::UnknownSocketError);
                Err(SocketError::UnknownSocketError)
            }
        }
    }

    /// Replaces the socket with a fresh one of the same kind, rebound if needed.
    ///
    /// A socket whose connect was abandoned cannot portably be connected again.
    /// If the fresh socket cannot be opened or rebound, none is held afterwards.
    pub(super) fn recreate_socket(&mut self) {
        self.close_socket();
        match self.open_socket() {
            Ok(socket) => self.socket = Some(socket),
            Err(e) => log::warn!("Failed to recreate socket: {}", e),
        }
    }

    /// Opens a non-blocking socket with the stored family and type, then applies the
    /// stored binding. Leaves phase and events alone.
    fn open_socket(&self) -> Result<Socket, io::Error> {
        let spec = self.spec.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "No socket kind recorded")
        })?;
        let socket = Socket::new(spec.domain, spec.ty, spec.protocol)?;
        socket.set_nonblocking(true)?;
        if let Some(Binding { address, port }) = &self.binding {
            bind(&socket, address, *port)?;
            log::trace!("Rebound new socket to {} port {}", address, port);
        }
        Ok(socket)
    }
}

fn bind(socket: &Socket, address: &HostAddress, port: u16) -> Result<(), io::Error> {
    socket.bind(&address.to_socket_addr(port).into())
}
