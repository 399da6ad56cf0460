//! The connection-establishment state machine.
//!
//! A [`Connector`] owns at most one raw socket. It resolves a host, then tries each
//! resolved address in order with a non-blocking `connect`, optionally after binding
//! the socket to a local address. Progress is reported as [`Event`]s.
//!
//! The connector never spawns tasks: every outstanding lookup, writability watch and
//! timeout lives inside it and only makes progress while [`Connector::next_event`]
//! (or [`Connector::wait_for_connected`]) is being polled.

use crate::addr::HostAddress;
use crate::config::DEFAULT_CONNECT_TIMEOUT;
use crate::err::SocketError;
use crate::event::{Event, Phase, SocketType};
use crate::resolve::{self, Lookup, LookupId, Resolve, SystemResolver};
use futures::future::{select, Either};
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, RawFd};
use std::pin::{pin, Pin};
use std::time::Duration;
use tokio::io::unix::AsyncFd;
use tokio::sync::mpsc;
use tokio::time::Sleep;

mod sequencer;
mod socket;
mod wait;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SocketSpec {
    domain: Domain,
    ty: Type,
    protocol: Option<Protocol>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Binding {
    address: HostAddress,
    port: u16,
}

/// Writability watch plus timeout armed for one in-flight candidate.
///
/// The watch owns a duplicate of the connector's descriptor, so the socket is only
/// really closed once the watch is dropped as well.
struct InFlight {
    target: SocketAddr,
    watch: AsyncFd<Socket>,
    timeout: Pin<Box<Sleep>>,
}

enum Deferred {
    ConnectToNextAddress,
}

enum Fired {
    Writable,
    WatchFailed(std::io::Error),
    TimedOut,
}

pub struct Connector {
    socket: Option<Socket>,
    spec: Option<SocketSpec>,
    port: u16,
    binding: Option<Binding>,
    addresses: VecDeque<HostAddress>,
    phase: Phase,
    last_error: Option<SocketError>,
    connect_timeout: Duration,
    resolver: Box<dyn Resolve>,
    lookup: Option<Lookup>,
    in_flight: Option<InFlight>,
    deferred: VecDeque<Deferred>,
    events: VecDeque<Event>,
    subscribers: Vec<mpsc::UnboundedSender<Event>>,
}

impl Default for Connector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector {
    pub fn new() -> Self {
        Self::with_resolver(SystemResolver)
    }

    pub fn with_resolver(resolver: impl Resolve + 'static) -> Self {
        Self {
            socket: None,
            spec: None,
            port: 0,
            binding: None,
            addresses: VecDeque::new(),
            phase: Phase::Unconnected,
            last_error: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            resolver: Box::new(resolver),
            lookup: None,
            in_flight: None,
            deferred: VecDeque::new(),
            events: VecDeque::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The most recent error; not cleared by later successes.
    pub fn last_error(&self) -> Option<SocketError> {
        self.last_error
    }

    pub fn socket_descriptor(&self) -> Option<RawFd> {
        self.socket.as_ref().map(|socket| socket.as_raw_fd())
    }

    pub fn socket_type(&self) -> SocketType {
        let Some(spec) = self.spec else {
            return SocketType::Unknown;
        };
        if spec.domain != Domain::IPV4 && spec.domain != Domain::IPV6 {
            return SocketType::Unknown;
        }
        if spec.ty == Type::STREAM {
            SocketType::Tcp
        } else if spec.ty == Type::DGRAM {
            SocketType::Udp
        } else {
            SocketType::Unknown
        }
    }

    /// The outstanding asynchronous lookup, if any.
    pub fn pending_lookup(&self) -> Option<LookupId> {
        self.lookup.as_ref().map(|lookup| lookup.id)
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Per-candidate timeout for attempts started after this call.
    pub fn set_connect_timeout(&mut self, timeout: Duration) {
        self.connect_timeout = timeout;
    }

    /// Receives a copy of every event emitted from now on.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: Event) {
        log::trace!("Event: {:?}", event);
        self.subscribers.retain(|tx| tx.send(event).is_ok());
        self.events.push_back(event);
    }

    fn set_phase(&mut self, phase: Phase) {
        log::debug!("{} -> {}", self.phase, phase);
        self.phase = phase;
        self.emit(Event::StateChanged(phase));
    }

    fn fail(&mut self, error: SocketError) {
        self.last_error = Some(error);
        self.emit(Event::ErrorOccurred(error));
    }

    /// Drives the state machine until the next event is available.
    ///
    /// Returns `None` once nothing is queued and nothing is outstanding.
    /// Dropping the returned future before it completes loses no state.
    pub async fn next_event(&mut self) -> Option<Event> {
        loop {
            if let Some(event) = self.events.pop_front() {
                return Some(event);
            }

            if let Some(step) = self.deferred.pop_front() {
                match step {
                    Deferred::ConnectToNextAddress => self.connect_to_next_address(),
                }
                continue;
            }

            if let Some(lookup) = &mut self.lookup {
                let result = (&mut lookup.future).await;
                if let Some(lookup) = self.lookup.take() {
                    let addresses = resolve::finish(&lookup, result);
                    self.start_connecting(addresses);
                }
                continue;
            }

            if let Some(in_flight) = &mut self.in_flight {
                let fired = {
                    let writable = pin!(in_flight.watch.writable());
                    match select(writable, in_flight.timeout.as_mut()).await {
                        Either::Left((Ok(_guard), _)) => Fired::Writable,
                        Either::Left((Err(e), _)) => Fired::WatchFailed(e),
                        Either::Right(((), _)) => Fired::TimedOut,
                    }
                };
                match fired {
                    Fired::Writable => self.on_writable(),
                    Fired::WatchFailed(e) => {
                        log::debug!("Watching connect progress failed: {}", e);
                        self.abort_candidate();
                    }
                    Fired::TimedOut => {
                        log::debug!(
                            "Connect timed out after {:?}",
                            self.connect_timeout
                        );
                        self.abort_candidate();
                    }
                }
                continue;
            }

            return None;
        }
    }

    /// Cancels the lookup and disarms the watch/timer, in that order.
    fn cancel_outstanding(&mut self) {
        if let Some(lookup) = self.lookup.take() {
            log::debug!("Cancelling lookup of {:?} ({:?})", lookup.host, lookup.id);
        }
        self.in_flight = None;
        self.deferred.clear();
    }
}

impl Drop for Connector {
    fn drop(&mut self) {
        // the watch holds a duplicate descriptor
        self.cancel_outstanding();
        self.close_socket();
    }
}
