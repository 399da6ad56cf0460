use super::Connector;
use crate::err::SocketError;
use crate::event::{Event, Phase};
use crate::handoff::AdoptSocket;
use std::time::Duration;
use tokio::time::timeout;

impl Connector {
    /// Drives the connector until it is connected, an error is reported, or `limit` elapses.
    ///
    /// On any outcome other than success the attempt is aborted.
    pub async fn wait_for_connected(&mut self, limit: Duration) -> Result<(), SocketError> {
        if self.phase == Phase::Connected {
            return Ok(());
        }

        let outcome = timeout(limit, async {
            while let Some(event) = self.next_event().await {
                match event {
                    Event::Connected if self.phase == Phase::Connected => return Ok(()),
                    Event::ErrorOccurred(e) if !self.phase.is_busy() => return Err(e),
                    _ => {}
                }
            }
            // nothing in progress, so nothing left to wait for
            Err(self.last_error.unwrap_or(SocketError::InvalidState))
        })
        .await;

        let error = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e,
            Err(elapsed) => {
                log::debug!("Gave up waiting for connection: {}", elapsed);
                self.last_error = Some(SocketError::SocketTimeout);
                SocketError::SocketTimeout
            }
        };
        self.abort();
        Err(error)
    }

    /// Hands the connected socket over to `T` and returns to `Unconnected`.
    ///
    /// Fails with [`SocketError::InvalidState`] unless connected, leaving the connector untouched.
    pub fn assign<T: AdoptSocket>(&mut self) -> Result<T, SocketError> {
        if self.phase != Phase::Connected {
            return Err(SocketError::InvalidState);
        }
        let Some(socket) = self.socket.take() else {
            return Err(SocketError::InvalidState);
        };

        self.binding = None;
        self.set_phase(Phase::Unconnected);
        T::adopt(socket).map_err(|e| {
            log::error!("Failed to hand off connected socket: {}", e);
            SocketError::UnknownSocketError
        })
    }
}
