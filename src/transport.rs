//! Secure persistent socket collaborator.
//!
//! The session owns exactly one transport handle and drives it from the
//! service tick. The trait models the socket the way the session needs it:
//!
//! - `open` / `send` / `disconnect` / `is_connected`
//! - `poll`, delivering lifecycle and data events collected since the last
//!   call
//!
//! A transport is expected to implement its own reconnect-on-next-poll
//! behavior after an unrequested drop; the session never retries within a
//! tick, it simply polls again on the next one.

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Error as WsError, Message, WebSocket};

use crate::error::{RealtimeLinkError, Result};

/// Notifications delivered by [`Transport::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The socket completed its handshake and is ready for frames.
    Connected,
    /// The socket dropped (server close, protocol error, dead link).
    Disconnected(String),
    /// One inbound text frame.
    Text(String),
    /// A transport-level fault that did not necessarily drop the socket.
    Error(String),
}

/// Secure persistent socket abstraction.
pub trait Transport {
    /// Open a secure socket to `host:port` at `path`. The endpoint is
    /// remembered for reconnect attempts until [`Transport::disconnect`].
    fn open(&mut self, host: &str, port: u16, path: &str) -> Result<()>;

    /// Send one text frame.
    fn send(&mut self, text: &str) -> Result<()>;

    /// Close the socket and forget the endpoint; no reconnects afterwards.
    fn disconnect(&mut self);

    /// Whether the socket is currently open.
    fn is_connected(&self) -> bool;

    /// Drain pending events, attempting an internal reconnect first when
    /// the socket dropped without a [`Transport::disconnect`] call.
    fn poll(&mut self) -> Vec<TransportEvent>;
}

type WsSocket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Production transport on the synchronous `tungstenite` client.
///
/// Reads are non-blocking so that `poll` drains whatever frames arrived and
/// returns immediately; the tick cadence of the caller provides the pacing.
pub struct WsTransport {
    socket: Option<WsSocket>,
    endpoint: Option<(String, u16, String)>,
    pending: VecDeque<TransportEvent>,
    connect_timeout: Duration,
    reconnect_delay: Duration,
    last_attempt: Option<Instant>,
}

impl WsTransport {
    /// Transport with the given TCP+TLS handshake timeout and minimum delay
    /// between internal reconnect attempts.
    pub fn new(connect_timeout: Duration, reconnect_delay: Duration) -> Self {
        Self {
            socket: None,
            endpoint: None,
            pending: VecDeque::new(),
            connect_timeout,
            reconnect_delay,
            last_attempt: None,
        }
    }

    fn try_connect(&mut self) -> Result<()> {
        let (host, port, path) = match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => {
                return Err(RealtimeLinkError::ConfigurationError(
                    "transport has no endpoint to connect to".to_string(),
                ))
            }
        };
        self.last_attempt = Some(Instant::now());

        let addrs = (host.as_str(), port).to_socket_addrs().map_err(|e| {
            RealtimeLinkError::TransportError(format!("resolve {}:{}: {}", host, port, e))
        })?;

        let mut stream = None;
        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => last_err = Some(e),
            }
        }
        let stream = stream.ok_or_else(|| {
            RealtimeLinkError::TransportError(format!(
                "connect {}:{}: {}",
                host,
                port,
                last_err
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no resolved addresses".to_string())
            ))
        })?;

        let url = format!("wss://{}:{}{}", host, port, path);
        let (mut socket, _response) = tungstenite::client_tls(url.as_str(), stream)
            .map_err(|e| RealtimeLinkError::TransportError(format!("handshake: {}", e)))?;

        // Handshake runs blocking; reads afterwards must not block the tick.
        let nb_result = match socket.get_mut() {
            MaybeTlsStream::Plain(s) => s.set_nonblocking(true),
            MaybeTlsStream::Rustls(s) => s.sock.set_nonblocking(true),
            _ => Ok(()),
        };
        if let Err(e) = nb_result {
            return Err(RealtimeLinkError::TransportError(format!(
                "set_nonblocking: {}",
                e
            )));
        }

        log::info!("[realtime-link] Socket connected to {}:{}", host, port);
        self.socket = Some(socket);
        self.pending.push_back(TransportEvent::Connected);
        Ok(())
    }

    fn drop_socket(&mut self, reason: String) {
        self.socket = None;
        self.pending.push_back(TransportEvent::Disconnected(reason));
    }
}

impl Transport for WsTransport {
    fn open(&mut self, host: &str, port: u16, path: &str) -> Result<()> {
        self.endpoint = Some((host.to_string(), port, path.to_string()));
        self.try_connect()
    }

    fn send(&mut self, text: &str) -> Result<()> {
        let socket = self.socket.as_mut().ok_or_else(|| {
            RealtimeLinkError::TransportError("send while not connected".to_string())
        })?;

        match socket.send(Message::Text(text.to_string().into())) {
            Ok(()) => Ok(()),
            Err(e) => {
                let msg = format!("send failed: {}", e);
                self.drop_socket(msg.clone());
                Err(RealtimeLinkError::TransportError(msg))
            }
        }
    }

    fn disconnect(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None);
        }
        self.endpoint = None;
        self.pending.clear();
        self.last_attempt = None;
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    fn poll(&mut self) -> Vec<TransportEvent> {
        // Internal reconnect: the endpoint is remembered until an explicit
        // disconnect, so a dropped socket comes back on a later poll.
        if self.socket.is_none() && self.endpoint.is_some() {
            let due = self
                .last_attempt
                .map(|t| t.elapsed() >= self.reconnect_delay)
                .unwrap_or(true);
            if due {
                if let Err(e) = self.try_connect() {
                    log::debug!("[realtime-link] Reconnect attempt failed: {}", e);
                }
            }
        }

        let mut events: Vec<TransportEvent> = self.pending.drain(..).collect();

        let mut fault: Option<String> = None;
        let mut dropped: Option<String> = None;
        if let Some(socket) = self.socket.as_mut() {
            loop {
                match socket.read() {
                    Ok(Message::Text(text)) => {
                        events.push(TransportEvent::Text(text.to_string()));
                    }
                    Ok(Message::Ping(payload)) => {
                        let _ = socket.send(Message::Pong(payload));
                    }
                    Ok(Message::Pong(_)) | Ok(Message::Binary(_)) | Ok(Message::Frame(_)) => {}
                    Ok(Message::Close(frame)) => {
                        dropped = Some(
                            frame
                                .map(|f| f.reason.to_string())
                                .unwrap_or_else(|| "server closed connection".to_string()),
                        );
                        break;
                    }
                    Err(WsError::Io(e)) if e.kind() == ErrorKind::WouldBlock => break,
                    Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => {
                        dropped = Some("connection closed".to_string());
                        break;
                    }
                    Err(e) => {
                        let msg = e.to_string();
                        fault = Some(msg.clone());
                        dropped = Some(msg);
                        break;
                    }
                }
            }
        }

        if let Some(message) = fault {
            events.push(TransportEvent::Error(message));
        }
        if let Some(reason) = dropped {
            self.socket = None;
            events.push(TransportEvent::Disconnected(reason));
        }

        events
    }
}
