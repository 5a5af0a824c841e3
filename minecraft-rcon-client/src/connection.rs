use log::{debug, info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

use crate::packet::{Packet, PacketKind, MAX_FRAME_SIZE, MIN_FRAME_SIZE};
use crate::{RconConfig, RconError, Result};

/// Request ID the server echoes to signal a rejected password.
const AUTH_REJECTED: i32 = -1;

/// Lifecycle of one transport session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Ready,
    /// A connect attempt failed at the transport level. Terminal for that
    /// attempt only: the next `connect()` starts over from scratch.
    Failed,
}

pub(crate) struct Connection {
    config: RconConfig,
    stream: Option<TcpStream>,
    state: ConnectionState,
    request_id: i32,
}

impl Connection {
    pub(crate) fn new(config: RconConfig) -> Self {
        Connection {
            config,
            stream: None,
            state: ConnectionState::Disconnected,
            request_id: 0,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    pub(crate) fn auto_reconnect(&self) -> bool {
        self.config.auto_reconnect
    }

    /// Next wire ID. Wraps below `i32::MAX` so the value always fits the
    /// signed field and never collides with the rejection marker.
    fn next_request_id(&mut self) -> i32 {
        self.request_id = (self.request_id + 1) % i32::MAX;
        self.request_id
    }

    /// Drop the transport after a failure detected mid-use. Once a read or
    /// write has been abandoned the frame boundary is lost, so the stream
    /// cannot be reused.
    fn drop_transport(&mut self) {
        self.stream = None;
        self.state = ConnectionState::Disconnected;
    }

    /// Establish the TCP connection and complete the password handshake.
    /// No-op when already ready.
    pub(crate) async fn connect(&mut self) -> Result<()> {
        if self.state == ConnectionState::Ready {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;
        info!(
            "connecting to rcon server {}:{}",
            self.config.host, self.config.port
        );

        let addr = (self.config.host.clone(), self.config.port);
        let dialed = timeout(self.config.timeout, TcpStream::connect(addr)).await;
        let stream = match dialed {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => {
                self.state = ConnectionState::Failed;
                return Err(RconError::Connection(format!(
                    "unable to connect to {}:{}: {err}",
                    self.config.host, self.config.port
                )));
            }
            Err(_) => {
                self.state = ConnectionState::Failed;
                return Err(RconError::Connection(format!(
                    "timed out connecting to {}:{}",
                    self.config.host, self.config.port
                )));
            }
        };

        self.stream = Some(stream);
        debug!("tcp connection established");

        self.authenticate().await
    }

    /// Password handshake. On success the connection is ready for commands.
    ///
    /// A rejection leaves the connection disconnected and is never retried
    /// here: the same credential would simply be rejected again.
    async fn authenticate(&mut self) -> Result<()> {
        self.state = ConnectionState::Authenticating;

        let auth_id = self.next_request_id();
        let request = Packet::new(auth_id, PacketKind::Auth, self.config.password.clone());
        self.send_packet(&request).await?;

        let mut response = self.receive_packet().await?;

        // Quirk: the server may emit one empty ResponseValue frame ahead of
        // the real auth response. Skip exactly one.
        if response.kind == PacketKind::ResponseValue && response.payload.is_empty() {
            response = self.receive_packet().await?;
        }

        if response.request_id == AUTH_REJECTED {
            self.drop_transport();
            return Err(RconError::Authentication(
                "password rejected by server".into(),
            ));
        }
        if response.request_id != auth_id {
            self.drop_transport();
            return Err(RconError::Authentication(format!(
                "handshake out of sync: expected id {auth_id}, got {}",
                response.request_id
            )));
        }

        self.state = ConnectionState::Ready;
        info!("authenticated with rcon server");
        Ok(())
    }

    /// Close the transport, if any, and return to the disconnected state.
    pub(crate) fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            info!("disconnected from rcon server");
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Bounded reconnection: close, wait the configured delay, then connect
    /// from scratch (including re-authentication). Returns on the first
    /// attempt that reaches ready; once the bound is exhausted the last
    /// connection failure is surfaced unchanged.
    pub(crate) async fn reconnect(&mut self) -> Result<()> {
        let attempts = self.config.max_reconnect_attempts;
        let mut last_err =
            RconError::Connection(format!("exhausted {attempts} reconnection attempts"));

        for attempt in 1..=attempts {
            info!("reconnection attempt {attempt}/{attempts}");
            self.disconnect();
            sleep(self.config.reconnect_delay).await;

            match self.connect().await {
                Ok(()) => {
                    info!("reconnected");
                    return Ok(());
                }
                // Retrying a rejected credential is never useful; let the
                // caller hear about it immediately.
                Err(err @ RconError::Authentication(_)) => return Err(err),
                Err(err) => {
                    warn!("reconnection attempt {attempt} failed: {err}");
                    last_err = err;
                }
            }
        }

        warn!("giving up after {attempts} reconnection attempts");
        Err(last_err)
    }

    /// Send one command and collect its response. Requires a ready
    /// connection; state checks and retries live a layer up.
    ///
    /// Responses are assumed to fit a single frame: the first frame whose ID
    /// matches completes the command. Frames with any other ID are
    /// correlation anomalies and are dropped, never delivered.
    pub(crate) async fn exec_command(&mut self, command: &str) -> Result<String> {
        if self.state != ConnectionState::Ready {
            return Err(RconError::Connection("not connected to server".into()));
        }

        let request_id = self.next_request_id();
        let request = Packet::new(request_id, PacketKind::ExecCommand, command);
        self.send_packet(&request).await?;

        loop {
            let response = self.receive_packet().await?;
            if response.request_id != request_id {
                warn!(
                    "discarding frame with unexpected id {} while awaiting {request_id}",
                    response.request_id
                );
                continue;
            }
            return Ok(response.payload);
        }
    }

    async fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        // The auth payload is the password; never log it.
        if packet.kind == PacketKind::Auth {
            debug!("sending auth packet: id={}", packet.request_id);
        } else {
            debug!(
                "sending packet: id={} kind={:?} payload={:?}",
                packet.request_id,
                packet.kind,
                preview(&packet.payload)
            );
        }

        let data = packet.encode();
        let budget = self.config.timeout;
        let written = match self.stream.as_mut() {
            Some(stream) => timeout(budget, stream.write_all(&data)).await,
            None => return Err(RconError::Connection("not connected to server".into())),
        };

        match written {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                self.drop_transport();
                Err(RconError::Connection(format!("send failed: {err}")))
            }
            Err(_) => {
                self.drop_transport();
                Err(RconError::Timeout("timed out sending packet".into()))
            }
        }
    }

    async fn receive_packet(&mut self) -> Result<Packet> {
        let budget = self.config.timeout;
        let received = match self.stream.as_mut() {
            Some(stream) => timeout(budget, read_frame(stream)).await,
            None => return Err(RconError::Connection("not connected to server".into())),
        };

        match received {
            Ok(Ok(packet)) => {
                debug!(
                    "received packet: id={} kind={:?} payload={:?}",
                    packet.request_id,
                    packet.kind,
                    preview(&packet.payload)
                );
                Ok(packet)
            }
            Ok(Err(err)) => {
                // I/O failures and framing violations both leave the stream
                // in an unusable state.
                self.drop_transport();
                Err(err)
            }
            Err(_) => {
                self.drop_transport();
                Err(RconError::Timeout("timed out receiving packet".into()))
            }
        }
    }
}

/// Read one length-prefixed frame and decode its body.
async fn read_frame(stream: &mut TcpStream) -> Result<Packet> {
    let mut size_buf = [0u8; 4];
    stream.read_exact(&mut size_buf).await?;
    let size = i32::from_le_bytes(size_buf);

    if size < MIN_FRAME_SIZE as i32 || size > MAX_FRAME_SIZE as i32 {
        return Err(RconError::Protocol(format!("invalid frame size: {size}")));
    }

    let mut body = vec![0u8; size as usize];
    stream.read_exact(&mut body).await?;
    Packet::decode(&body)
}

/// First characters of a payload, for debug logs.
fn preview(payload: &str) -> &str {
    match payload.char_indices().nth(60) {
        Some((idx, _)) => &payload[..idx],
        None => payload,
    }
}
