use std::fmt;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::connection::{Connection, ConnectionState};
use crate::{RconError, Result};

/// Default RCON port of a Minecraft server.
pub const DEFAULT_PORT: u16 = 25575;

/// Connection settings for an [`RconClient`].
#[derive(Clone)]
pub struct RconConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    /// Budget applied independently to the connect, handshake, and each
    /// send/receive step of a command.
    pub timeout: Duration,
    pub auto_reconnect: bool,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay: Duration,
}

impl RconConfig {
    pub fn new(host: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        RconConfig {
            host: host.into(),
            port,
            password: password.into(),
            timeout: Duration::from_secs(10),
            auto_reconnect: true,
            max_reconnect_attempts: 3,
            reconnect_delay: Duration::from_secs(5),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn auto_reconnect(mut self, auto_reconnect: bool) -> Self {
        self.auto_reconnect = auto_reconnect;
        self
    }

    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

impl fmt::Debug for RconConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RconConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("auto_reconnect", &self.auto_reconnect)
            .field("max_reconnect_attempts", &self.max_reconnect_attempts)
            .field("reconnect_delay", &self.reconnect_delay)
            .finish()
    }
}

/// Asynchronous RCON client over one serialized connection.
///
/// The wire protocol has no multiplexing strong enough to keep several
/// requests in flight on one connection, so every operation funnels through
/// a single lock: callers may share the client freely, but at most one
/// request is ever outstanding.
pub struct RconClient {
    inner: Mutex<Connection>,
}

impl RconClient {
    /// Create a client. No connection is made until [`connect`](Self::connect)
    /// or the first [`execute`](Self::execute) with reconnection enabled.
    pub fn new(config: RconConfig) -> Self {
        RconClient {
            inner: Mutex::new(Connection::new(config)),
        }
    }

    /// Connect and authenticate. A no-op when already connected.
    pub async fn connect(&self) -> Result<()> {
        self.inner.lock().await.connect().await
    }

    /// Close the connection. A later [`connect`](Self::connect) starts fresh.
    pub async fn disconnect(&self) {
        self.inner.lock().await.disconnect();
    }

    /// Whether the client currently holds an authenticated connection.
    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.is_ready()
    }

    /// Current connection state, mainly for diagnostics.
    pub async fn state(&self) -> ConnectionState {
        self.inner.lock().await.state()
    }

    /// Execute one console command and return the server's text response.
    ///
    /// Callers are expected to hand in a non-empty, validated command (see
    /// [`validate_command`](crate::validate_command)); no content filtering
    /// happens here.
    ///
    /// The response is assumed to fit a single frame, which holds for the
    /// overwhelming majority of server responses. If the connection drops or
    /// times out after the command was dispatched, the command is retried
    /// exactly once after a successful reconnection: the server may already
    /// have applied it, and at-most-once retry is the accepted trade against
    /// running it twice.
    pub async fn execute(&self, command: &str) -> Result<String> {
        let mut conn = self.inner.lock().await;

        if !conn.is_ready() {
            if conn.auto_reconnect() {
                conn.reconnect().await?;
            } else {
                return Err(RconError::Connection("not connected to server".into()));
            }
        }

        let first_try = conn.exec_command(command).await;
        match first_try {
            Err(err) if err.is_retryable() && conn.auto_reconnect() => {
                conn.reconnect().await?;
                conn.exec_command(command).await
            }
            result => result,
        }
    }
}
