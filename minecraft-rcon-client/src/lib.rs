//! This crate provides a high-level cross-platform implementation of an RCON client for
//! Minecraft servers, speaking the Source RCON protocol: length-prefixed binary frames
//! over a single persistent TCP connection, with a mandatory password handshake before
//! any command may be issued.
//!
//! The client is entirely asynchronous and requires a [Tokio](https://tokio.rs/) runtime.
//! It serializes all callers through one connection, reconnects within a configurable
//! bound when the transport drops, and retries an interrupted command at most once.
//!
//! To connect to an RCON server and create a client instance, use the [`connect`]
//! function, or build an [`RconClient`] and call [`RconClient::connect`] yourself.
//!
//! # Example
//! ```rust,no_run
//! use minecraft_rcon_client::{connect, RconConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RconConfig::new("localhost", 25575, "password123");
//!     let client = connect(config)
//!         .await
//!         .unwrap();
//!
//!     let response = client.execute("list").await.unwrap();
//!     println!("> {}", response);
//!
//!     client.disconnect().await;
//! }
//! ```

mod client;
mod commands;
mod connection;
mod packet;
mod validate;

/// Error type for RCON operations.
///
/// The four kinds form a closed taxonomy: callers can rely on an
/// authentication rejection never surfacing as a retryable connection
/// failure, and vice versa.
#[derive(Debug, thiserror::Error)]
pub enum RconError {
    /// The transport could not be established, failed during use, or every
    /// reconnection attempt was exhausted.
    #[error("connection error: {0}")]
    Connection(String),

    /// The server rejected the configured password, or the handshake
    /// response did not correlate with the request that started it.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// A connect, handshake, or command exchange exceeded its time budget.
    #[error("timed out: {0}")]
    Timeout(String),

    /// An inbound frame violated the size or structural invariants.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// [`Result`] alias for [`RconError`].
pub type Result<T> = std::result::Result<T, RconError>;

impl From<std::io::Error> for RconError {
    fn from(err: std::io::Error) -> Self {
        RconError::Connection(err.to_string())
    }
}

impl RconError {
    /// True for failures that tear the transport down and may clear up on a
    /// fresh connection. Authentication rejections would only repeat, and
    /// protocol violations indicate lost framing, so neither is retryable.
    pub(crate) fn is_retryable(&self) -> bool {
        matches!(self, RconError::Connection(_) | RconError::Timeout(_))
    }
}

pub use self::client::{RconClient, RconConfig, DEFAULT_PORT};
pub use self::commands::PlayerList;
pub use self::connection::ConnectionState;
pub use self::packet::{Packet, PacketKind, MAX_FRAME_SIZE, MIN_FRAME_SIZE};
pub use self::validate::{
    is_valid_username, sanitize_text, validate_command, InvalidInput, MAX_COMMAND_LEN,
};

/// Asynchronously connect to an RCON server and authenticate.
///
/// This function will attempt to connect to the RCON server described by
/// `config` and complete the password handshake. On success the returned
/// [`RconClient`] is ready to execute commands.
///
/// # Example
/// ```rust,no_run
/// use minecraft_rcon_client::{connect, RconConfig};
///
/// #[tokio::main]
/// async fn main() {
///     let client = connect(RconConfig::new("localhost", 25575, "password123"))
///         .await
///         .unwrap();
///
///     client.execute("save-all").await.unwrap();
/// }
/// ```
pub async fn connect(config: RconConfig) -> Result<RconClient> {
    let client = RconClient::new(config);
    client.connect().await?;
    Ok(client)
}
