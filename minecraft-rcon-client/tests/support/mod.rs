//! Scripted mock RCON server pieces shared by the integration tests. Frames
//! are built and parsed by hand here, independent of the library codec.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

pub const RESPONSE_VALUE: i32 = 0;
pub const EXEC_OR_AUTH_RESPONSE: i32 = 2;
pub const AUTH: i32 = 3;

/// Build a complete frame, leading size field included.
pub fn frame(request_id: i32, kind: i32, payload: &str) -> Vec<u8> {
    let body_len = 8 + payload.len() + 2;
    let mut buf = Vec::with_capacity(4 + body_len);
    buf.extend_from_slice(&(body_len as i32).to_le_bytes());
    buf.extend_from_slice(&request_id.to_le_bytes());
    buf.extend_from_slice(&kind.to_le_bytes());
    buf.extend_from_slice(payload.as_bytes());
    buf.extend_from_slice(&[0x00, 0x00]);
    buf
}

#[derive(Debug)]
pub struct InboundFrame {
    pub request_id: i32,
    pub kind: i32,
    pub payload: String,
}

/// Read one client frame off the socket.
pub async fn read_frame(stream: &mut TcpStream) -> std::io::Result<InboundFrame> {
    let mut size_buf = [0u8; 4];
    stream.read_exact(&mut size_buf).await?;
    let size = i32::from_le_bytes(size_buf) as usize;

    let mut body = vec![0u8; size];
    stream.read_exact(&mut body).await?;

    Ok(InboundFrame {
        request_id: i32::from_le_bytes(body[0..4].try_into().unwrap()),
        kind: i32::from_le_bytes(body[4..8].try_into().unwrap()),
        payload: String::from_utf8_lossy(&body[8..body.len() - 2]).into_owned(),
    })
}

/// Run the server side of the handshake. Replies with the echoed request ID
/// when the password matches, or the -1 rejection marker otherwise. Returns
/// whether authentication succeeded.
pub async fn accept_auth(stream: &mut TcpStream, password: &str) -> std::io::Result<bool> {
    let auth = read_frame(stream).await?;
    assert_eq!(auth.kind, AUTH, "first client frame must be an auth packet");

    if auth.payload == password {
        stream
            .write_all(&frame(auth.request_id, EXEC_OR_AUTH_RESPONSE, ""))
            .await?;
        Ok(true)
    } else {
        stream
            .write_all(&frame(-1, EXEC_OR_AUTH_RESPONSE, ""))
            .await?;
        Ok(false)
    }
}
