//! Integration tests driving the client against a scripted mock server on an
//! ephemeral local port.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use minecraft_rcon_client::{
    connect, ConnectionState, RconClient, RconConfig, RconError,
};
use support::{accept_auth, frame, read_frame, EXEC_OR_AUTH_RESPONSE, RESPONSE_VALUE};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

fn test_config(port: u16, password: &str) -> RconConfig {
    RconConfig::new("127.0.0.1", port, password)
        .timeout(Duration::from_secs(2))
        .reconnect_delay(Duration::from_millis(10))
}

async fn bind() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

#[tokio::test]
async fn handshake_reaches_ready() {
    let (listener, port) = bind().await;
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        accept_auth(&mut stream, "secret123").await.unwrap();
        // Hold the socket open until the client is done with it.
        let _ = read_frame(&mut stream).await;
    });

    let client = RconClient::new(test_config(port, "secret123"));
    client.connect().await.unwrap();

    assert_eq!(client.state().await, ConnectionState::Ready);
    assert!(client.is_connected().await);
}

#[tokio::test]
async fn handshake_skips_empty_leading_response_value() {
    let (listener, port) = bind().await;
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let auth = read_frame(&mut stream).await.unwrap();
        // The documented quirk: one empty ResponseValue frame ahead of the
        // real auth response.
        stream.write_all(&frame(0, RESPONSE_VALUE, "")).await.unwrap();
        stream
            .write_all(&frame(auth.request_id, EXEC_OR_AUTH_RESPONSE, ""))
            .await
            .unwrap();
        let _ = read_frame(&mut stream).await;
    });

    let client = RconClient::new(test_config(port, "secret123"));
    client.connect().await.unwrap();
    assert_eq!(client.state().await, ConnectionState::Ready);
}

#[tokio::test]
async fn rejected_password_is_not_retried() {
    let (listener, port) = bind().await;
    let accepted = Arc::new(AtomicUsize::new(0));
    let handler_accepted = accepted.clone();
    tokio::spawn(async move {
        loop {
            let (mut stream, _) = listener.accept().await.unwrap();
            handler_accepted.fetch_add(1, Ordering::SeqCst);
            let _ = accept_auth(&mut stream, "secret123").await;
        }
    });

    let client = RconClient::new(test_config(port, "wrong password"));
    let err = client.connect().await.unwrap_err();

    assert!(matches!(err, RconError::Authentication(_)), "got {err:?}");
    assert_eq!(client.state().await, ConnectionState::Disconnected);
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reconnect_attempts_are_bounded() {
    let (listener, port) = bind().await;
    let accepted = Arc::new(AtomicUsize::new(0));
    let handler_accepted = accepted.clone();
    tokio::spawn(async move {
        loop {
            // Accept and immediately hang up: the transport comes up but no
            // handshake ever completes.
            let (stream, _) = listener.accept().await.unwrap();
            handler_accepted.fetch_add(1, Ordering::SeqCst);
            drop(stream);
        }
    });

    let client =
        RconClient::new(test_config(port, "secret123").max_reconnect_attempts(2));
    let err = client.execute("list").await.unwrap_err();

    assert!(
        matches!(err, RconError::Connection(_)),
        "expected connection error, got {err:?}"
    );
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn execute_returns_the_server_payload() {
    let (listener, port) = bind().await;
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        assert!(accept_auth(&mut stream, "secret123").await.unwrap());

        let request = read_frame(&mut stream).await.unwrap();
        assert_eq!(request.kind, EXEC_OR_AUTH_RESPONSE);
        assert_eq!(request.payload, "list");
        stream
            .write_all(&frame(
                request.request_id,
                RESPONSE_VALUE,
                "There are 3 of a max of 20 players online: Alice, Bob, Carol",
            ))
            .await
            .unwrap();
        let _ = read_frame(&mut stream).await;
    });

    let client = connect(test_config(port, "secret123")).await.unwrap();
    let response = client.execute("list").await.unwrap();
    assert_eq!(
        response,
        "There are 3 of a max of 20 players online: Alice, Bob, Carol"
    );
}

#[tokio::test]
async fn list_players_parses_the_response() {
    let (listener, port) = bind().await;
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        assert!(accept_auth(&mut stream, "secret123").await.unwrap());

        let request = read_frame(&mut stream).await.unwrap();
        stream
            .write_all(&frame(
                request.request_id,
                RESPONSE_VALUE,
                "There are 2 of a max of 10 players online: Dave, Eve",
            ))
            .await
            .unwrap();
        let _ = read_frame(&mut stream).await;
    });

    let client = connect(test_config(port, "secret123")).await.unwrap();
    let list = client.list_players().await.unwrap();
    assert_eq!(list.online, 2);
    assert_eq!(list.max_players, 10);
    assert_eq!(list.names, ["Dave", "Eve"]);
}

#[tokio::test]
async fn recovers_after_mid_response_drop() {
    let (listener, port) = bind().await;
    tokio::spawn(async move {
        // First connection: handshake, then die partway through the
        // response frame.
        let (mut stream, _) = listener.accept().await.unwrap();
        assert!(accept_auth(&mut stream, "secret123").await.unwrap());
        let _ = read_frame(&mut stream).await.unwrap();
        let mut partial = frame(0, RESPONSE_VALUE, "interrupted");
        partial.truncate(9);
        stream.write_all(&partial).await.unwrap();
        drop(stream);

        // Second connection: behave.
        let (mut stream, _) = listener.accept().await.unwrap();
        assert!(accept_auth(&mut stream, "secret123").await.unwrap());
        let request = read_frame(&mut stream).await.unwrap();
        assert_eq!(request.payload, "ping");
        stream
            .write_all(&frame(request.request_id, RESPONSE_VALUE, "pong"))
            .await
            .unwrap();
        let _ = read_frame(&mut stream).await;
    });

    let client = connect(test_config(port, "secret123")).await.unwrap();
    let response = client.execute("ping").await.unwrap();
    assert_eq!(response, "pong");
}

#[tokio::test]
async fn oversized_frame_is_a_protocol_error() {
    let (listener, port) = bind().await;
    let accepted = Arc::new(AtomicUsize::new(0));
    let handler_accepted = accepted.clone();
    tokio::spawn(async move {
        loop {
            let (mut stream, _) = listener.accept().await.unwrap();
            handler_accepted.fetch_add(1, Ordering::SeqCst);
            assert!(accept_auth(&mut stream, "secret123").await.unwrap());
            let _ = read_frame(&mut stream).await.unwrap();
            // Advertise a body far beyond the protocol ceiling.
            stream.write_all(&5000i32.to_le_bytes()).await.unwrap();
            let _ = read_frame(&mut stream).await;
        }
    });

    let client = connect(test_config(port, "secret123")).await.unwrap();
    let err = client.execute("seed").await.unwrap_err();

    assert!(matches!(err, RconError::Protocol(_)), "got {err:?}");
    // Protocol violations are not retryable: the first connection is the
    // only one the server ever saw.
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn mismatched_ids_are_discarded() {
    let (listener, port) = bind().await;
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        assert!(accept_auth(&mut stream, "secret123").await.unwrap());

        let request = read_frame(&mut stream).await.unwrap();
        // A stale frame first, then the real response.
        stream
            .write_all(&frame(request.request_id + 999, RESPONSE_VALUE, "stale"))
            .await
            .unwrap();
        stream
            .write_all(&frame(request.request_id, RESPONSE_VALUE, "fresh"))
            .await
            .unwrap();
        let _ = read_frame(&mut stream).await;
    });

    let client = connect(test_config(port, "secret123")).await.unwrap();
    assert_eq!(client.execute("whoami").await.unwrap(), "fresh");
}

#[tokio::test]
async fn execute_times_out_without_reconnect() {
    let (listener, port) = bind().await;
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        assert!(accept_auth(&mut stream, "secret123").await.unwrap());
        let _ = read_frame(&mut stream).await.unwrap();
        // Never answer.
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let config = test_config(port, "secret123")
        .timeout(Duration::from_millis(300))
        .auto_reconnect(false);
    let client = connect(config).await.unwrap();
    let err = client.execute("seed").await.unwrap_err();

    assert!(matches!(err, RconError::Timeout(_)), "got {err:?}");
    assert_eq!(client.state().await, ConnectionState::Disconnected);
}

#[tokio::test]
async fn concurrent_executes_do_not_interleave() {
    let (listener, port) = bind().await;
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        assert!(accept_auth(&mut stream, "secret123").await.unwrap());

        // Echo loop. read_frame fails loudly if two commands' bytes ever
        // interleave on the wire.
        while let Ok(request) = read_frame(&mut stream).await {
            assert!(
                request.payload == "say first caller speaking"
                    || request.payload == "say second caller speaking",
                "corrupted command frame: {:?}",
                request.payload
            );
            stream
                .write_all(&frame(
                    request.request_id,
                    RESPONSE_VALUE,
                    &format!("echo:{}", request.payload),
                ))
                .await
                .unwrap();
        }
    });

    let client = connect(test_config(port, "secret123")).await.unwrap();
    let (first, second) = tokio::join!(
        client.execute("say first caller speaking"),
        client.execute("say second caller speaking"),
    );

    assert_eq!(first.unwrap(), "echo:say first caller speaking");
    assert_eq!(second.unwrap(), "echo:say second caller speaking");
}
