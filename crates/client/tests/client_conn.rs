use std::time::Duration;

use bytes::{Bytes, BytesMut};
use http::Request;
use http_body_util::{BodyExt, Empty, Full};
use micro_client::connection::{Builder, ClientConn};
use micro_client::protocol::ClientError;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};
use tokio_util::sync::CancellationToken;

fn get(path: &str) -> Request<Empty<Bytes>> {
    Request::get(format!("http://example.com{path}")).body(Empty::new()).unwrap()
}

/// Reads one bodyless request head off the server side.
async fn read_head(server: &mut DuplexStream) -> String {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        server.read_exact(&mut byte).await.unwrap();
        head.push(byte[0]);
    }
    String::from_utf8(head).unwrap()
}

/// Waits until the connection records an error.
async fn sticky_error(conn: &ClientConn<DuplexStream>) -> ClientError {
    for _ in 0..200 {
        if let Err(e) = conn.ping() {
            return e;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("connection never recorded an error");
}

#[tokio::test]
async fn drained_body_keeps_connection_usable() {
    let (client, mut server) = duplex(4096);
    let conn = ClientConn::new(client);

    let (response, head) = tokio::join!(conn.send_request(get("/first")), async {
        let head = read_head(&mut server).await;
        server.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello").await.unwrap();
        head
    });
    assert!(head.starts_with("GET /first HTTP/1.1\r\n"));

    let response = response.unwrap();
    assert_eq!(response.status(), 200);
    assert!(conn.is_body_reading());
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, Bytes::from_static(b"hello"));
    assert!(!conn.is_body_reading());

    let (response, head) = tokio::join!(conn.send_request(get("/second")), async {
        let head = read_head(&mut server).await;
        server.write_all(b"HTTP/1.1 201 Created\r\nContent-Length: 6\r\n\r\nsecond").await.unwrap();
        head
    });
    assert!(head.starts_with("GET /second HTTP/1.1\r\n"));

    let response = response.unwrap();
    assert_eq!(response.status(), 201);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, Bytes::from_static(b"second"));
    conn.ping().unwrap();
}

#[tokio::test]
async fn abandoned_body_leaves_data_in_buffer() {
    let (client, mut server) = duplex(4096);
    let conn = ClientConn::new(client);

    let (response, _) = tokio::join!(conn.send_request(get("/")), async {
        read_head(&mut server).await;
        server.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhe").await.unwrap();
    });

    let mut body = response.unwrap().into_body();
    let frame = body.frame().await.unwrap().unwrap();
    assert_eq!(frame.into_data().unwrap(), Bytes::from_static(b"he"));
    drop(body);

    assert!(!conn.is_body_reading());
    assert!(matches!(conn.write(get("/")).await, Err(ClientError::DataLeftInBuffer)));
    assert!(matches!(conn.ping(), Err(ClientError::DataLeftInBuffer)));
}

#[tokio::test]
async fn pending_body_refuses_next_request() {
    let (client, mut server) = duplex(4096);
    let conn = ClientConn::new(client);

    let (response, _) = tokio::join!(conn.send_request(get("/")), async {
        read_head(&mut server).await;
        server.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello").await.unwrap();
    });
    let response = response.unwrap();

    assert!(matches!(conn.write(get("/")).await, Err(ClientError::BodyStillPending)));
    // refusing the request doesn't poison the connection
    conn.ping().unwrap();

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, Bytes::from_static(b"hello"));
    conn.write(get("/next")).await.unwrap();
    assert!(read_head(&mut server).await.starts_with("GET /next "));
}

#[tokio::test]
async fn canceled_read_poisons_connection() {
    let (client, mut server) = duplex(4096);
    let conn = ClientConn::new(client);

    let cancel = CancellationToken::new();
    let mut request = get("/slow");
    request.extensions_mut().insert(cancel.clone());
    cancel.cancel();

    let result = conn.send_request(request).await;
    assert!(matches!(result, Err(ClientError::Canceled)));
    assert!(read_head(&mut server).await.starts_with("GET /slow "));

    for _ in 0..3 {
        assert!(matches!(conn.ping(), Err(ClientError::Canceled)));
    }
    assert!(matches!(conn.write(get("/")).await, Err(ClientError::Canceled)));
}

#[tokio::test]
async fn read_timeout_poisons_connection() {
    let (client, mut server) = duplex(4096);
    let conn = Builder::new().read_timeout(Duration::from_millis(20)).build(client);

    let result = conn.send_request(get("/")).await;
    assert!(matches!(result, Err(ClientError::TimedOut)));
    read_head(&mut server).await;
    assert!(matches!(conn.ping(), Err(ClientError::TimedOut)));
}

#[tokio::test]
async fn bodyless_response_is_not_published() {
    let (client, mut server) = duplex(4096);
    let conn = ClientConn::new(client);

    conn.write(get("/")).await.unwrap();
    read_head(&mut server).await;
    server.write_all(b"HTTP/1.1 204 No Content\r\n\r\n").await.unwrap();

    let read = tokio::time::timeout(Duration::from_millis(50), conn.read(&CancellationToken::new())).await;
    assert!(read.is_err(), "bodyless response was handed out");

    // the connection itself stays usable
    assert!(!conn.is_body_reading());
    conn.ping().unwrap();

    let (response, _) = tokio::join!(conn.send_request(get("/next")), async {
        read_head(&mut server).await;
        server.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok").await.unwrap();
    });
    let body = response.unwrap().into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, Bytes::from_static(b"ok"));
}

#[tokio::test]
async fn chunked_body() {
    let (client, mut server) = duplex(4096);
    let conn = ClientConn::new(client);

    let (response, _) = tokio::join!(conn.send_request(get("/")), async {
        read_head(&mut server).await;
        server
            .write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n")
            .await
            .unwrap();
    });

    let response = response.unwrap();
    assert_eq!(response.headers()["transfer-encoding"], "chunked");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, Bytes::from_static(b"hello world"));
    conn.ping().unwrap();
}

#[tokio::test]
async fn close_delimited_body_ends_the_connection() {
    let (client, mut server) = duplex(4096);
    let conn = ClientConn::new(client);

    let (response, _) = tokio::join!(conn.send_request(get("/")), async {
        read_head(&mut server).await;
        server.write_all(b"HTTP/1.1 200 OK\r\n\r\nuntil the end").await.unwrap();
        server.shutdown().await.unwrap();
    });

    let body = response.unwrap().into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, Bytes::from_static(b"until the end"));

    assert!(matches!(conn.ping(), Err(ClientError::ServerClosed)));
    assert!(matches!(conn.write(get("/")).await, Err(ClientError::ServerClosed)));
}

#[tokio::test]
async fn server_eof_is_recorded() {
    let (client, server) = duplex(4096);
    let conn = ClientConn::new(client);

    drop(server);

    assert!(matches!(sticky_error(&conn).await, ClientError::ServerClosed));
}

#[tokio::test]
async fn server_closing_after_response() {
    let (client, mut server) = duplex(4096);
    let conn = ClientConn::new(client);

    let (response, _) = tokio::join!(conn.send_request(get("/")), async {
        read_head(&mut server).await;
        server.write_all(b"HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 3\r\n\r\nbye").await.unwrap();
    });

    // the error is recorded before the response is handed out
    assert!(matches!(conn.ping(), Err(ClientError::ServerClosed)));
    let body = response.unwrap().into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, Bytes::from_static(b"bye"));
}

#[tokio::test]
async fn informational_response_ends_the_connection() {
    let (client, mut server) = duplex(4096);
    let conn = ClientConn::new(client);

    let (response, _) = tokio::join!(conn.send_request(get("/")), async {
        read_head(&mut server).await;
        server.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await.unwrap();
    });

    assert!(matches!(response, Err(ClientError::ServerClosed)));
}

#[tokio::test]
async fn malformed_response_is_recorded() {
    let (client, mut server) = duplex(4096);
    let conn = ClientConn::new(client);

    let (response, _) = tokio::join!(conn.send_request(get("/")), async {
        read_head(&mut server).await;
        server.write_all(b"NOT HTTP AT ALL\r\n\r\n").await.unwrap();
    });

    assert!(matches!(response, Err(ClientError::Parse { .. })));
    assert!(matches!(conn.ping(), Err(ClientError::Parse { .. })));
}

#[tokio::test]
async fn closing_request_is_the_final_one() {
    let (client, mut server) = duplex(4096);
    let conn = ClientConn::new(client);

    let request = Request::get("http://example.com/").header("connection", "close").body(Empty::<Bytes>::new()).unwrap();
    conn.write(request).await.unwrap();
    let head = read_head(&mut server).await;
    assert!(head.contains("connection: close\r\n"));

    assert!(matches!(conn.write(get("/")).await, Err(ClientError::FinalRequest)));
    assert!(matches!(conn.ping(), Err(ClientError::FinalRequest)));
}

#[tokio::test]
async fn invalid_request_poisons_write_side() {
    let (client, _server) = duplex(4096);
    let conn = ClientConn::new(client);

    let request = Request::get("/no-host").body(Empty::<Bytes>::new()).unwrap();
    assert!(matches!(conn.write(request).await, Err(ClientError::Send { .. })));
    assert!(matches!(conn.ping(), Err(ClientError::Send { .. })));
}

#[tokio::test]
async fn request_body_is_framed() {
    let (client, mut server) = duplex(4096);
    let conn = ClientConn::new(client);

    let request = Request::post("http://example.com/submit").body(Full::new(Bytes::from_static(b"payload"))).unwrap();
    conn.write(request).await.unwrap();

    let head = read_head(&mut server).await;
    assert!(head.starts_with("POST /submit HTTP/1.1\r\n"));
    assert!(head.contains("content-length: 7\r\n"));

    let mut body = [0u8; 7];
    server.read_exact(&mut body).await.unwrap();
    assert_eq!(&body, b"payload");
}

#[tokio::test]
async fn proxy_connection_writes_absolute_targets() {
    let (client, mut server) = duplex(4096);
    let conn = ClientConn::proxy(client);

    conn.write(get("/path?q=1")).await.unwrap();
    let head = read_head(&mut server).await;
    assert!(head.starts_with("GET http://example.com/path?q=1 HTTP/1.1\r\n"), "{head}");
}

#[tokio::test]
async fn buffered_bytes_are_read_first() {
    let (client, mut server) = duplex(4096);
    let buffered = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 8\r\n\r\nbuffered"[..]);
    let conn = ClientConn::with_buffer(client, buffered);

    let response = conn.send_request(get("/")).await.unwrap();
    read_head(&mut server).await;
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, Bytes::from_static(b"buffered"));
}

#[tokio::test]
async fn hijack_hands_back_the_transport() {
    let (client, mut server) = duplex(4096);
    let conn = ClientConn::new(client);

    server.write_all(b"early bytes").await.unwrap();

    let (mut io, buffered) = conn.hijack().await.unwrap();
    assert!(conn.hijack().await.is_none());
    assert!(matches!(conn.ping(), Err(ClientError::Closed)));
    assert!(matches!(conn.write(get("/")).await, Err(ClientError::Closed)));

    // whatever the read loop already took off the wire comes back buffered
    let mut received = buffered.to_vec();
    while received.len() < b"early bytes".len() {
        let mut chunk = [0u8; 32];
        let read = io.read(&mut chunk).await.unwrap();
        received.extend_from_slice(&chunk[..read]);
    }
    assert_eq!(received, b"early bytes");

    io.write_all(b"raw").await.unwrap();
    let mut raw = [0u8; 3];
    server.read_exact(&mut raw).await.unwrap();
    assert_eq!(&raw, b"raw");
}

#[tokio::test]
async fn hijack_while_body_is_outstanding() {
    let (client, mut server) = duplex(4096);
    let conn = ClientConn::new(client);

    let (response, _) = tokio::join!(conn.send_request(get("/")), async {
        read_head(&mut server).await;
        server.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhe").await.unwrap();
    });
    let mut body = response.unwrap().into_body();
    let frame = body.frame().await.unwrap().unwrap();
    assert_eq!(frame.into_data().unwrap(), Bytes::from_static(b"he"));
    assert!(conn.is_body_reading());

    assert!(conn.hijack().await.is_some());
    assert!(!conn.is_body_reading());
    assert!(matches!(conn.ping(), Err(ClientError::Closed)));

    // the body no longer belongs to the connection
    drop(body);
    assert!(matches!(conn.ping(), Err(ClientError::Closed)));
}

#[tokio::test]
async fn close_while_body_is_outstanding() {
    let (client, mut server) = duplex(4096);
    let conn = ClientConn::new(client);

    let (response, _) = tokio::join!(conn.send_request(get("/")), async {
        read_head(&mut server).await;
        server.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello").await.unwrap();
    });
    let body = response.unwrap().into_body();

    conn.close().await.unwrap();
    assert!(!conn.is_body_reading());
    assert!(matches!(conn.ping(), Err(ClientError::Closed)));

    // the read loop is gone, so the body can't be read any more
    assert!(body.collect().await.is_err());
    assert!(matches!(conn.ping(), Err(ClientError::Closed)));
}

#[tokio::test]
async fn close_shuts_the_transport_down() {
    let (client, mut server) = duplex(4096);
    let conn = ClientConn::new(client);

    conn.close().await.unwrap();
    assert!(matches!(conn.ping(), Err(ClientError::Closed)));

    let mut buf = [0u8; 8];
    assert_eq!(server.read(&mut buf).await.unwrap(), 0);

    // closing twice is fine
    conn.close().await.unwrap();
}
