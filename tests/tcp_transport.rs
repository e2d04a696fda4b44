use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use broan::{
    DeviceAddress, DeviceError, DeviceSession, ExchangeStage, FrameCodecError, PowerState,
    TcpTransport, TcpTransportConfig, Transport, TransportError, WireCode,
};

const QUERY: [u8; 9] = [0xAA, 0x01, 0x02, 0x00, 0x00, 0x00, 0xA5, 0xA7, 0xF5];
const REPLY: [u8; 11] = [
    0xAA, 0x01, 0x02, 0x01, 0x02, 0x02, 0x19, 0x37, 0x00, 0x00, 0xF5,
];

async fn listener() -> anyhow::Result<(TcpListener, u16)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    Ok((listener, port))
}

fn transport(port: u16, io_timeout: Duration) -> TcpTransport {
    TcpTransport::new(
        TcpTransportConfig::builder()
            .host("127.0.0.1".to_string())
            .port(port)
            .connect_timeout(Duration::from_secs(2))
            .io_timeout(io_timeout)
            .build(),
    )
}

fn session(port: u16) -> DeviceSession {
    DeviceSession::new(
        DeviceAddress::new("127.0.0.1", port, WireCode::new(0x01)),
        Box::new(transport(port, Duration::from_secs(2))),
    )
}

/// Accepts one connection, checks the request, and replies in the given chunks.
fn serve_once(listener: TcpListener, chunks: Vec<Vec<u8>>) -> tokio::task::JoinHandle<Vec<u8>> {
    tokio::spawn(async move {
        let (mut stream, _peer) = listener.accept().await.expect("client should connect");
        let mut request = vec![0u8; QUERY.len()];
        stream
            .read_exact(&mut request)
            .await
            .expect("request should arrive");
        for chunk in chunks {
            stream.write_all(&chunk).await.expect("reply should be written");
            stream.flush().await.expect("reply should flush");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        request
    })
}

#[tokio::test]
async fn query_round_trip_over_tcp() -> anyhow::Result<()> {
    let (listener, port) = listener().await?;
    let server = serve_once(listener, vec![REPLY.to_vec()]);

    let state = session(port).query().await?;

    assert_eq!(QUERY.to_vec(), server.await?);
    assert_eq!(25, state.temperature());
    assert_eq!(55, state.humidity());
    assert_eq!(PowerState::On, state.power());
    Ok(())
}

#[tokio::test]
async fn fragmented_reply_is_reassembled() -> anyhow::Result<()> {
    let (listener, port) = listener().await?;
    let _server = serve_once(listener, vec![REPLY[..4].to_vec(), REPLY[4..].to_vec()]);

    let reply = transport(port, Duration::from_secs(2)).exchange(&QUERY).await?;

    assert_eq!(REPLY.to_vec(), reply);
    Ok(())
}

#[tokio::test]
async fn early_close_yields_short_response() -> anyhow::Result<()> {
    let (listener, port) = listener().await?;
    let _server = serve_once(listener, vec![REPLY[..5].to_vec()]);

    let result = session(port).query().await;

    assert_matches!(
        result,
        Err(DeviceError::Decode(FrameCodecError::ShortResponse {
            expected: 9,
            actual: 5
        }))
    );
    Ok(())
}

#[tokio::test]
async fn refused_connection_is_a_connect_error() -> anyhow::Result<()> {
    let (listener, port) = listener().await?;
    drop(listener);

    let result = transport(port, Duration::from_secs(2)).exchange(&QUERY).await;

    assert_matches!(result, Err(TransportError::Connect { .. }));
    Ok(())
}

#[tokio::test]
async fn silent_controller_times_out_on_receive() -> anyhow::Result<()> {
    let (listener, port) = listener().await?;
    let _server = tokio::spawn(async move {
        let (stream, _peer) = listener.accept().await.expect("client should connect");
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(stream);
    });

    let result = transport(port, Duration::from_millis(100))
        .exchange(&QUERY)
        .await;

    assert_matches!(
        result,
        Err(TransportError::Timeout {
            stage: ExchangeStage::Receive,
            ..
        })
    );
    Ok(())
}
