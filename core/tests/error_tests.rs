use futures::{SinkExt, StreamExt};
use serverqueue::{
    broker::{BrokerServer, RunningBroker},
    config::BrokerConfig,
    protocol::{Frame, WireCodec},
    Item, ServerQueueError,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;

const WAIT: Duration = Duration::from_secs(5);

async fn start_broker() -> (BrokerServer, RunningBroker) {
    let server = BrokerServer::new(BrokerConfig::ephemeral(5)).unwrap();
    let running = server.start().await.unwrap();
    (server, running)
}

async fn greeted(addr: SocketAddr) -> Framed<TcpStream, WireCodec> {
    let stream = TcpStream::connect(addr).await.unwrap();
    let mut conn = Framed::new(stream, WireCodec::new());
    assert!(matches!(
        timeout(WAIT, conn.next()).await.unwrap(),
        Some(Ok(Frame::Hello { .. }))
    ));
    conn
}

/// Send raw bytes and wait for the broker to hang up
async fn send_raw_expect_close(addr: SocketAddr, bytes: &[u8]) {
    let mut conn = greeted(addr).await;
    conn.get_mut().write_all(bytes).await.unwrap();
    let next = timeout(WAIT, conn.next()).await.unwrap();
    assert!(
        !matches!(next, Some(Ok(_))),
        "expected the broker to close the connection, got {:?}",
        next
    );
}

#[tokio::test]
async fn test_oversized_length_prefix_is_rejected() {
    let (server, running) = start_broker().await;
    send_raw_expect_close(running.producer_addr().unwrap(), &[0, 1, 0, 0, 1, 2]).await;
    assert_eq!(server.queue().len(), 0);
    server.shutdown();
}

#[tokio::test]
async fn test_unknown_protocol_version_is_rejected() {
    let (server, running) = start_broker().await;
    let mut frame = vec![0, 0, 0, 18, 9, 0x02];
    frame.extend_from_slice(Item::new().as_bytes());
    send_raw_expect_close(running.producer_addr().unwrap(), &frame).await;
    assert_eq!(server.queue().len(), 0);
    server.shutdown();
}

#[tokio::test]
async fn test_short_item_body_is_rejected() {
    let (server, running) = start_broker().await;
    send_raw_expect_close(running.producer_addr().unwrap(), &[0, 0, 0, 4, 1, 0x02, 7, 7]).await;
    assert_eq!(server.queue().len(), 0);
    server.shutdown();
}

#[tokio::test]
async fn test_truncated_frame_then_disconnect_queues_nothing() {
    let (server, running) = start_broker().await;
    let mut conn = greeted(running.producer_addr().unwrap()).await;

    // header promises 18 bytes, only 4 arrive before the peer leaves
    conn.get_mut()
        .write_all(&[0, 0, 0, 18, 1, 0x02, 1, 2])
        .await
        .unwrap();
    drop(conn);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.queue().len(), 0);

    // the listener is unaffected
    let mut healthy = greeted(running.producer_addr().unwrap()).await;
    healthy.send(Frame::Item(Item::new())).await.unwrap();
    assert_eq!(
        timeout(WAIT, healthy.next()).await.unwrap().unwrap().unwrap(),
        Frame::Ack
    );
    server.shutdown();
}

#[tokio::test]
async fn test_consumer_sending_frames_is_a_protocol_error() {
    let (server, running) = start_broker().await;
    let mut conn = greeted(running.consumer_addr().unwrap()).await;

    conn.send(Frame::Item(Item::new())).await.unwrap();
    let next = timeout(WAIT, conn.next()).await.unwrap();
    assert!(next.is_none() || matches!(next, Some(Err(_))));

    // consumer never receives anything, so nothing was taken
    assert_eq!(server.queue().len(), 0);
    server.shutdown();
}

#[tokio::test]
async fn test_both_ports_in_use_fails_start() {
    let (first, running) = start_broker().await;

    let config = BrokerConfig {
        producer_port: running.producer_addr().unwrap().port(),
        consumer_port: running.consumer_addr().unwrap().port(),
        ..BrokerConfig::ephemeral(5)
    };
    let second = BrokerServer::new(config).unwrap();
    let err = second.start().await.unwrap_err();
    assert!(matches!(err, ServerQueueError::ListenerBind { .. }));
    assert!(!err.is_connection_local());

    first.shutdown();
}
