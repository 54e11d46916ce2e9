//! Per-connection protocol loops.
//!
//! Every accepted socket is driven by [`serve_connection`]: it greets the
//! peer with a `Hello` frame for the endpoint's role, then repeats the
//! handler's [`ConnectionHandler::step`] until the peer disconnects, a
//! failure occurs, or the broker shuts down. The transport is dropped on
//! every exit path, which closes the socket.

use super::Shutdown;
use crate::{
    item::Item,
    metrics::MetricsRegistry,
    protocol::{Frame, Role, WireCodec},
    queue::BoundedQueue,
    Result, ServerQueueError,
};
use futures::{SinkExt, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// Outcome of one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep serving the connection
    Continue,
    /// The peer closed its side cleanly
    Disconnected,
}

/// Role-specific half of a connection's protocol.
pub trait ConnectionHandler: Send + 'static {
    /// Role announced in the `Hello` frame
    const ROLE: Role;

    fn new(
        queue: Arc<BoundedQueue<Item>>,
        metrics: Arc<MetricsRegistry>,
        shutdown: Shutdown,
    ) -> Self
    where
        Self: Sized;

    /// Run one request/reply (producer) or push (consumer) cycle.
    ///
    /// Every wait inside a step must also observe shutdown and return
    /// `Interrupted` when it fires.
    fn step<'a, S>(
        &'a mut self,
        framed: &'a mut Framed<S, WireCodec>,
    ) -> impl Future<Output = Result<Step>> + Send + 'a
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'a;
}

/// Receives items from a producer, queues them, acknowledges each one.
#[derive(Debug)]
pub struct ProducerHandler {
    queue: Arc<BoundedQueue<Item>>,
    metrics: Arc<MetricsRegistry>,
    shutdown: Shutdown,
}

impl ConnectionHandler for ProducerHandler {
    const ROLE: Role = Role::Producer;

    fn new(
        queue: Arc<BoundedQueue<Item>>,
        metrics: Arc<MetricsRegistry>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            queue,
            metrics,
            shutdown,
        }
    }

    fn step<'a, S>(
        &'a mut self,
        framed: &'a mut Framed<S, WireCodec>,
    ) -> impl Future<Output = Result<Step>> + Send + 'a
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'a,
    {
        async move {
            let inbound = tokio::select! {
                biased;
                _ = self.shutdown.recv() => return Err(ServerQueueError::Interrupted),
                inbound = framed.next() => inbound,
            };

            let item = match inbound {
                None => return Ok(Step::Disconnected),
                Some(Ok(Frame::Item(item))) => item,
                Some(Ok(other)) => {
                    return Err(ServerQueueError::protocol(format!(
                        "Unexpected {} frame from producer",
                        other.name()
                    )))
                }
                Some(Err(e)) => return Err(e),
            };

            // Blocks while the queue is full
            tokio::select! {
                biased;
                _ = self.shutdown.recv() => return Err(ServerQueueError::Interrupted),
                put = self.queue.put(item) => put?,
            }
            self.metrics.throughput.record_put();
            debug!("put {}", item);

            // A producer that stopped reading must not hold up shutdown
            tokio::select! {
                biased;
                _ = self.shutdown.recv() => return Err(ServerQueueError::Interrupted),
                sent = framed.send(Frame::Ack) => sent?,
            }
            self.metrics.throughput.record_ack();
            Ok(Step::Continue)
        }
    }
}

/// Pushes queued items to a consumer as they become available.
#[derive(Debug)]
pub struct ConsumerHandler {
    queue: Arc<BoundedQueue<Item>>,
    metrics: Arc<MetricsRegistry>,
    shutdown: Shutdown,
}

impl ConnectionHandler for ConsumerHandler {
    const ROLE: Role = Role::Consumer;

    fn new(
        queue: Arc<BoundedQueue<Item>>,
        metrics: Arc<MetricsRegistry>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            queue,
            metrics,
            shutdown,
        }
    }

    fn step<'a, S>(
        &'a mut self,
        framed: &'a mut Framed<S, WireCodec>,
    ) -> impl Future<Output = Result<Step>> + Send + 'a
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'a,
    {
        async move {
            // Consumers never write after connecting, so anything readable
            // here is either EOF or a protocol violation. Checking it before
            // the queue keeps a departed consumer from removing an item.
            let item = tokio::select! {
                biased;
                _ = self.shutdown.recv() => return Err(ServerQueueError::Interrupted),
                inbound = framed.next() => {
                    return match inbound {
                        None => Ok(Step::Disconnected),
                        Some(Ok(frame)) => Err(ServerQueueError::protocol(format!(
                            "Unexpected {} frame from consumer",
                            frame.name()
                        ))),
                        Some(Err(e)) => Err(e),
                    };
                }
                taken = self.queue.take() => taken?,
            };
            self.metrics.throughput.record_taken();
            debug!("took {}", item);

            tokio::select! {
                biased;
                _ = self.shutdown.recv() => return Err(ServerQueueError::Interrupted),
                sent = framed.send(Frame::Item(item)) => sent?,
            }
            Ok(Step::Continue)
        }
    }
}

/// Drive one accepted connection to completion.
///
/// Errors are logged and counted here; the returned result only tells the
/// caller how the connection ended.
pub async fn serve_connection<H, S>(
    mut handler: H,
    stream: S,
    metrics: Arc<MetricsRegistry>,
) -> Result<()>
where
    H: ConnectionHandler,
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    metrics.broker.connection_opened(H::ROLE);
    let mut framed = Framed::new(stream, WireCodec::new());
    let result = drive(&mut handler, &mut framed).await;
    metrics.broker.connection_closed(H::ROLE);

    match &result {
        Ok(()) => info!("{} disconnected", H::ROLE),
        Err(ServerQueueError::Interrupted) => {
            metrics.broker.interrupted();
            info!("{} connection interrupted by shutdown", H::ROLE);
        }
        Err(e @ ServerQueueError::Protocol(_)) => {
            metrics.broker.protocol_error();
            warn!("Closing {} connection: {}", H::ROLE, e);
        }
        Err(e) => {
            metrics.broker.io_error();
            warn!("Closing {} connection: {}", H::ROLE, e);
        }
    }

    // Closes the socket
    drop(framed);
    result
}

async fn drive<H, S>(handler: &mut H, framed: &mut Framed<S, WireCodec>) -> Result<()>
where
    H: ConnectionHandler,
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    framed.send(Frame::Hello { role: H::ROLE }).await?;

    loop {
        match handler.step(framed).await? {
            Step::Continue => continue,
            Step::Disconnected => return Ok(()),
        }
    }
}
