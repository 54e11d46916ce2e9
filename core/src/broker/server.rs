use super::{serve_connection, ConnectionHandler, ConsumerHandler, ProducerHandler, Shutdown};
use crate::{
    config::BrokerConfig, item::Item, metrics::MetricsRegistry, protocol::Role,
    queue::BoundedQueue, Result, ServerQueueError,
};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};

pub struct BrokerServer {
    config: BrokerConfig,
    queue: Arc<BoundedQueue<Item>>,
    metrics: Arc<MetricsRegistry>,
    // One id per accepted connection, across both listeners
    next_connection_id: Arc<AtomicU64>,
    // Graceful shutdown coordination
    shutdown_tx: watch::Sender<bool>,
}

/// Everything an accept loop hands to the handlers it spawns
#[derive(Clone)]
struct ListenerContext {
    queue: Arc<BoundedQueue<Item>>,
    metrics: Arc<MetricsRegistry>,
    next_connection_id: Arc<AtomicU64>,
    shutdown: Shutdown,
}

impl BrokerServer {
    pub fn new(config: BrokerConfig) -> Result<Self> {
        config.validate()?;

        let queue = Arc::new(BoundedQueue::new(config.capacity));
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            queue,
            metrics: Arc::new(MetricsRegistry::new()),
            next_connection_id: Arc::new(AtomicU64::new(0)),
            shutdown_tx,
        })
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<BoundedQueue<Item>> {
        &self.queue
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Stop accepting and interrupt every handler's pending read, put or take.
    pub fn shutdown(&self) {
        info!("Initiating shutdown...");
        self.shutdown_tx.send_replace(true);
        self.queue.close();
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Bind both listeners and spawn their accept loops.
    ///
    /// The listeners are bound independently: if one endpoint cannot be
    /// opened the other still serves, and the failure is kept in
    /// [`RunningBroker::bind_errors`]. Fails only when neither binds.
    pub async fn start(&self) -> Result<RunningBroker> {
        let context = ListenerContext {
            queue: Arc::clone(&self.queue),
            metrics: Arc::clone(&self.metrics),
            next_connection_id: Arc::clone(&self.next_connection_id),
            shutdown: Shutdown::new(self.shutdown_tx.subscribe()),
        };

        let mut listeners = JoinSet::new();
        let mut bind_errors = Vec::new();

        let producer_addr = match bind(Role::Producer, &self.config.producer_addr()).await {
            Ok((listener, addr)) => {
                listeners.spawn(accept_loop::<ProducerHandler>(listener, context.clone()));
                Some(addr)
            }
            Err(e) => {
                error!("{}", e);
                bind_errors.push(e);
                None
            }
        };

        let consumer_addr = match bind(Role::Consumer, &self.config.consumer_addr()).await {
            Ok((listener, addr)) => {
                listeners.spawn(accept_loop::<ConsumerHandler>(listener, context.clone()));
                Some(addr)
            }
            Err(e) => {
                error!("{}", e);
                bind_errors.push(e);
                None
            }
        };

        if listeners.is_empty() {
            return Err(bind_errors
                .into_iter()
                .next()
                .unwrap_or_else(|| ServerQueueError::Config("no listener bound".to_string())));
        }

        if self.config.metrics_interval_secs > 0 {
            tokio::spawn(report_metrics(
                Duration::from_secs(self.config.metrics_interval_secs),
                context,
            ));
        }

        info!(
            "ServerQueue broker started (capacity: {}, producers: {:?}, consumers: {:?})",
            self.queue.capacity(),
            producer_addr,
            consumer_addr
        );

        Ok(RunningBroker {
            producer_addr,
            consumer_addr,
            listeners,
            bind_errors,
        })
    }

    /// Start the broker and serve until both accept loops have ended.
    pub async fn run(&self) -> Result<()> {
        self.start().await?.wait().await
    }
}

impl Drop for BrokerServer {
    fn drop(&mut self) {
        self.queue.close();
    }
}

/// Handle to a started broker's accept loops.
///
/// Dropping it aborts the accept loops; connections already being served
/// keep running until they end or the broker shuts down.
#[derive(Debug)]
pub struct RunningBroker {
    producer_addr: Option<SocketAddr>,
    consumer_addr: Option<SocketAddr>,
    listeners: JoinSet<Result<()>>,
    bind_errors: Vec<ServerQueueError>,
}

impl RunningBroker {
    /// Bound producer endpoint, if it could be opened
    pub fn producer_addr(&self) -> Option<SocketAddr> {
        self.producer_addr
    }

    /// Bound consumer endpoint, if it could be opened
    pub fn consumer_addr(&self) -> Option<SocketAddr> {
        self.consumer_addr
    }

    pub fn bind_errors(&self) -> &[ServerQueueError] {
        &self.bind_errors
    }

    /// Wait for both accept loops to finish.
    ///
    /// Returns the first listener failure, if any.
    pub async fn wait(mut self) -> Result<()> {
        let mut outcome = Ok(());
        while let Some(joined) = self.listeners.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if outcome.is_ok() {
                        outcome = Err(e);
                    }
                }
                Err(e) => error!("Listener task failed: {}", e),
            }
        }
        outcome
    }
}

async fn bind(role: Role, addr: &str) -> Result<(TcpListener, SocketAddr)> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerQueueError::ListenerBind {
            role,
            addr: addr.to_string(),
            source,
        })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| ServerQueueError::ListenerBind {
            role,
            addr: addr.to_string(),
            source,
        })?;
    Ok((listener, local_addr))
}

/// Accept connections for one role until shutdown or a listener failure.
async fn accept_loop<H: ConnectionHandler>(
    listener: TcpListener,
    mut context: ListenerContext,
) -> Result<()> {
    info!(
        "{} listener accepting on {:?}",
        H::ROLE,
        listener.local_addr().ok()
    );

    loop {
        let (stream, peer_addr) = tokio::select! {
            biased;
            _ = context.shutdown.recv() => {
                info!("{} listener stopped", H::ROLE);
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                // The peer gave up before we got to it; the listener is fine
                Err(e) if matches!(e.kind(), ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset) => {
                    warn!("{} connection aborted during accept: {}", H::ROLE, e);
                    continue;
                }
                Err(e) => {
                    error!("{} listener failed: {}", H::ROLE, e);
                    return Err(ServerQueueError::ConnectionIo(e));
                }
            },
        };

        let connection_id = context.next_connection_id.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = optimize_client_socket(&stream) {
            warn!("Failed to tune socket for {}: {}", peer_addr, e);
        }

        let handler = H::new(
            Arc::clone(&context.queue),
            Arc::clone(&context.metrics),
            context.shutdown.clone(),
        );
        let metrics = Arc::clone(&context.metrics);
        let span = info_span!("connection", id = connection_id, role = %H::ROLE, peer = %peer_addr);

        tokio::spawn(
            async move {
                info!("{} connected", H::ROLE);
                // Outcome already logged by serve_connection
                let _ = serve_connection(handler, stream, metrics).await;
            }
            .instrument(span),
        );
    }
}

/// Low-latency settings for item-sized frames
fn optimize_client_socket(stream: &TcpStream) -> std::io::Result<()> {
    use socket2::SockRef;

    let socket_ref = SockRef::from(stream);

    // Every frame is tiny and latency-bound
    socket_ref.set_nodelay(true)?;

    // Notice peers that vanished while their handler sits in put/take
    socket_ref.set_keepalive(true)?;

    Ok(())
}

async fn report_metrics(period: Duration, mut context: ListenerContext) {
    let mut interval = tokio::time::interval(period);
    // first tick fires immediately
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = context.shutdown.recv() => break,
            _ = interval.tick() => {
                context
                    .metrics
                    .report(context.queue.len(), context.queue.capacity());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_binds_ephemeral_ports() {
        let server = BrokerServer::new(BrokerConfig::ephemeral(5)).unwrap();
        let running = server.start().await.unwrap();

        let producer = running.producer_addr().unwrap();
        let consumer = running.consumer_addr().unwrap();
        assert_ne!(producer.port(), 0);
        assert_ne!(producer, consumer);
        assert!(running.bind_errors().is_empty());
        assert_eq!(server.config().capacity, 5);
        assert!(!server.is_shutdown());

        server.shutdown();
        assert!(server.is_shutdown());
        assert!(server.queue().is_closed());
        tokio::time::timeout(Duration::from_secs(5), running.wait())
            .await
            .expect("accept loops should stop on shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn test_one_bind_failure_keeps_other_listener() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = occupied.local_addr().unwrap().port();

        let config = BrokerConfig {
            producer_port: port,
            ..BrokerConfig::ephemeral(5)
        };
        let server = BrokerServer::new(config).unwrap();
        let running = server.start().await.unwrap();

        assert!(running.producer_addr().is_none());
        assert!(running.consumer_addr().is_some());
        assert!(matches!(
            running.bind_errors(),
            [ServerQueueError::ListenerBind {
                role: Role::Producer,
                ..
            }]
        ));

        server.shutdown();
        running.wait().await.unwrap();
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = BrokerConfig {
            capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            BrokerServer::new(config),
            Err(ServerQueueError::Config(_))
        ));
    }
}
