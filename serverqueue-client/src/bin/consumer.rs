use anyhow::Result;
use clap::Parser;
use serverqueue_client::{ClientConfig, Consumer};
use tokio::task::JoinSet;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "consumer")]
#[command(about = "Run concurrent consumers against a ServerQueue broker")]
struct Args {
    #[arg(long, default_value = "localhost")]
    host: String,

    #[arg(short, long, default_value_t = 50001)]
    port: u16,

    /// Number of concurrent consumers
    #[arg(short = 'n', long, default_value_t = 4)]
    consumers: usize,

    /// Items each consumer receives before exiting; runs until the broker
    /// disconnects if omitted
    #[arg(short, long)]
    count: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let args = Args::parse();
    let config = ClientConfig::consumer().host(args.host).port(args.port);

    info!(
        "Starting {} consumers against {}",
        args.consumers,
        config.address()
    );

    let mut consumers = JoinSet::new();
    for _ in 0..args.consumers {
        consumers.spawn(run_consumer(config.clone(), args.count));
    }

    while let Some(joined) = consumers.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Consumer stopped: {:#}", e),
            Err(e) => error!("Consumer task failed: {}", e),
        }
    }

    Ok(())
}

async fn run_consumer(config: ClientConfig, count: Option<u64>) -> Result<()> {
    let mut consumer = Consumer::connect(config).await?;

    let mut received = 0u64;
    while count.map_or(true, |limit| received < limit) {
        match consumer.recv().await? {
            Some(item) => {
                info!("{} consumed {}", consumer, item);
                received += 1;
            }
            None => {
                info!("{} disconnected by broker", consumer);
                break;
            }
        }
    }

    info!("{} finished after {} items", consumer, received);
    Ok(())
}
