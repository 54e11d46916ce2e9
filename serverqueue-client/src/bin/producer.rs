use anyhow::Result;
use clap::Parser;
use serverqueue_client::{ClientConfig, Producer};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "producer")]
#[command(about = "Run concurrent producers against a ServerQueue broker")]
struct Args {
    #[arg(long, default_value = "localhost")]
    host: String,

    #[arg(short, long, default_value_t = 50000)]
    port: u16,

    /// Number of concurrent producers
    #[arg(short = 'n', long, default_value_t = 5)]
    producers: usize,

    /// Items each producer sends before exiting; runs forever if omitted
    #[arg(short, long)]
    count: Option<u64>,

    /// Give up on an acknowledgement after this many milliseconds
    #[arg(long)]
    ack_timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let args = Args::parse();
    let mut config = ClientConfig::producer().host(args.host).port(args.port);
    if let Some(ms) = args.ack_timeout_ms {
        config = config.ack_timeout(Duration::from_millis(ms));
    }

    info!(
        "Starting {} producers against {}",
        args.producers,
        config.address()
    );

    let mut producers = JoinSet::new();
    for _ in 0..args.producers {
        producers.spawn(run_producer(config.clone(), args.count));
    }

    while let Some(joined) = producers.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Producer stopped: {:#}", e),
            Err(e) => error!("Producer task failed: {}", e),
        }
    }

    Ok(())
}

async fn run_producer(config: ClientConfig, count: Option<u64>) -> Result<()> {
    let mut producer = Producer::connect(config).await?;

    let mut sent = 0u64;
    while count.map_or(true, |limit| sent < limit) {
        let item = producer.produce().await?;
        info!("{} put {}", producer, item);
        sent += 1;
    }

    info!("{} finished after {} items", producer, sent);
    Ok(())
}
