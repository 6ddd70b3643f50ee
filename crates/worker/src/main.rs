//! offcached entry point.
//!
//! Boots the worker over a stdio control transport: control messages arrive
//! as JSON lines on stdin, replies go back as JSON lines on stdout.
//! Logging goes to stderr to avoid interfering with the protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

use offcache_client::{FetchClient, FetchConfig, Network};
use offcache_core::{AppConfig, CacheDb};
use offcache_worker::{ControlEnvelope, Event, Worker};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        version = %config.cache_version,
        db = %config.db_path.display(),
        "starting offcached"
    );

    let store = CacheDb::open(&config.db_path).await?;
    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from(&config))?);

    let mut worker = Worker::new(config, store, network)?;
    worker.bootstrap().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let message: serde_json::Value = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "dropping unparseable control line");
                continue;
            }
        };

        let (tx, rx) = oneshot::channel();
        let envelope = ControlEnvelope { message, reply: Some(tx) };
        worker.dispatch(Event::Message(envelope)).await?;

        // Message types without a reply drop the sender; only write a line
        // when one came back.
        if let Ok(reply) = rx.await {
            let mut out = serde_json::to_vec(&reply)?;
            out.push(b'\n');
            stdout.write_all(&out).await?;
            stdout.flush().await?;
        }

        // SKIP_WAITING takes effect between messages.
        worker.activate_if_requested().await?;
    }

    tracing::info!("stdin closed; shutting down");
    Ok(())
}
