mod buffer;
mod config;
mod flush;
mod report;

use anyhow::Result;
use buffer::ReadingBuffer;
use flush::report_and_flush;
use report::{ChipId, Reporter, SensorReport};
use tokio::signal;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("swarmon=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/node.toml".to_string());

    let config = config::NodeConfig::load(&config_path)?;
    tracing::info!(device_id = %config.device_id, "swarmon-node starting");

    let chip_id = ChipId::from(config.device_id.as_str());
    let reporter = Reporter::new(config.report_url(), config.request_timeout_secs)?;
    let mut buffer = ReadingBuffer::new(config.buffer_max_size);
    let mut tick = interval(Duration::from_secs(config.report_interval_secs));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        interval_secs = config.report_interval_secs,
        buffer_max = config.buffer_max_size,
        url = %config.report_url(),
        "Starting report loop"
    );

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let reading = SensorReport::simulate(chip_id.clone());
                report_and_flush(&reporter, &mut buffer, reading).await;
            }
            _ = signal::ctrl_c() => {
                tracing::info!(buffered = buffer.len(), "Shutting down gracefully");
                break;
            }
        }
    }

    Ok(())
}
