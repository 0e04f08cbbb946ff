use std::sync::Arc;

use actors::{SharedCredential, TrackerRegistry, TrackerOptions, spawn_tracker};
use progress_core::{SessionCredential, TrackerConfig};
use tracing_subscriber::EnvFilter;

mod simulated;

use simulated::SimulatedQueue;

const SESSION_KEY: &str = "demo-session";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = TrackerConfig::from_env()?;
    tracing::info!("Tracking a simulated batch with {:?}", config);

    let queue = Arc::new(
        SimulatedQueue::new(12, 2)
            .with_failure_every(5)
            .with_outage_on(3),
    );
    let credentials = SharedCredential::with(SessionCredential::new(SESSION_KEY));

    let registry = TrackerRegistry::new();
    let (tracker, join) =
        spawn_tracker(TrackerOptions::new(queue, credentials).with_config(config)).await?;
    registry.register(SESSION_KEY, tracker.clone());

    let mut subscription = tracker.subscribe();
    tracker.start().await?;

    let mut seen_progress = false;
    while let Some(status) = subscription.changed().await {
        match (&status.progress, &status.error) {
            (_, Some(error)) => tracing::warn!("Status error: {}", error),
            (Some(progress), None) => {
                seen_progress = true;
                let percent = progress.percent().unwrap_or(100.0);
                tracing::info!(active = status.active, "Progress {} ({:.0}%)", progress, percent);
            }
            (None, None) => {
                tracing::info!("Progress cleared");
                if seen_progress {
                    break;
                }
            }
        }
    }

    tracker.stop().await?;
    tracing::info!(metrics = ?tracker.metrics(), "Tracker finished");

    registry.shutdown_all();
    join.await?;
    Ok(())
}
