//! OCI Lifecycle Sensor: observes container lifecycle transitions by watching the container
//! runtime's state directory with inotify.
//!
//! The runtime creates one directory per container below its state root, named after the
//! container ID. It writes `config.json` into that directory when the container starts and
//! deletes it when the container stops. This library turns those filesystem mutations into a
//! stream of [`container::LifecycleEvent`]s that any number of subscribers can consume
//! independently.
//!
//! ```no_run
//! # use oci_lifecycle_sensor::{config::SensorConfig, sensor::Sensor};
//! # async fn doc() -> Result<(), Box<dyn std::error::Error>> {
//! let sensor = Sensor::start(&SensorConfig::from_env()?).await?;
//! let mut events = sensor.subscribe().await?;
//! while let Some(event) = events.recv().await {
//!     println!("{event}");
//! }
//! # Ok(())
//! # }
//! ```
pub mod broadcast;
pub mod classifier;
pub mod config;
pub mod container;
pub mod error;
pub mod fsutil;
pub mod sensor;
pub mod watch;

/// Runs the sensor and writes every lifecycle event to stdout as a JSON line.
///
/// Returns when Ctrl-C is received or the event stream ends.
///
/// # Errors
///
/// Possible errors include:
/// - Invalid `OCI_*` environment variables.
/// - Failure to initialize inotify or to watch the container directory.
/// - Failure to serialize an event.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::SensorConfig::from_env()?;
    log::debug!("Config: {:?}", config);

    let sensor = sensor::Sensor::start(&config).await?;
    let mut events = sensor.subscribe().await?;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    log::warn!("Lifecycle event stream ended");
                    break;
                };
                println!("{}", serde_json::to_string(&event)?);
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                log::info!("Received Ctrl-C, shutting down");
                break;
            }
        }
    }

    drop(events);
    sensor.shutdown().await;
    Ok(())
}
