use std::str::FromStr;
use std::sync::Arc;

use inotify::Inotify;
use tokio::sync::{OnceCell, mpsc};
use tokio::task::JoinHandle;

use super::actor::ControlLoop;
use super::commands::SensorError;
use super::handle::SensorHandle;
use super::pipeline;
use crate::broadcast::Subscription;
use crate::config::SensorConfig;
use crate::watch::{self, WatchSet};

/// Size of the buffer inotify events are read into.
const EVENT_BUFFER_SIZE: usize = 4096;
/// Lifecycle events queued between the notification pipeline and the control loop.
const EVENT_CHANNEL_CAPACITY: usize = 256;
/// Subscription requests queued for the control loop.
const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Whether [`LazySensor`] tries to start the sensor again after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootstrapPolicy {
    /// The first outcome is final; a failure is returned to every later caller.
    #[default]
    Once,
    /// A failed start is retried by the next caller.
    RetryOnNextCall,
}

impl FromStr for BootstrapPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "once" => Ok(Self::Once),
            "retry" => Ok(Self::RetryOnNextCall),
            other => Err(other.to_owned()),
        }
    }
}

/// A running OCI lifecycle sensor.
///
/// Owns the notification pipeline task and the control loop task. Construct one per process
/// and share [`SensorHandle`]s with whoever needs event streams.
#[derive(Debug)]
pub struct Sensor {
    handle: SensorHandle,
    pipeline: JoinHandle<()>,
    control_loop: JoinHandle<()>,
}

impl Sensor {
    /// Opens inotify, watches the container directory and every container already in it, and
    /// starts the pipeline and the control loop.
    ///
    /// Nothing is spawned unless every initial watch was registered.
    ///
    /// # Errors
    ///
    /// - [`watch::Error::Init`] if inotify cannot be initialized
    /// - [`watch::Error::AddWatch`] or [`watch::Error::ReadDir`] if the container directory
    ///   cannot be watched or listed
    pub async fn start(config: &SensorConfig) -> watch::Result<Self> {
        let inotify = Inotify::init().map_err(watch::Error::Init)?;
        let stream = inotify
            .into_event_stream(vec![0u8; EVENT_BUFFER_SIZE])
            .map_err(watch::Error::Init)?;

        let mut watches = WatchSet::new(config.container_dir(), stream.watches());
        watches.watch_existing().await?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        let pipeline = tokio::spawn(pipeline::run(
            stream,
            watches,
            event_tx,
            config.read_error_policy(),
        ));
        let control_loop = tokio::spawn(ControlLoop::new(command_rx, event_rx).run());

        log::info!(
            "Started OCI sensor for `{}`",
            config.container_dir().display()
        );

        Ok(Self {
            handle: SensorHandle::new(command_tx, config.subscribe_timeout()),
            pipeline,
            control_loop,
        })
    }

    /// Returns a handle that can be cloned and moved into other tasks.
    pub fn handle(&self) -> SensorHandle {
        self.handle.clone()
    }

    /// Returns a fresh, independent stream of the lifecycle events published from now on.
    ///
    /// # Errors
    ///
    /// See [`SensorHandle::subscribe`].
    pub async fn subscribe(&self) -> Result<Subscription, SensorError> {
        self.handle.subscribe().await
    }

    /// Stops watching the filesystem and waits until every outstanding [`SensorHandle`] is
    /// dropped.
    ///
    /// The control loop exits, and existing subscriptions end, once the last handle obtained
    /// from [`handle`](Sensor::handle) is gone. Drop those handles first, or bound the wait
    /// with [`tokio::time::timeout`].
    pub async fn shutdown(self) {
        self.pipeline.abort();
        drop(self.handle);
        if let Err(err) = self.control_loop.await {
            log::error!("OCI sensor control loop failed: {err}");
        }
    }
}

/// Starts a [`Sensor`] on the first subscription request.
///
/// What happens after a failed start is decided by the configured [`BootstrapPolicy`].
#[derive(Debug)]
pub struct LazySensor {
    config: SensorConfig,
    sensor: OnceCell<Result<Sensor, Arc<watch::Error>>>,
}

impl LazySensor {
    pub fn new(config: SensorConfig) -> Self {
        Self {
            config,
            sensor: OnceCell::new(),
        }
    }

    /// Returns a fresh, independent lifecycle event stream, starting the sensor if needed.
    ///
    /// Concurrent first calls start the sensor only once.
    ///
    /// # Errors
    ///
    /// - [`SensorError::Bootstrap`] if the sensor could not be started
    /// - see [`SensorHandle::subscribe`] for errors of a running sensor
    pub async fn subscribe(&self) -> Result<Subscription, SensorError> {
        let started = match self.config.bootstrap_policy() {
            BootstrapPolicy::Once => self.sensor.get_or_init(|| self.start()).await,
            BootstrapPolicy::RetryOnNextCall => self
                .sensor
                .get_or_try_init(|| async { self.start().await.map(Ok) })
                .await
                .map_err(SensorError::Bootstrap)?,
        };

        match started {
            Ok(sensor) => sensor.subscribe().await,
            Err(err) => Err(SensorError::Bootstrap(Arc::clone(err))),
        }
    }

    /// The running sensor, if it has been started successfully.
    pub fn get(&self) -> Option<&Sensor> {
        self.sensor.get().and_then(|started| started.as_ref().ok())
    }

    async fn start(&self) -> Result<Sensor, Arc<watch::Error>> {
        Sensor::start(&self.config).await.map_err(|err| {
            log::error!("Failed to start OCI sensor: {err}");
            Arc::new(err)
        })
    }
}
