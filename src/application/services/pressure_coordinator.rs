//! Sheds cache memory in response to pressure signals.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::domain::entities::{PressureLevel, PressureSignal};
use crate::domain::ports::{ImageTransport, MemoryProbe, usage_percent};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::image::{
    DEFAULT_RETENTION, DiskImageCache, FetchPipeline, MemoryImageCache, MemoryLimits,
};

const SIGNAL_CHANNEL_CAPACITY: usize = 16;

/// Thresholds and intervals for the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct PressureSettings {
    /// Disk records older than this are pruned.
    pub retention: Duration,
    /// Minimum time between prunes at low pressure.
    pub cleanup_interval: Duration,
    /// Usage percentage above which pressure is moderate.
    pub moderate_percent: f64,
    /// Usage percentage above which pressure is critical.
    pub critical_percent: f64,
    /// Self-check interval for the run loop. `None` disables ticking.
    pub check_interval: Option<Duration>,
}

impl PressureSettings {
    /// Builds settings from the application config.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            retention: config.cache.retention(),
            cleanup_interval: config.pressure.cleanup_interval(),
            moderate_percent: config.pressure.moderate_percent,
            critical_percent: config.pressure.critical_percent,
            check_interval: config.pressure.check_interval(),
        }
    }
}

impl Default for PressureSettings {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
            cleanup_interval: Duration::from_secs(60 * 60),
            moderate_percent: 60.0,
            critical_percent: 80.0,
            check_interval: Some(Duration::from_secs(60)),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    level: PressureLevel,
    last_prune: Option<Instant>,
}

/// Maps pressure signals to cleanup actions on both cache tiers.
///
/// Each critical signal halves the memory limits again. The limits the
/// memory tier had at construction are restored once pressure drops back
/// to low.
pub struct PressureCoordinator {
    memory: Arc<MemoryImageCache>,
    baseline: MemoryLimits,
    disk: Arc<DiskImageCache>,
    transport: Arc<dyn ImageTransport>,
    probe: Arc<dyn MemoryProbe>,
    settings: PressureSettings,
    state: Mutex<State>,
}

impl std::fmt::Debug for PressureCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PressureCoordinator")
            .field("settings", &self.settings)
            .field("level", &self.current_level())
            .finish_non_exhaustive()
    }
}

impl PressureCoordinator {
    /// Creates a coordinator over the pipeline's stores and transport.
    #[must_use]
    pub fn new(
        pipeline: &FetchPipeline,
        probe: Arc<dyn MemoryProbe>,
        settings: PressureSettings,
    ) -> Self {
        Self {
            baseline: pipeline.memory().limits(),
            memory: pipeline.memory().clone(),
            disk: pipeline.disk().clone(),
            transport: pipeline.transport().clone(),
            probe,
            settings,
            state: Mutex::new(State::default()),
        }
    }

    /// Returns the last level applied.
    #[must_use]
    pub fn current_level(&self) -> PressureLevel {
        self.state.lock().level
    }

    /// Maps a signal to the level it calls for.
    #[must_use]
    pub fn level_for(&self, signal: PressureSignal) -> PressureLevel {
        match signal {
            PressureSignal::MemoryWarning => PressureLevel::Critical,
            PressureSignal::EnteredBackground => PressureLevel::Moderate,
            PressureSignal::Level(level) => level,
            PressureSignal::Tick => {
                let percent = usage_percent(self.probe.as_ref());
                debug!(usage_percent = percent, "Sampled process memory");
                PressureLevel::from_usage_percent(
                    percent,
                    self.settings.moderate_percent,
                    self.settings.critical_percent,
                )
            }
        }
    }

    /// Handles one signal.
    pub async fn handle(&self, signal: PressureSignal) {
        let level = self.level_for(signal);
        self.apply(level).await;
    }

    /// Applies the cleanup actions for a level.
    pub async fn apply(&self, level: PressureLevel) {
        let previous = {
            let mut state = self.state.lock();
            std::mem::replace(&mut state.level, level)
        };
        if previous != level {
            info!(from = %previous, to = %level, "Memory pressure changed");
        }

        match level {
            PressureLevel::Low => {
                if previous != PressureLevel::Low && self.memory.limits() != self.baseline {
                    self.memory.set_limits(self.baseline);
                    info!(limits = ?self.baseline, "Restored memory cache limits");
                }
                if self.prune_due() {
                    self.prune().await;
                }
            }
            PressureLevel::Moderate => {
                self.transport.flush_response_cache();
                self.prune().await;
            }
            PressureLevel::Critical => {
                self.transport.flush_response_cache();
                self.prune().await;
                self.memory.shrink(2);
                self.memory.remove_all();
                self.disk.remove_all().await;
                info!(limits = ?self.memory.limits(), "Dropped all cached images");
            }
        }
    }

    fn prune_due(&self) -> bool {
        self.state
            .lock()
            .last_prune
            .is_none_or(|last| last.elapsed() >= self.settings.cleanup_interval)
    }

    async fn prune(&self) {
        let removed = self.disk.prune_older_than(self.settings.retention).await;
        self.state.lock().last_prune = Some(Instant::now());
        if removed > 0 {
            info!(removed, "Pruned stale disk cache records");
        }
    }

    /// Consumes signals until the channel closes, ticking itself when a
    /// check interval is configured.
    pub async fn run(self: Arc<Self>, mut signals: mpsc::Receiver<PressureSignal>) {
        let mut ticker = self.settings.check_interval.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

        loop {
            let tick = async {
                match ticker.as_mut() {
                    Some(interval) => {
                        interval.tick().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                signal = signals.recv() => match signal {
                    Some(signal) => {
                        debug!(?signal, "Pressure signal received");
                        self.handle(signal).await;
                    }
                    None => break,
                },
                () = tick => self.handle(PressureSignal::Tick).await,
            }
        }

        debug!("Pressure coordinator stopped");
    }

    /// Starts the run loop on the current runtime.
    #[must_use]
    pub fn spawn(self: Arc<Self>) -> (mpsc::Sender<PressureSignal>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(SIGNAL_CHANNEL_CAPACITY);
        let handle = tokio::spawn(self.run(rx));
        (tx, handle)
    }
}
